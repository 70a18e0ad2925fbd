//! # Optica Netlist
//!
//! Parses the compact text netlists that describe an optical system:
//!
//! ```text
//! # name   z       parameters...
//! G1       0       700nm  0.5mm     # Gaussian source: wavelength, waist
//! C1       10mm    2mm              # circular aperture: diameter
//! L1       30mm    30mm             # thin lens: focal length
//! P1       60mm                     # reference plane
//! ```
//!
//! - [`units`]: Length suffixes (`mm`, `um`, `nm`).
//! - [`descriptor`]: Typed element descriptors and their conversion to
//!   [`OpticalPlane`](optica_core::OpticalPlane)s.
//!
//! Lines that cannot be understood are collected as diagnostics and skipped;
//! they never abort a parse.

pub mod descriptor;
pub mod units;

use std::path::Path;

use log::warn;
use thiserror::Error;

use descriptor::{MaskDescriptor, MaskKind, SourceDescriptor, SourceKind};
use optica_core::{OpticalPlane, PlaneError};
use units::parse_length;

/// Comment character; also the separator for trailing comments.
const COMMENT: char = '#';

/// Errors during netlist parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    FormatError { line: usize, message: String },

    #[error("Line {line}: element '{identity}' has an unsupported type")]
    UnknownElement { line: usize, identity: String },

    #[error("Invalid length '{0}': expected a number with optional mm/um/nm suffix")]
    InvalidUnit(String),
}

/// A parsed netlist: sources and masks sorted by ascending `z`.
#[derive(Debug, Clone, Default)]
pub struct Netlist {
    pub sources: Vec<SourceDescriptor>,
    pub masks: Vec<MaskDescriptor>,
    /// Lines that were reported and skipped.
    pub diagnostics: Vec<String>,
}

/// A descriptor that could not be turned into an optical plane.
#[derive(Debug)]
pub struct BuildFailure {
    pub identity: String,
    pub error: PlaneError,
}

impl Netlist {
    /// Convert every descriptor into an [`OpticalPlane`], sources first.
    ///
    /// Descriptors that fail construction are logged and returned alongside
    /// the planes that succeeded.
    pub fn to_planes(&self) -> (Vec<OpticalPlane>, Vec<BuildFailure>) {
        let mut planes = Vec::with_capacity(self.sources.len() + self.masks.len());
        let mut failures = Vec::new();

        let built = self
            .sources
            .iter()
            .map(|s| (s.identity.as_str(), s.to_plane()))
            .chain(self.masks.iter().map(|m| (m.identity.as_str(), m.to_plane())));

        for (identity, result) in built {
            match result {
                Ok(plane) => planes.push(plane),
                Err(error) => {
                    warn!("Skipping element '{}': {}", identity, error);
                    failures.push(BuildFailure {
                        identity: identity.to_string(),
                        error,
                    });
                }
            }
        }

        (planes, failures)
    }
}

/// Read and parse a netlist file.
pub fn parse_file(path: &Path) -> Result<Netlist, ParseError> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_netlist(&content))
}

/// Parse netlist text. Never fails as a whole; bad lines become diagnostics.
pub fn parse_netlist(content: &str) -> Netlist {
    let mut netlist = Netlist::default();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let text = raw.split(COMMENT).next().unwrap_or("").replace(',', " ");
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        match parse_line(line_no, &tokens) {
            Ok(Element::Source(s)) => netlist.sources.push(s),
            Ok(Element::Mask(m)) => netlist.masks.push(m),
            Err(e) => {
                warn!("{}", e);
                netlist.diagnostics.push(e.to_string());
            }
        }
    }

    netlist.sources.sort_by(|a, b| a.z.total_cmp(&b.z));
    netlist.masks.sort_by(|a, b| a.z.total_cmp(&b.z));
    netlist
}

enum Element {
    Source(SourceDescriptor),
    Mask(MaskDescriptor),
}

fn parse_line(line: usize, tokens: &[&str]) -> Result<Element, ParseError> {
    let identity = tokens[0].to_string();
    let z = length_at(line, tokens, 1, "z position")?;

    let element = match identity.chars().next() {
        Some('W') => {
            let wavelength = length_at(line, tokens, 2, "wavelength")?;
            let tilt_deg = match tokens.get(3) {
                Some(t) => parse_number(line, t, "tilt angle")?,
                None => 0.0,
            };
            Element::Source(SourceDescriptor {
                identity,
                z,
                wavelength,
                kind: SourceKind::PlaneWave {
                    tilt: tilt_deg.to_radians(),
                },
            })
        }
        Some('G') => {
            let wavelength = length_at(line, tokens, 2, "wavelength")?;
            let waist = length_at(line, tokens, 3, "beam waist")?;
            Element::Source(SourceDescriptor {
                identity,
                z,
                wavelength,
                kind: SourceKind::Gaussian { waist },
            })
        }
        Some('L') => Element::Mask(MaskDescriptor {
            identity,
            z,
            kind: MaskKind::ThinLens {
                focal_length: length_at(line, tokens, 2, "focal length")?,
            },
        }),
        Some('P') => Element::Mask(MaskDescriptor {
            identity,
            z,
            kind: MaskKind::Plane,
        }),
        Some('C') => Element::Mask(MaskDescriptor {
            identity,
            z,
            kind: MaskKind::CircularAperture {
                diameter: length_at(line, tokens, 2, "diameter")?,
            },
        }),
        Some('R') => Element::Mask(MaskDescriptor {
            identity,
            z,
            kind: MaskKind::RectangularAperture {
                width: length_at(line, tokens, 2, "width")?,
                height: length_at(line, tokens, 3, "height")?,
            },
        }),
        Some('S') => Element::Mask(MaskDescriptor {
            identity,
            z,
            kind: MaskKind::SquareAperture {
                width: length_at(line, tokens, 2, "width")?,
            },
        }),
        _ => return Err(ParseError::UnknownElement { line, identity }),
    };

    Ok(element)
}

fn length_at(line: usize, tokens: &[&str], index: usize, what: &str) -> Result<f64, ParseError> {
    let token = tokens.get(index).ok_or_else(|| ParseError::FormatError {
        line,
        message: format!("'{}' is missing its {}", tokens[0], what),
    })?;
    parse_length(token).map_err(|e| ParseError::FormatError {
        line,
        message: format!("{} of '{}': {}", what, tokens[0], e),
    })
}

fn parse_number(line: usize, token: &str, what: &str) -> Result<f64, ParseError> {
    token.parse().map_err(|_| ParseError::FormatError {
        line,
        message: format!("Invalid {}: {}", what, token),
    })
}
