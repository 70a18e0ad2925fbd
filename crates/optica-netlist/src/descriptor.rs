//! Typed element descriptors produced by the netlist parser.
//!
//! Descriptors hold parsed parameters in millimetres and know how to build
//! the corresponding [`OpticalPlane`]. Parameter validation happens here,
//! so a bad value is reported against the element that carried it.

use optica_core::profile::{Circle, Gaussian, Rectangle, Square, ThinLens, Tilt};
use optica_core::{OpticalPlane, PlaneBuilder, PlaneError, Profile};

/// Kinds of source element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceKind {
    /// Uniform plane wave, optionally tilted by `tilt` radians.
    PlaneWave { tilt: f64 },
    /// Gaussian beam at its waist (flat phase).
    Gaussian { waist: f64 },
}

/// Kinds of mask element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaskKind {
    ThinLens { focal_length: f64 },
    /// Reference plane with no transmission function.
    Plane,
    CircularAperture { diameter: f64 },
    RectangularAperture { width: f64, height: f64 },
    SquareAperture { width: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub identity: String,
    /// Axial position (mm).
    pub z: f64,
    /// Wavelength (mm).
    pub wavelength: f64,
    pub kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaskDescriptor {
    pub identity: String,
    /// Axial position (mm).
    pub z: f64,
    pub kind: MaskKind,
}

impl SourceDescriptor {
    pub fn to_plane(&self) -> Result<OpticalPlane, PlaneError> {
        let (amplitude, phase) = match self.kind {
            SourceKind::PlaneWave { tilt } => {
                let phase = if tilt == 0.0 {
                    Profile::Constant(0.0)
                } else {
                    Profile::Tilt(Tilt { angle: tilt })
                };
                (Profile::Constant(1.0), phase)
            }
            SourceKind::Gaussian { waist } => {
                require_positive(&self.identity, "beam waist", waist)?;
                (Profile::Gaussian(Gaussian { waist }), Profile::Constant(0.0))
            }
        };

        PlaneBuilder::source(&self.identity, self.z, self.wavelength)
            .amplitude(amplitude)
            .phase(phase)
            .build()
    }
}

impl MaskDescriptor {
    pub fn to_plane(&self) -> Result<OpticalPlane, PlaneError> {
        let amplitude = match self.kind {
            MaskKind::Plane => return OpticalPlane::pass_through(&self.identity, self.z),
            MaskKind::ThinLens { focal_length } => {
                if focal_length == 0.0 || !focal_length.is_finite() {
                    return Err(PlaneError::Configuration {
                        identity: self.identity.clone(),
                        message: format!("focal length must be non-zero, got {focal_length}"),
                    });
                }
                return PlaneBuilder::mask(&self.identity, self.z)
                    .amplitude(Profile::Constant(1.0))
                    .phase(Profile::ThinLens(ThinLens { focal_length }))
                    .build();
            }
            MaskKind::CircularAperture { diameter } => {
                require_positive(&self.identity, "diameter", diameter)?;
                Profile::Circle(Circle { diameter })
            }
            MaskKind::RectangularAperture { width, height } => {
                require_positive(&self.identity, "width", width)?;
                require_positive(&self.identity, "height", height)?;
                Profile::Rectangle(Rectangle { width, height })
            }
            MaskKind::SquareAperture { width } => {
                require_positive(&self.identity, "width", width)?;
                Profile::Square(Square { width })
            }
        };

        PlaneBuilder::mask(&self.identity, self.z)
            .amplitude(amplitude)
            .phase(Profile::Constant(0.0))
            .build()
    }
}

fn require_positive(identity: &str, what: &str, value: f64) -> Result<(), PlaneError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PlaneError::Configuration {
            identity: identity.to_string(),
            message: format!("{what} must be positive, got {value}"),
        })
    }
}
