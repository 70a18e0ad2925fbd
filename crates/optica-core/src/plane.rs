//! Optical planes and the propagating field.
//!
//! An [`OpticalPlane`] is an immutable description of a transverse slice at a
//! fixed `z`: its identity, whether it is a source or a mask, and exactly one
//! [`ValueSource`]. A [`Field`] is the mutable state a source becomes once
//! sampled: a complex grid plus the `z` cursor that moves as it propagates.

use ndarray::{Array2, Zip};
use num_complex::Complex64;
use thiserror::Error;

use crate::profile::Profile;
use crate::propagation::{FresnelPropagator, PropagationError};

/// Errors raised while constructing or evaluating an optical plane.
#[derive(Debug, Error)]
pub enum PlaneError {
    #[error("Invalid configuration for plane '{identity}': {message}")]
    Configuration { identity: String, message: String },

    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
}

/// Whether a plane injects a field or transmits one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaneRole {
    /// Originates a monochromatic field at the given wavelength (mm).
    Source { wavelength: f64 },
    /// Multiplies an incident field pointwise.
    Mask,
}

/// The single representation a plane's complex values come from.
#[derive(Debug, Clone)]
pub enum ValueSource {
    /// $a(x, y, \lambda)\, e^{i \phi(x, y, \lambda)}$
    AmplitudePhase { amplitude: Profile, phase: Profile },
    /// $r(x, y, \lambda) + i\, m(x, y, \lambda)$
    RealImaginary { real: Profile, imaginary: Profile },
    /// A precomputed grid, already on the simulation mesh.
    Grid(Array2<Complex64>),
    /// No transmission function: a reference plane that leaves the field alone.
    PassThrough,
}

/// A source or mask located at `z` on the optical axis.
#[derive(Debug, Clone)]
pub struct OpticalPlane {
    identity: String,
    z: f64,
    role: PlaneRole,
    value: ValueSource,
}

impl OpticalPlane {
    /// A bare reference plane: a propagation waypoint with no transmission.
    pub fn pass_through(identity: impl Into<String>, z: f64) -> Result<Self, PlaneError> {
        let identity = identity.into();
        check_z(&identity, z)?;
        Ok(Self {
            identity,
            z,
            role: PlaneRole::Mask,
            value: ValueSource::PassThrough,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Axial position (mm).
    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn role(&self) -> PlaneRole {
        self.role
    }

    pub fn value(&self) -> &ValueSource {
        &self.value
    }

    /// The source wavelength (mm), or `None` for masks.
    pub fn wavelength(&self) -> Option<f64> {
        match self.role {
            PlaneRole::Source { wavelength } => Some(wavelength),
            PlaneRole::Mask => None,
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self.role, PlaneRole::Source { .. })
    }

    /// True when the plane has no transmission function to apply.
    pub fn is_pass_through(&self) -> bool {
        matches!(self.value, ValueSource::PassThrough)
    }

    /// Whether the plane's values can change with wavelength. Grids and
    /// pass-through planes never do.
    pub fn is_dispersive(&self) -> bool {
        match &self.value {
            ValueSource::AmplitudePhase { amplitude, phase } => {
                amplitude.is_dispersive() || phase.is_dispersive()
            }
            ValueSource::RealImaginary { real, imaginary } => {
                real.is_dispersive() || imaginary.is_dispersive()
            }
            ValueSource::Grid(_) | ValueSource::PassThrough => false,
        }
    }

    /// Evaluate the plane's capability function over coordinate arrays.
    ///
    /// Returns `Ok(None)` when the plane has no function to evaluate (a
    /// precomputed grid or a pass-through plane).
    pub fn evaluate(
        &self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        wavelength: f64,
    ) -> Result<Option<Array2<Complex64>>, PlaneError> {
        if x.dim() != y.dim() {
            return Err(PlaneError::ShapeMismatch {
                expected: x.dim(),
                found: y.dim(),
            });
        }

        let values = match &self.value {
            ValueSource::AmplitudePhase { amplitude, phase } => {
                Zip::from(x).and(y).map_collect(|&x, &y| {
                    Complex64::from_polar(
                        amplitude.evaluate(x, y, wavelength),
                        phase.evaluate(x, y, wavelength),
                    )
                })
            }
            ValueSource::RealImaginary { real, imaginary } => {
                Zip::from(x).and(y).map_collect(|&x, &y| {
                    Complex64::new(
                        real.evaluate(x, y, wavelength),
                        imaginary.evaluate(x, y, wavelength),
                    )
                })
            }
            ValueSource::Grid(_) | ValueSource::PassThrough => return Ok(None),
        };

        Ok(Some(values))
    }
}

/// Collects the candidate representations of a plane and validates that
/// exactly one of them was supplied.
#[derive(Debug, Clone)]
pub struct PlaneBuilder {
    identity: String,
    z: f64,
    role: PlaneRole,
    amplitude: Option<Profile>,
    phase: Option<Profile>,
    real: Option<Profile>,
    imaginary: Option<Profile>,
    grid: Option<Array2<Complex64>>,
}

impl PlaneBuilder {
    fn new(identity: impl Into<String>, z: f64, role: PlaneRole) -> Self {
        Self {
            identity: identity.into(),
            z,
            role,
            amplitude: None,
            phase: None,
            real: None,
            imaginary: None,
            grid: None,
        }
    }

    /// Start a source plane emitting at `wavelength` (mm).
    pub fn source(identity: impl Into<String>, z: f64, wavelength: f64) -> Self {
        Self::new(identity, z, PlaneRole::Source { wavelength })
    }

    /// Start a mask plane.
    pub fn mask(identity: impl Into<String>, z: f64) -> Self {
        Self::new(identity, z, PlaneRole::Mask)
    }

    pub fn amplitude(mut self, profile: Profile) -> Self {
        self.amplitude = Some(profile);
        self
    }

    pub fn phase(mut self, profile: Profile) -> Self {
        self.phase = Some(profile);
        self
    }

    pub fn real(mut self, profile: Profile) -> Self {
        self.real = Some(profile);
        self
    }

    pub fn imaginary(mut self, profile: Profile) -> Self {
        self.imaginary = Some(profile);
        self
    }

    pub fn grid(mut self, grid: Array2<Complex64>) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn build(self) -> Result<OpticalPlane, PlaneError> {
        let identity = self.identity;
        check_z(&identity, self.z)?;
        if let PlaneRole::Source { wavelength } = self.role {
            if !(wavelength.is_finite() && wavelength > 0.0) {
                return Err(configuration(
                    &identity,
                    format!("wavelength must be positive, got {wavelength}"),
                ));
            }
        }

        let polar = self.amplitude.is_some() || self.phase.is_some();
        let cartesian = self.real.is_some() || self.imaginary.is_some();
        let supplied = [polar, cartesian, self.grid.is_some()]
            .iter()
            .filter(|&&s| s)
            .count();
        if supplied != 1 {
            return Err(configuration(
                &identity,
                format!(
                    "expected exactly one of amplitude/phase, real/imaginary or grid, got {supplied}"
                ),
            ));
        }

        let value = match (
            self.amplitude,
            self.phase,
            self.real,
            self.imaginary,
            self.grid,
        ) {
            (Some(amplitude), Some(phase), None, None, None) => {
                ValueSource::AmplitudePhase { amplitude, phase }
            }
            (None, None, Some(real), Some(imaginary), None) => {
                ValueSource::RealImaginary { real, imaginary }
            }
            (None, None, None, None, Some(grid)) => ValueSource::Grid(grid),
            _ => {
                return Err(configuration(
                    &identity,
                    "function pairs must be given together".into(),
                ))
            }
        };

        Ok(OpticalPlane {
            identity,
            z: self.z,
            role: self.role,
            value,
        })
    }
}

fn check_z(identity: &str, z: f64) -> Result<(), PlaneError> {
    if z.is_finite() {
        Ok(())
    } else {
        Err(configuration(identity, format!("z must be finite, got {z}")))
    }
}

fn configuration(identity: &str, message: String) -> PlaneError {
    PlaneError::Configuration {
        identity: identity.to_string(),
        message,
    }
}

/// A sampled source field travelling down the optical axis.
#[derive(Debug, Clone)]
pub struct Field {
    /// Identity of the source this field came from.
    pub identity: String,
    /// Current axial position (mm).
    pub z: f64,
    /// Wavelength (mm).
    pub wavelength: f64,
    /// Physical width of the sampled domain (mm).
    pub lx: f64,
    /// Physical height of the sampled domain (mm).
    pub ly: f64,
    /// Complex amplitudes, shape (rows, cols) = (ny, nx).
    pub values: Array2<Complex64>,
}

impl Field {
    /// Advance the field by `distance` (mm) and return the oversampling ratio.
    ///
    /// Non-positive distances leave the field and its `z` untouched.
    pub fn fresnel_propagate(
        &mut self,
        propagator: &FresnelPropagator,
        distance: f64,
    ) -> Result<f64, PropagationError> {
        let out = propagator.propagate(&self.values, self.lx, self.ly, self.wavelength, distance)?;
        if distance > 0.0 {
            self.values = out.grid;
            self.z += distance;
        }
        Ok(out.oversampling_ratio)
    }

    /// Advance the field by a signed distance; negative values propagate backwards.
    pub fn fresnel_propagate_signed(
        &mut self,
        propagator: &FresnelPropagator,
        distance: f64,
    ) -> Result<f64, PropagationError> {
        let out = propagator.propagate_signed(
            &self.values,
            self.lx,
            self.ly,
            self.wavelength,
            distance,
        )?;
        self.values = out.grid;
        self.z += distance;
        Ok(out.oversampling_ratio)
    }

    /// Multiply the field pointwise by a mask grid of the same shape.
    pub fn apply_mask(&mut self, mask: &Array2<Complex64>) -> Result<(), PlaneError> {
        if mask.dim() != self.values.dim() {
            return Err(PlaneError::ShapeMismatch {
                expected: self.values.dim(),
                found: mask.dim(),
            });
        }
        self.values.zip_mut_with(mask, |u, &t| *u *= t);
        Ok(())
    }
}
