//! Fresnel propagation by the transfer-function (angular-spectrum) method.
//!
//! A field $u_1$ sampled on an $M \times N$ grid spanning $L_x \times L_y$ is
//! advanced by a distance $z$ as
//!
//! $$
//! u_2 = \mathcal{F}^{-1}\{ H \cdot \mathcal{F}\{u_1\} \}, \qquad
//! H(f_x, f_y) = \exp\!\left(-i\pi\lambda z (f_x^2 + f_y^2)\right)
//! $$
//!
//! with frequency axes $f_x \in [-1/(2dx), 1/(2dx)]$ ($N$ linear samples) and
//! $f_y \in [-1/(2dy), 1/(2dy)]$ ($M$ samples). Fields and $H$ are stored
//! centred; they are moved to origin-first ordering before the transform and
//! back afterwards.

use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use optica_compute::{fftshift2, ifftshift2, ComputeError, CpuBackend, FftBackend};
use thiserror::Error;

/// Errors that can occur while propagating a field.
#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("Invalid extent: Lx={lx}, Ly={ly} (must be positive and finite)")]
    InvalidExtent { lx: f64, ly: f64 },

    #[error("Invalid wavelength: {0} mm (must be positive and finite)")]
    InvalidWavelength(f64),

    #[error("Backward propagation by {distance} mm refused")]
    BackwardPropagation { distance: f64 },

    #[error("Compute backend error: {0}")]
    Compute(#[from] ComputeError),
}

/// Result of one propagation step.
#[derive(Debug, Clone)]
pub struct Propagated {
    /// The propagated grid, same shape as the input.
    pub grid: Array2<Complex64>,
    /// Sampling diagnostic $dx \cdot L_x / (\lambda z)$; zero when no step was taken.
    pub oversampling_ratio: f64,
}

/// Stateless Fresnel propagator over a pluggable FFT backend.
pub struct FresnelPropagator {
    pub backend: Arc<dyn FftBackend>,
}

impl Default for FresnelPropagator {
    fn default() -> Self {
        Self {
            backend: Arc::new(CpuBackend::new()),
        }
    }
}

impl FresnelPropagator {
    pub fn new(backend: Arc<dyn FftBackend>) -> Self {
        Self { backend }
    }

    /// Propagate forward by `distance` (mm).
    ///
    /// Non-positive distances return the input unchanged with a ratio of
    /// zero; no transform is performed, so the identity is exact.
    pub fn propagate(
        &self,
        grid: &Array2<Complex64>,
        lx: f64,
        ly: f64,
        wavelength: f64,
        distance: f64,
    ) -> Result<Propagated, PropagationError> {
        if distance <= 0.0 {
            return Ok(Propagated {
                grid: grid.clone(),
                oversampling_ratio: 0.0,
            });
        }
        self.propagate_signed(grid, lx, ly, wavelength, distance)
    }

    /// Propagate by a signed `distance` (mm); negative values run the same
    /// transfer function backwards. Zero is still the exact identity.
    pub fn propagate_signed(
        &self,
        grid: &Array2<Complex64>,
        lx: f64,
        ly: f64,
        wavelength: f64,
        distance: f64,
    ) -> Result<Propagated, PropagationError> {
        if !(lx.is_finite() && lx > 0.0 && ly.is_finite() && ly > 0.0) {
            return Err(PropagationError::InvalidExtent { lx, ly });
        }
        if !(wavelength.is_finite() && wavelength > 0.0) {
            return Err(PropagationError::InvalidWavelength(wavelength));
        }
        if distance == 0.0 {
            return Ok(Propagated {
                grid: grid.clone(),
                oversampling_ratio: 0.0,
            });
        }

        let (rows, cols) = grid.dim();
        let h = ifftshift2(&transfer_function(rows, cols, lx, ly, wavelength, distance));

        let mut spectrum = ifftshift2(grid);
        self.backend.fft2(&mut spectrum)?;
        spectrum *= &h;
        self.backend.ifft2(&mut spectrum)?;

        Ok(Propagated {
            grid: fftshift2(&spectrum),
            oversampling_ratio: oversampling_ratio(lx, cols, wavelength, distance.abs()),
        })
    }
}

/// Centred Fresnel transfer function for an `rows x cols` grid.
pub fn transfer_function(
    rows: usize,
    cols: usize,
    lx: f64,
    ly: f64,
    wavelength: f64,
    distance: f64,
) -> Array2<Complex64> {
    let fx = frequency_axis(lx, cols);
    let fy = frequency_axis(ly, rows);
    let k = -PI * wavelength * distance;
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        Complex64::new(0.0, k * (fx[j] * fx[j] + fy[i] * fy[i])).exp()
    })
}

/// `n` linearly spaced spatial frequencies spanning the Nyquist band of a
/// length-`l` axis sampled at `l / n`.
pub fn frequency_axis(l: f64, n: usize) -> Array1<f64> {
    let d = l / n as f64;
    let nyquist = 1.0 / (2.0 * d);
    Array1::linspace(-nyquist, nyquist, n)
}

/// $dx \cdot L_x / (\lambda z)$ with $dx = L_x / N$.
pub fn oversampling_ratio(lx: f64, cols: usize, wavelength: f64, distance: f64) -> f64 {
    let dx = lx / cols as f64;
    dx * lx / (wavelength * distance)
}
