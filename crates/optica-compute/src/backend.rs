//! FFT backend trait and device abstraction.
//!
//! The [`FftBackend`] trait abstracts over the execution of 2D discrete Fourier
//! transforms so that the propagation code in `optica-core` stays independent
//! of the FFT library and threading strategy.

use ndarray::Array2;
use num_complex::Complex64;
use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Cannot transform an empty grid of shape {rows}x{cols}")]
    EmptyGrid { rows: usize, cols: usize },

    #[error("Device error: {0}")]
    DeviceError(String),
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub compute_units: Option<usize>,
}

/// Abstraction over 2D FFT execution.
///
/// Transforms operate in place on row-major `rows x cols` grids. The forward
/// transform is unnormalised; the inverse divides by `rows * cols`, so that
/// `ifft2(fft2(u)) == u` up to rounding (numpy convention).
pub trait FftBackend: Send + Sync {
    /// Return information about the device.
    fn device_info(&self) -> DeviceInfo;

    /// Forward 2D DFT, $U(f_x, f_y) = \sum u(x, y) e^{-2\pi i (f_x x + f_y y)}$.
    fn fft2(&self, grid: &mut Array2<Complex64>) -> Result<(), ComputeError>;

    /// Inverse 2D DFT, normalised by `1 / (rows * cols)`.
    fn ifft2(&self, grid: &mut Array2<Complex64>) -> Result<(), ComputeError>;
}
