//! # Optica Compute
//!
//! FFT backend abstraction for the Optica framework. This crate provides an
//! [`FftBackend`](backend::FftBackend) trait that isolates the diffraction
//! code from the details of how two-dimensional transforms are executed.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Status |
//! |---------|-------------|--------|
//! | CPU (rustfft + Rayon) | `cpu` (default) | Implemented |
//!
//! The [`shift`] module holds the `fftshift`/`ifftshift` helpers that map
//! between centred and origin-first frequency ordering.

pub mod backend;
pub mod shift;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use backend::{ComputeError, DeviceInfo, FftBackend};
pub use shift::{fftshift2, ifftshift2};

#[cfg(feature = "cpu")]
pub use cpu::CpuBackend;
