//! CPU FFT backend: `rustfft` plans, Rayon for row/column parallelism.

use std::sync::{Arc, Mutex};

use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayViewMut1, Axis};
use num_complex::Complex64;
use rayon::{ThreadPool, ThreadPoolBuilder};
use rustfft::{Fft, FftDirection, FftPlanner};

use crate::backend::{ComputeError, DeviceInfo, FftBackend};

/// CPU backend that parallelises the 1D passes of a 2D FFT across threads.
///
/// Plans are cached by the shared planner, so repeated transforms of the
/// same grid shape only pay for planning once.
pub struct CpuBackend {
    num_threads: usize,
    /// Dedicated pool; `None` runs on the global Rayon pool.
    pool: Option<ThreadPool>,
    planner: Mutex<FftPlanner<f64>>,
}

impl CpuBackend {
    /// Create a new CPU backend on the global Rayon pool.
    pub fn new() -> Self {
        Self {
            num_threads: rayon::current_num_threads(),
            pool: None,
            planner: Mutex::new(FftPlanner::new()),
        }
    }

    /// Create a CPU backend with its own pool of `num_threads` workers.
    pub fn with_threads(num_threads: usize) -> Result<Self, ComputeError> {
        if num_threads == 0 {
            return Err(ComputeError::DeviceError(
                "thread count must be at least 1".into(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("optica-fft-{i}"))
            .build()
            .map_err(|e| ComputeError::DeviceError(e.to_string()))?;
        Ok(Self {
            num_threads,
            pool: Some(pool),
            planner: Mutex::new(FftPlanner::new()),
        })
    }

    fn plans(
        &self,
        rows: usize,
        cols: usize,
        direction: FftDirection,
    ) -> Result<(Arc<dyn Fft<f64>>, Arc<dyn Fft<f64>>), ComputeError> {
        let mut planner = self
            .planner
            .lock()
            .map_err(|_| ComputeError::DeviceError("FFT planner lock poisoned".into()))?;
        Ok((
            planner.plan_fft(cols, direction),
            planner.plan_fft(rows, direction),
        ))
    }

    fn transform(
        &self,
        grid: &mut Array2<Complex64>,
        direction: FftDirection,
    ) -> Result<(), ComputeError> {
        let (rows, cols) = grid.dim();
        if rows == 0 || cols == 0 {
            return Err(ComputeError::EmptyGrid { rows, cols });
        }
        let (row_fft, col_fft) = self.plans(rows, cols, direction)?;

        match &self.pool {
            Some(pool) => pool.install(|| run_passes(grid, &*row_fft, &*col_fft)),
            None => run_passes(grid, &*row_fft, &*col_fft),
        }
        Ok(())
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Rows first, then columns; the 2D DFT is separable.
fn run_passes(grid: &mut Array2<Complex64>, row_fft: &dyn Fft<f64>, col_fft: &dyn Fft<f64>) {
    for (axis, fft) in [(Axis(0), row_fft), (Axis(1), col_fft)] {
        let len = fft.len();
        let scratch_len = fft.get_inplace_scratch_len();
        grid.axis_iter_mut(axis).into_par_iter().for_each_init(
            || {
                (
                    vec![Complex64::default(); len],
                    vec![Complex64::default(); scratch_len],
                )
            },
            |(buffer, scratch), lane| transform_lane(fft, lane, buffer, scratch),
        );
    }
}

/// Run a 1D transform over one lane of the grid. Contiguous lanes are
/// transformed in place; strided ones go through `buffer`.
fn transform_lane(
    fft: &dyn Fft<f64>,
    mut lane: ArrayViewMut1<'_, Complex64>,
    buffer: &mut [Complex64],
    scratch: &mut [Complex64],
) {
    if let Some(slice) = lane.as_slice_mut() {
        fft.process_with_scratch(slice, scratch);
        return;
    }
    for (dst, src) in buffer.iter_mut().zip(lane.iter()) {
        *dst = *src;
    }
    fft.process_with_scratch(buffer, scratch);
    for (dst, src) in lane.iter_mut().zip(buffer.iter()) {
        *dst = *src;
    }
}

impl FftBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        let kind = if self.pool.is_some() { "dedicated pool" } else { "global pool" };
        DeviceInfo {
            name: format!("CPU ({} threads, {})", self.num_threads, kind),
            compute_units: Some(self.num_threads),
        }
    }

    fn fft2(&self, grid: &mut Array2<Complex64>) -> Result<(), ComputeError> {
        self.transform(grid, FftDirection::Forward)
    }

    fn ifft2(&self, grid: &mut Array2<Complex64>) -> Result<(), ComputeError> {
        self.transform(grid, FftDirection::Inverse)?;
        let scale = 1.0 / (grid.len() as f64);
        grid.mapv_inplace(|v| v * scale);
        Ok(())
    }
}
