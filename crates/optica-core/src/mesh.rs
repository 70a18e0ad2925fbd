//! The coordinate mesh shared by every plane in a run.

use ndarray::Array2;

use crate::plane::PlaneError;

/// Centred transverse sample positions for an `ny x nx` grid.
///
/// Column `j` sits at $x_j = (j - \lfloor N/2 \rfloor)\,dx$ with $dx = L_x / N$,
/// and likewise for rows. The on-axis sample is at index `[ny / 2, nx / 2]`,
/// which is the position `fftshift` maps the array origin to, so sampled
/// planes and the propagator agree on where $x = y = 0$ is.
#[derive(Debug, Clone)]
pub struct Mesh {
    nx: usize,
    ny: usize,
    lx: f64,
    ly: f64,
    x: Array2<f64>,
    y: Array2<f64>,
}

impl Mesh {
    /// Build a mesh of `nx` columns and `ny` rows spanning `lx` by `ly` mm.
    pub fn new(nx: usize, ny: usize, lx: f64, ly: f64) -> Result<Self, PlaneError> {
        if nx == 0 || ny == 0 {
            return Err(PlaneError::Configuration {
                identity: "mesh".into(),
                message: format!("grid dimensions must be non-zero, got {nx}x{ny}"),
            });
        }
        for (name, extent) in [("lx", lx), ("ly", ly)] {
            if !(extent.is_finite() && extent > 0.0) {
                return Err(PlaneError::Configuration {
                    identity: "mesh".into(),
                    message: format!("{name} must be positive, got {extent}"),
                });
            }
        }

        let dx = lx / nx as f64;
        let dy = ly / ny as f64;
        let x0 = (nx / 2) as f64;
        let y0 = (ny / 2) as f64;
        let x = Array2::from_shape_fn((ny, nx), |(_, j)| (j as f64 - x0) * dx);
        let y = Array2::from_shape_fn((ny, nx), |(i, _)| (i as f64 - y0) * dy);

        Ok(Self { nx, ny, lx, ly, x, y })
    }

    /// A square mesh with equal sample counts and extents.
    pub fn square(n: usize, l: f64) -> Result<Self, PlaneError> {
        Self::new(n, n, l, l)
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Physical width (mm).
    pub fn lx(&self) -> f64 {
        self.lx
    }

    /// Physical height (mm).
    pub fn ly(&self) -> f64 {
        self.ly
    }

    /// Sample pitch `(dx, dy)` in mm.
    pub fn pitch(&self) -> (f64, f64) {
        (self.lx / self.nx as f64, self.ly / self.ny as f64)
    }

    /// Grid shape as `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array2<f64> {
        &self.y
    }
}
