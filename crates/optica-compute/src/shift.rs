//! Quadrant shifts between centred and origin-first sample ordering.
//!
//! Both helpers follow numpy semantics on each axis of length `n`:
//! `fftshift` rolls by `n / 2`, `ifftshift` rolls by `-(n / 2)`. They are
//! exact inverses of each other for odd and even lengths alike.

use ndarray::Array2;

/// Roll a grid so that element `[0, 0]` lands at `[rows / 2, cols / 2]`.
pub fn fftshift2<T: Clone>(grid: &Array2<T>) -> Array2<T> {
    let (rows, cols) = grid.dim();
    roll2(grid, rows / 2, cols / 2)
}

/// Roll a grid so that element `[rows / 2, cols / 2]` lands at `[0, 0]`.
pub fn ifftshift2<T: Clone>(grid: &Array2<T>) -> Array2<T> {
    let (rows, cols) = grid.dim();
    roll2(grid, rows - rows / 2, cols - cols / 2)
}

/// Circular roll: `out[(i + dr) % rows, (j + dc) % cols] = grid[i, j]`.
fn roll2<T: Clone>(grid: &Array2<T>, dr: usize, dc: usize) -> Array2<T> {
    let (rows, cols) = grid.dim();
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        let src_i = (i + rows - dr % rows) % rows;
        let src_j = (j + cols - dc % cols) % cols;
        grid[[src_i, src_j]].clone()
    })
}
