//! Quantities derived from sampled complex fields.

use ndarray::Array2;
use num_complex::Complex64;

/// Total optical power $\sum |u|^2 \, dx \, dy$ over a grid spanning `lx` by `ly`.
pub fn total_power(grid: &Array2<Complex64>, lx: f64, ly: f64) -> f64 {
    let (rows, cols) = grid.dim();
    if rows == 0 || cols == 0 {
        return 0.0;
    }
    let cell = (lx / cols as f64) * (ly / rows as f64);
    grid.iter().map(|v| v.norm_sqr()).sum::<f64>() * cell
}

/// Intensity map $|u|^2$.
pub fn intensity(grid: &Array2<Complex64>) -> Array2<f64> {
    grid.mapv(|v| v.norm_sqr())
}

/// Phase map $\arg u \in (-\pi, \pi]$.
pub fn phase(grid: &Array2<Complex64>) -> Array2<f64> {
    grid.mapv(|v| v.arg())
}

/// Relative change in power between two grids on the same domain.
pub fn power_deviation(before: &Array2<Complex64>, after: &Array2<Complex64>) -> f64 {
    let p0: f64 = before.iter().map(|v| v.norm_sqr()).sum();
    let p1: f64 = after.iter().map(|v| v.norm_sqr()).sum();
    if p0 == 0.0 {
        return if p1 == 0.0 { 0.0 } else { f64::INFINITY };
    }
    (p1 - p0).abs() / p0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_uniform_field_power_is_area() {
        let grid = Array2::from_elem((10, 20), Complex64::new(1.0, 0.0));
        assert_abs_diff_eq!(total_power(&grid, 2.0, 3.0), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_intensity_and_phase() {
        let grid = Array2::from_elem((1, 1), Complex64::new(0.0, 2.0));
        assert_abs_diff_eq!(intensity(&grid)[[0, 0]], 4.0);
        assert_abs_diff_eq!(phase(&grid)[[0, 0]], std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn test_power_deviation() {
        let a = Array2::from_elem((2, 2), Complex64::new(1.0, 0.0));
        let b = Array2::from_elem((2, 2), Complex64::new(0.0, 1.0));
        assert_eq!(power_deviation(&a, &b), 0.0);
        let zero = Array2::<Complex64>::zeros((2, 2));
        assert_eq!(power_deviation(&zero, &zero), 0.0);
        assert!(power_deviation(&zero, &a).is_infinite());
    }
}
