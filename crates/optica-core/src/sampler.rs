//! Grid sampling: turning a plane's capability function into a complex array.

use ndarray::Array2;
use num_complex::Complex64;

use crate::mesh::Mesh;
use crate::plane::{OpticalPlane, PlaneError, ValueSource};

/// Materialise `plane` over `mesh` at `wavelength` (mm).
///
/// Function-valued planes are evaluated elementwise; a precomputed grid is
/// checked against the mesh shape and copied. Pass-through planes produce
/// `None`; the caller must branch around them.
pub fn sample(
    plane: &OpticalPlane,
    mesh: &Mesh,
    wavelength: f64,
) -> Result<Option<Array2<Complex64>>, PlaneError> {
    match plane.value() {
        ValueSource::Grid(grid) => {
            if grid.dim() != mesh.shape() {
                return Err(PlaneError::ShapeMismatch {
                    expected: mesh.shape(),
                    found: grid.dim(),
                });
            }
            Ok(Some(grid.clone()))
        }
        ValueSource::PassThrough => Ok(None),
        _ => plane.evaluate(mesh.x(), mesh.y(), wavelength),
    }
}
