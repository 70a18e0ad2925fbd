//! Parameterised capability functions.
//!
//! Every element of an optical system is described by one or two real-valued
//! functions of `(x, y, λ)` (amplitude/phase or real/imaginary). Each variant
//! of [`Profile`] owns a small immutable parameter record and evaluates
//! through a pure function of those parameters. Lengths are in millimetres.

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

/// A real-valued function of transverse position and wavelength.
#[derive(Debug, Clone)]
pub enum Profile {
    /// The same value everywhere (e.g. unit amplitude, zero phase).
    Constant(f64),
    Gaussian(Gaussian),
    ThinLens(ThinLens),
    Tilt(Tilt),
    Circle(Circle),
    Rectangle(Rectangle),
    Square(Square),
    /// Arbitrary user-supplied function, shared read-only between threads.
    Custom(CustomProfile),
}

/// Gaussian envelope $\exp(-(x^2 + y^2) / w^2)$.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    /// Beam waist (mm).
    pub waist: f64,
}

/// Thin-lens quadratic phase $\frac{2\pi}{2 f \lambda}(x^2 + y^2)$.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThinLens {
    /// Focal length (mm).
    pub focal_length: f64,
}

/// Linear phase of a plane wave tilted about the y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tilt {
    /// Angle between the propagation direction and the optical axis (rad).
    pub angle: f64,
}

/// Circular aperture centred on the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Diameter (mm).
    pub diameter: f64,
}

/// Axis-aligned rectangular aperture centred on the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// Full width along x (mm).
    pub width: f64,
    /// Full height along y (mm).
    pub height: f64,
}

/// Axis-aligned square aperture centred on the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Square {
    /// Side length (mm).
    pub width: f64,
}

/// Shared closure `(x, y, λ) -> value`.
#[derive(Clone)]
pub struct CustomProfile(Arc<dyn Fn(f64, f64, f64) -> f64 + Send + Sync>);

impl CustomProfile {
    pub fn new(f: impl Fn(f64, f64, f64) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for CustomProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomProfile(..)")
    }
}

impl Circle {
    /// Boundary points count as inside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let r = self.diameter / 2.0;
        x * x + y * y <= r * r
    }
}

impl Rectangle {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x.abs() <= self.width / 2.0 && y.abs() <= self.height / 2.0
    }
}

impl Square {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        Rectangle {
            width: self.width,
            height: self.width,
        }
        .contains(x, y)
    }
}

fn indicator(inside: bool) -> f64 {
    if inside {
        1.0
    } else {
        0.0
    }
}

impl Profile {
    /// Evaluate the profile at a single point for the given wavelength (mm).
    pub fn evaluate(&self, x: f64, y: f64, wavelength: f64) -> f64 {
        match self {
            Profile::Constant(v) => *v,
            Profile::Gaussian(g) => (-(x * x + y * y) / (g.waist * g.waist)).exp(),
            Profile::ThinLens(l) => 2.0 * PI / (2.0 * l.focal_length * wavelength) * (x * x + y * y),
            Profile::Tilt(t) => 2.0 * PI / wavelength * t.angle.sin() * x,
            Profile::Circle(c) => indicator(c.contains(x, y)),
            Profile::Rectangle(r) => indicator(r.contains(x, y)),
            Profile::Square(s) => indicator(s.contains(x, y)),
            Profile::Custom(f) => (f.0)(x, y, wavelength),
        }
    }

    /// Convenience constructor for [`Profile::Custom`].
    pub fn custom(f: impl Fn(f64, f64, f64) -> f64 + Send + Sync + 'static) -> Self {
        Profile::Custom(CustomProfile::new(f))
    }

    /// Whether the profile's value depends on the wavelength.
    pub fn is_dispersive(&self) -> bool {
        matches!(
            self,
            Profile::ThinLens(_) | Profile::Tilt(_) | Profile::Custom(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_circle_boundary_is_inside() {
        // 3-4-5 triangle: (3, 4) lies exactly on a radius-5 circle.
        let c = Profile::Circle(Circle { diameter: 10.0 });
        assert_eq!(c.evaluate(3.0, 4.0, 500e-6), 1.0);
        assert_eq!(c.evaluate(4.0, 4.0, 500e-6), 0.0);
        assert_eq!(c.evaluate(0.0, 0.0, 500e-6), 1.0);
    }

    #[test]
    fn test_square_and_rectangle() {
        let s = Profile::Square(Square { width: 4.0 });
        assert_eq!(s.evaluate(1.0, 1.0, 1e-3), 1.0);
        assert_eq!(s.evaluate(3.0, 0.0, 1e-3), 0.0);
        assert_eq!(s.evaluate(-2.0, 2.0, 1e-3), 1.0);

        let r = Profile::Rectangle(Rectangle { width: 4.0, height: 1.0 });
        assert_eq!(r.evaluate(1.5, 0.4, 1e-3), 1.0);
        assert_eq!(r.evaluate(1.5, 0.6, 1e-3), 0.0);
    }

    #[test]
    fn test_gaussian_falls_to_one_over_e_at_waist() {
        let g = Profile::Gaussian(Gaussian { waist: 0.5 });
        assert_abs_diff_eq!(g.evaluate(0.0, 0.0, 7e-4), 1.0);
        assert_abs_diff_eq!(g.evaluate(0.3, 0.4, 7e-4), (-1.0f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn test_lens_phase_depends_on_wavelength() {
        let lens = Profile::ThinLens(ThinLens { focal_length: 100.0 });
        let short = lens.evaluate(1.0, 0.0, 500e-6);
        let long = lens.evaluate(1.0, 0.0, 1000e-6);
        assert_abs_diff_eq!(short, 2.0 * PI / (2.0 * 100.0 * 500e-6), epsilon = 1e-12);
        assert_abs_diff_eq!(short, 2.0 * long, epsilon = 1e-12);
        assert!(lens.is_dispersive());
    }

    #[test]
    fn test_zero_tilt_is_flat() {
        let t = Profile::Tilt(Tilt { angle: 0.0 });
        assert_eq!(t.evaluate(2.0, -1.0, 500e-6), 0.0);
    }

    #[test]
    fn test_custom_profile() {
        let p = Profile::custom(|x, y, l| x + y + l);
        assert_abs_diff_eq!(p.evaluate(1.0, 2.0, 0.5), 3.5);
    }
}
