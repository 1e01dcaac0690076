mod cylinder;
mod extruded;
mod plane;
mod sphere;

pub use cylinder::Cylinder;
pub use extruded::ExtrudedPolyline;
pub use plane::Plane;
pub use sphere::Sphere;

use crate::error::Result;
use crate::math::{Point3, Vector3};

/// One of the two parametric directions of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    U,
    V,
}

/// Parameter domain for a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDomain {
    /// Start of the U parameter range.
    pub u_min: f64,
    /// End of the U parameter range.
    pub u_max: f64,
    /// Start of the V parameter range.
    pub v_min: f64,
    /// End of the V parameter range.
    pub v_max: f64,
}

impl SurfaceDomain {
    /// Creates a new surface domain.
    #[must_use]
    pub fn new(u_min: f64, u_max: f64, v_min: f64, v_max: f64) -> Self {
        Self {
            u_min,
            u_max,
            v_min,
            v_max,
        }
    }

    /// Lower bound along a direction.
    #[must_use]
    pub fn min(&self, dir: Direction) -> f64 {
        match dir {
            Direction::U => self.u_min,
            Direction::V => self.v_min,
        }
    }

    /// Upper bound along a direction.
    #[must_use]
    pub fn max(&self, dir: Direction) -> f64 {
        match dir {
            Direction::U => self.u_max,
            Direction::V => self.v_max,
        }
    }

    /// Width of the range along a direction.
    #[must_use]
    pub fn span(&self, dir: Direction) -> f64 {
        self.max(dir) - self.min(dir)
    }
}

/// Trait for parametric surfaces in view space.
///
/// Everything the hidden-line pipeline consumes from a surface: point
/// and normal evaluation, a bounded domain, per-direction closedness,
/// and the locations of tangent-plane (C1) discontinuities.
pub trait Surface {
    /// Evaluates the surface at parameters `(u, v)`, returning the 3D point.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range or evaluation fails.
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3>;

    /// Computes the surface normal at parameters `(u, v)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range or the normal is degenerate.
    fn normal(&self, u: f64, v: f64) -> Result<Vector3>;

    /// Returns the parameter domain of the surface. Must be bounded.
    fn domain(&self) -> SurfaceDomain;

    /// Returns whether the surface closes on itself along a direction
    /// (constant-parameter curves at the two extremes coincide).
    fn is_closed(&self, dir: Direction) -> bool;

    /// Parameter values along `dir` where the tangent plane is C1
    /// discontinuous across the whole opposite direction, strictly
    /// inside the domain, in increasing order.
    fn c1_discontinuities(&self, dir: Direction) -> Vec<f64> {
        let _ = dir;
        Vec::new()
    }
}
