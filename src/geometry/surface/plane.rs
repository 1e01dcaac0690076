use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Direction, Surface, SurfaceDomain};

/// A bounded planar patch.
///
/// Defined by a corner point and two edge vectors; the parametric form
/// is `P(u, v) = origin + u * u_edge + v * v_edge` over `[0, 1] x [0, 1]`.
/// The normal is `u_edge x v_edge`, constant across the patch.
#[derive(Debug, Clone)]
pub struct Plane {
    origin: Point3,
    u_edge: Vector3,
    v_edge: Vector3,
    normal: Vector3,
}

impl Plane {
    /// Creates a planar patch from a corner and two edge vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if either edge is zero-length or the edges are
    /// parallel (degenerate patch).
    pub fn new(origin: Point3, u_edge: Vector3, v_edge: Vector3) -> Result<Self> {
        if u_edge.norm() < TOLERANCE || v_edge.norm() < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = u_edge.cross(&v_edge);
        let normal_len = normal.norm();
        if normal_len < TOLERANCE {
            return Err(GeometryError::Degenerate("plane edges are parallel".into()).into());
        }
        Ok(Self {
            origin,
            u_edge,
            v_edge,
            normal: normal / normal_len,
        })
    }

    /// Creates a screen-aligned rectangle at constant depth `z`,
    /// spanning `[x0, x1] x [y0, y1]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the rectangle is degenerate.
    pub fn axis_aligned(x0: f64, x1: f64, y0: f64, y1: f64, z: f64) -> Result<Self> {
        Self::new(
            Point3::new(x0, y0, z),
            Vector3::new(x1 - x0, 0.0, 0.0),
            Vector3::new(0.0, y1 - y0, 0.0),
        )
    }

    /// Returns the corner point of the patch.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the plane normal.
    #[must_use]
    pub fn plane_normal(&self) -> &Vector3 {
        &self.normal
    }
}

impl Surface for Plane {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        Ok(self.origin + self.u_edge * u + self.v_edge * v)
    }

    fn normal(&self, _u: f64, _v: f64) -> Result<Vector3> {
        Ok(self.normal)
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, 1.0, 0.0, 1.0)
    }

    fn is_closed(&self, _dir: Direction) -> bool {
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn evaluate_corners() {
        let p = Plane::new(
            Point3::origin(),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(0.0, 3.0, 0.0),
        )
        .unwrap();
        let c = p.evaluate(1.0, 1.0).unwrap();
        assert_relative_eq!(c, Point3::new(2.0, 3.0, 0.0), epsilon = TOLERANCE);
    }

    #[test]
    fn parallel_edges_rejected() {
        let r = Plane::new(
            Point3::origin(),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
        );
        assert!(r.is_err());
    }

    #[test]
    fn axis_aligned_quad_at_depth() {
        let p = Plane::axis_aligned(-1.0, 1.0, -1.0, 1.0, 0.5).unwrap();
        let c = p.evaluate(0.5, 0.5).unwrap();
        assert_relative_eq!(c, Point3::new(0.0, 0.0, 0.5), epsilon = TOLERANCE);
        assert_relative_eq!(p.normal(0.0, 0.0).unwrap(), Vector3::z(), epsilon = TOLERANCE);
    }

    #[test]
    fn open_in_both_directions() {
        let p = Plane::axis_aligned(0.0, 1.0, 0.0, 1.0, 0.0).unwrap();
        assert!(!p.is_closed(Direction::U));
        assert!(!p.is_closed(Direction::V));
    }
}
