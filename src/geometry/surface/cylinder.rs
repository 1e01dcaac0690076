use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Direction, Surface, SurfaceDomain};

/// A bounded cylindrical surface.
///
/// `P(u, v) = center + r cos(u) * ref_dir + r sin(u) * binormal + v * axis`
/// with `u` the angle over `[0, 2*pi)` (closed) and `v` the axial
/// distance over `[v_min, v_max]`. The outward normal is
/// `cos(u) * ref_dir + sin(u) * binormal`.
#[derive(Debug, Clone)]
pub struct Cylinder {
    center: Point3,
    radius: f64,
    axis: Vector3,
    ref_dir: Vector3,
    v_min: f64,
    v_max: f64,
}

impl Cylinder {
    /// Creates a new bounded cylinder.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, the axis is
    /// zero-length, the reference direction is not perpendicular to the
    /// axis, or the axial range is empty.
    pub fn new(
        center: Point3,
        radius: f64,
        axis: Vector3,
        ref_dir: Vector3,
        v_min: f64,
        v_max: f64,
    ) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(
                GeometryError::Degenerate("cylinder radius must be positive".into()).into(),
            );
        }
        if v_max - v_min < TOLERANCE {
            return Err(GeometryError::Degenerate("empty axial range".into()).into());
        }

        let axis_len = axis.norm();
        if axis_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let axis = axis / axis_len;

        let ref_len = ref_dir.norm();
        if ref_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let ref_dir = ref_dir / ref_len;

        if axis.dot(&ref_dir).abs() > TOLERANCE {
            return Err(GeometryError::Degenerate(
                "reference direction must be perpendicular to axis".into(),
            )
            .into());
        }

        Ok(Self {
            center,
            radius,
            axis,
            ref_dir,
            v_min,
            v_max,
        })
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn binormal(&self) -> Vector3 {
        self.axis.cross(&self.ref_dir)
    }
}

impl Surface for Cylinder {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        let binormal = self.binormal();
        Ok(self.center
            + self.ref_dir * (self.radius * u.cos())
            + binormal * (self.radius * u.sin())
            + self.axis * v)
    }

    fn normal(&self, u: f64, _v: f64) -> Result<Vector3> {
        let n = self.ref_dir * u.cos() + self.binormal() * u.sin();
        let len = n.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(n / len)
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, std::f64::consts::TAU, self.v_min, self.v_max)
    }

    fn is_closed(&self, dir: Direction) -> bool {
        matches!(dir, Direction::U)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn z_cylinder(radius: f64) -> Cylinder {
        Cylinder::new(Point3::origin(), radius, Vector3::z(), Vector3::x(), 0.0, 1.0).unwrap()
    }

    #[test]
    fn evaluate_on_equator() {
        let c = z_cylinder(2.0);
        let p = c.evaluate(FRAC_PI_2, 0.0).unwrap();
        assert!((p - Point3::new(0.0, 2.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn normal_is_radial() {
        let c = z_cylinder(1.0);
        let n = c.normal(0.0, 0.5).unwrap();
        assert!((n - Vector3::x()).norm() < TOLERANCE);
    }

    #[test]
    fn closed_in_u_open_in_v() {
        let c = z_cylinder(1.0);
        assert!(c.is_closed(Direction::U));
        assert!(!c.is_closed(Direction::V));
    }

    #[test]
    fn bounded_axial_domain() {
        let c = Cylinder::new(Point3::origin(), 1.0, Vector3::z(), Vector3::x(), -2.0, 3.0)
            .unwrap();
        let d = c.domain();
        assert!((d.v_min + 2.0).abs() < TOLERANCE);
        assert!((d.v_max - 3.0).abs() < TOLERANCE);
    }
}
