use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Direction, Surface, SurfaceDomain};

/// A spherical surface.
///
/// `P(u, v) = center + r cos(v) cos(u) * ref_dir + r cos(v) sin(u) * binormal + r sin(v) * axis`
/// with `u` the longitude over `[0, 2*pi)` (closed) and `v` the
/// latitude over `[-pi/2, pi/2]`. The outward normal is radial.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Point3,
    radius: f64,
    axis: Vector3,
    ref_dir: Vector3,
}

impl Sphere {
    /// Creates a new sphere.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, the axis is
    /// zero-length, or the reference direction is not perpendicular to
    /// the axis.
    pub fn new(center: Point3, radius: f64, axis: Vector3, ref_dir: Vector3) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(GeometryError::Degenerate("sphere radius must be positive".into()).into());
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
        })
    }

    /// Returns the center.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
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

impl Surface for Sphere {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        let binormal = self.binormal();
        let cv = v.cos();
        Ok(self.center
            + self.ref_dir * (self.radius * cv * u.cos())
            + binormal * (self.radius * cv * u.sin())
            + self.axis * (self.radius * v.sin()))
    }

    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        let p = self.evaluate(u, v)?;
        Ok((p - self.center) / self.radius)
    }

    fn domain(&self) -> SurfaceDomain {
        use std::f64::consts::{FRAC_PI_2, TAU};
        SurfaceDomain::new(0.0, TAU, -FRAC_PI_2, FRAC_PI_2)
    }

    fn is_closed(&self, dir: Direction) -> bool {
        matches!(dir, Direction::U)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn unit_sphere() -> Sphere {
        Sphere::new(Point3::origin(), 1.0, Vector3::z(), Vector3::x()).unwrap()
    }

    #[test]
    fn evaluate_poles() {
        let s = unit_sphere();
        let north = s.evaluate(0.0, FRAC_PI_2).unwrap();
        assert_relative_eq!(north, Point3::new(0.0, 0.0, 1.0), epsilon = 1e-9);
        let south = s.evaluate(1.0, -FRAC_PI_2).unwrap();
        assert_relative_eq!(south, Point3::new(0.0, 0.0, -1.0), epsilon = 1e-9);
    }

    #[test]
    fn normal_is_radial_everywhere() {
        let s = unit_sphere();
        for &(u, v) in &[(0.0, 0.0), (1.0, 0.7), (3.0, -1.2), (0.0, FRAC_PI_2)] {
            let p = s.evaluate(u, v).unwrap();
            let n = s.normal(u, v).unwrap();
            assert_relative_eq!(n, p - Point3::origin(), epsilon = 1e-9);
        }
    }

    #[test]
    fn closed_in_longitude_only() {
        let s = unit_sphere();
        assert!(s.is_closed(Direction::U));
        assert!(!s.is_closed(Direction::V));
    }
}
