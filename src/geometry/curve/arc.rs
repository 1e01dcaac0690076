use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Curve, CurveDomain};

/// A circular arc in 3D space.
///
/// Defined by a center, radius, plane normal, and a reference direction
/// for the zero angle. The parameter is the angle in radians, swept
/// from `start_angle` to `end_angle` around the normal.
#[derive(Debug, Clone)]
pub struct Arc {
    center: Point3,
    radius: f64,
    x_dir: Vector3,
    y_dir: Vector3,
    start_angle: f64,
    end_angle: f64,
}

impl Arc {
    /// Creates a new arc.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, the normal is
    /// zero-length, or the reference direction is not perpendicular to
    /// the normal.
    pub fn new(
        center: Point3,
        radius: f64,
        normal: Vector3,
        ref_dir: Vector3,
        start_angle: f64,
        end_angle: f64,
    ) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(GeometryError::Degenerate("arc radius must be positive".into()).into());
        }
        let normal_len = normal.norm();
        if normal_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / normal_len;

        let ref_len = ref_dir.norm();
        if ref_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let x_dir = ref_dir / ref_len;

        if normal.dot(&x_dir).abs() > TOLERANCE {
            return Err(GeometryError::Degenerate(
                "reference direction must be perpendicular to normal".into(),
            )
            .into());
        }

        Ok(Self {
            center,
            radius,
            x_dir,
            y_dir: normal.cross(&x_dir),
            start_angle,
            end_angle,
        })
    }

    /// Returns the center of the arc.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius of the arc.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl Curve for Arc {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        Ok(self.center + self.x_dir * (self.radius * t.cos()) + self.y_dir * (self.radius * t.sin()))
    }

    fn tangent(&self, t: f64) -> Result<Vector3> {
        let tangent = self.x_dir * (-t.sin()) + self.y_dir * t.cos();
        let len = tangent.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(tangent / len)
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(self.start_angle, self.end_angle)
    }

    fn is_closed(&self) -> bool {
        (self.end_angle - self.start_angle - std::f64::consts::TAU).abs() < TOLERANCE
    }
}
