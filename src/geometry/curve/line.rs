use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Curve, CurveDomain};

/// A bounded straight segment between two points.
///
/// The parametric form is `P(t) = start + t * (end - start)` over `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Line {
    start: Point3,
    end: Point3,
}

impl Line {
    /// Creates a new segment from two distinct points.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoints coincide.
    pub fn new(start: Point3, end: Point3) -> Result<Self> {
        if (end - start).norm() < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(Self { start, end })
    }

    /// Returns the start point.
    #[must_use]
    pub fn start(&self) -> &Point3 {
        &self.start
    }

    /// Returns the end point.
    #[must_use]
    pub fn end(&self) -> &Point3 {
        &self.end
    }
}

impl Curve for Line {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        Ok(self.start + (self.end - self.start) * t)
    }

    fn tangent(&self, _t: f64) -> Result<Vector3> {
        Ok((self.end - self.start).normalize())
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(0.0, 1.0)
    }

    fn is_closed(&self) -> bool {
        false
    }
}
