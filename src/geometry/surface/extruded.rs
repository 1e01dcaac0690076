use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Direction, Surface, SurfaceDomain};

/// A surface swept by extruding a polyline profile along a vector.
///
/// `u` runs along the profile with one parameter unit per vertex
/// (`[0, n-1]`); `v` runs along the extrusion vector over `[0, 1]`.
/// Interior profile vertices where consecutive segments change
/// direction are genuine C1 discontinuities of the surface, reported
/// through [`Surface::c1_discontinuities`].
#[derive(Debug, Clone)]
pub struct ExtrudedPolyline {
    profile: Vec<Point3>,
    extrusion: Vector3,
}

impl ExtrudedPolyline {
    /// Creates an extruded surface from a profile polyline and an
    /// extrusion vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile has fewer than two points, any
    /// profile segment is zero-length, or the extrusion vector is
    /// zero-length or parallel to a profile segment.
    pub fn new(profile: Vec<Point3>, extrusion: Vector3) -> Result<Self> {
        if profile.len() < 2 {
            return Err(GeometryError::TooFewSamples {
                required: 2,
                actual: profile.len(),
            }
            .into());
        }
        if extrusion.norm() < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        for w in profile.windows(2) {
            let seg = w[1] - w[0];
            if seg.norm() < TOLERANCE {
                return Err(
                    GeometryError::Degenerate("zero-length profile segment".into()).into(),
                );
            }
            if seg.cross(&extrusion).norm() < TOLERANCE {
                return Err(GeometryError::Degenerate(
                    "profile segment parallel to extrusion".into(),
                )
                .into());
            }
        }
        Ok(Self { profile, extrusion })
    }

    /// Index of the profile segment containing `u` and the fraction within it.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn segment_at(&self, u: f64) -> (usize, f64) {
        let last = self.profile.len() - 2;
        let i = (u.floor().max(0.0) as usize).min(last);
        (i, (u - i as f64).clamp(0.0, 1.0))
    }

    fn segment_dir(&self, i: usize) -> Vector3 {
        (self.profile[i + 1] - self.profile[i]).normalize()
    }
}

impl Surface for ExtrudedPolyline {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        let (i, frac) = self.segment_at(u);
        let base = self.profile[i] + (self.profile[i + 1] - self.profile[i]) * frac;
        Ok(base + self.extrusion * v)
    }

    fn normal(&self, u: f64, _v: f64) -> Result<Vector3> {
        let (i, _) = self.segment_at(u);
        let n = self.segment_dir(i).cross(&self.extrusion);
        let len = n.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(n / len)
    }

    #[allow(clippy::cast_precision_loss)]
    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, (self.profile.len() - 1) as f64, 0.0, 1.0)
    }

    fn is_closed(&self, dir: Direction) -> bool {
        match dir {
            Direction::U => {
                (self.profile[self.profile.len() - 1] - self.profile[0]).norm() < TOLERANCE
            }
            Direction::V => false,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn c1_discontinuities(&self, dir: Direction) -> Vec<f64> {
        if dir == Direction::V {
            return Vec::new();
        }
        let mut out = Vec::new();
        for i in 1..self.profile.len() - 1 {
            let before = self.segment_dir(i - 1);
            let after = self.segment_dir(i);
            if before.dot(&after) < 1.0 - TOLERANCE {
                out.push(i as f64);
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// An L-shaped profile extruded along +y: two faces meeting at a
    /// right-angle seam at u = 1.
    fn l_profile() -> ExtrudedPolyline {
        ExtrudedPolyline::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 1.0),
            ],
            Vector3::new(0.0, 2.0, 0.0),
        )
        .unwrap()
    }

    #[test]
    fn evaluate_along_profile_and_extrusion() {
        let s = l_profile();
        let p = s.evaluate(0.5, 0.5).unwrap();
        assert!((p - Point3::new(0.5, 1.0, 0.0)).norm() < TOLERANCE);
        let q = s.evaluate(1.5, 0.0).unwrap();
        assert!((q - Point3::new(1.0, 0.0, 0.5)).norm() < TOLERANCE);
    }

    #[test]
    fn corner_is_a_c1_discontinuity() {
        let s = l_profile();
        let d = s.c1_discontinuities(Direction::U);
        assert_eq!(d, vec![1.0]);
        assert!(s.c1_discontinuities(Direction::V).is_empty());
    }

    #[test]
    fn straight_profile_has_no_discontinuity() {
        let s = ExtrudedPolyline::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
            ],
            Vector3::z(),
        )
        .unwrap();
        assert!(s.c1_discontinuities(Direction::U).is_empty());
    }

    #[test]
    fn normals_flip_across_the_seam() {
        let s = l_profile();
        let n0 = s.normal(0.5, 0.5).unwrap();
        let n1 = s.normal(1.5, 0.5).unwrap();
        assert!(n0.dot(&n1).abs() < TOLERANCE);
    }

    #[test]
    fn closed_square_profile() {
        let s = ExtrudedPolyline::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(0.0, 0.0, 0.0),
            ],
            Vector3::y(),
        )
        .unwrap();
        assert!(s.is_closed(Direction::U));
        assert_eq!(s.c1_discontinuities(Direction::U).len(), 3);
    }
}
