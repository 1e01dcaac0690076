use super::{Point3, Vector3, TOLERANCE};

/// Bounded segment-segment intersection in the projection plane.
///
/// Only x and y participate; z rides along from segment `a`. Returns
/// `(intersection_point, t, u)` where `t` and `u` are in `[0, 1]`.
#[must_use]
pub fn segment_segment_intersect_2d(
    a0: &Point3,
    a1: &Point3,
    b0: &Point3,
    b1: &Point3,
) -> Option<(Point3, f64, f64)> {
    let da = Vector3::new(a1.x - a0.x, a1.y - a0.y, 0.0);
    let db = Vector3::new(b1.x - b0.x, b1.y - b0.y, 0.0);

    let cross = da.x * db.y - da.y * db.x;
    if cross.abs() < TOLERANCE {
        return None;
    }

    let dx = b0.x - a0.x;
    let dy = b0.y - a0.y;
    let t = (dx * db.y - dy * db.x) / cross;
    let u = (dx * da.y - dy * da.x) / cross;

    // Include endpoints within a small epsilon.
    let eps = TOLERANCE;
    if t >= -eps && t <= 1.0 + eps && u >= -eps && u <= 1.0 + eps {
        let t_clamped = t.clamp(0.0, 1.0);
        let pt = Point3::new(
            a0.x + da.x * t_clamped,
            a0.y + da.y * t_clamped,
            a0.z + (a1.z - a0.z) * t_clamped,
        );
        Some((pt, t_clamped, u.clamp(0.0, 1.0)))
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn segment_segment_crossing() {
        let a0 = Point3::new(0.0, 0.0, 0.0);
        let a1 = Point3::new(2.0, 2.0, 0.0);
        let b0 = Point3::new(0.0, 2.0, 0.0);
        let b1 = Point3::new(2.0, 0.0, 0.0);
        let (pt, t, u) = segment_segment_intersect_2d(&a0, &a1, &b0, &b1).unwrap();
        assert!((pt.x - 1.0).abs() < TOLERANCE);
        assert!((pt.y - 1.0).abs() < TOLERANCE);
        assert!((t - 0.5).abs() < TOLERANCE);
        assert!((u - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn segment_segment_interpolates_depth() {
        // Depth comes from segment a, interpolated at the crossing.
        let a0 = Point3::new(0.0, 0.0, 1.0);
        let a1 = Point3::new(2.0, 2.0, 3.0);
        let b0 = Point3::new(0.0, 2.0, 0.0);
        let b1 = Point3::new(2.0, 0.0, 0.0);
        let (pt, _, _) = segment_segment_intersect_2d(&a0, &a1, &b0, &b1).unwrap();
        assert!((pt.z - 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn segment_segment_no_crossing() {
        let a0 = Point3::new(0.0, 0.0, 0.0);
        let a1 = Point3::new(1.0, 0.0, 0.0);
        let b0 = Point3::new(0.0, 1.0, 0.0);
        let b1 = Point3::new(1.0, 1.0, 0.0);
        assert!(segment_segment_intersect_2d(&a0, &a1, &b0, &b1).is_none());
    }
}
