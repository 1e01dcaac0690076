use super::{Point2, TOLERANCE};

/// Even-odd point-in-polygon test.
///
/// Casts a ray in +x and counts edge crossings. Points on an edge may
/// classify either way; callers that care nudge the query point first.
#[must_use]
pub fn point_in_polygon(points: &[Point2], x: f64, y: f64) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = &points[i];
        let pj = &points[j];
        if (pi.y > y) != (pj.y > y) {
            let dy = pj.y - pi.y;
            if dy.abs() > TOLERANCE {
                let x_cross = pi.x + (y - pi.y) * (pj.x - pi.x) / dy;
                if x < x_cross {
                    inside = !inside;
                }
            }
        }
        j = i;
    }
    inside
}
