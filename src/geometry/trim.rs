use crate::error::{GeometryError, Result};
use crate::math::{polygon_2d::point_in_polygon, Point2, Point3, TOLERANCE};

use super::curve::{planar_intersections, CurveForm, SampledCurve};

/// A closed loop in a surface's 2D parameter domain delimiting the
/// surface's valid region.
///
/// Containment is even-odd across all loops of a trimmed surface, so
/// one outer loop plus hole loops needs no orientation convention. A
/// loop may carry a shared-edge identifier grouping it with the
/// matching loop of an adjacent trimmed patch.
#[derive(Debug, Clone)]
pub struct TrimLoop {
    points: Vec<Point2>,
    shared_edge: Option<u32>,
}

impl TrimLoop {
    /// Creates a trim loop from its parameter-space vertices.
    ///
    /// The loop closes implicitly; a duplicated closing vertex is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than three distinct vertices remain.
    pub fn new(mut points: Vec<Point2>) -> Result<Self> {
        if points.len() > 1 {
            let first = points[0];
            let last = points[points.len() - 1];
            if (last - first).norm() < TOLERANCE {
                points.pop();
            }
        }
        if points.len() < 3 {
            return Err(GeometryError::TooFewSamples {
                required: 3,
                actual: points.len(),
            }
            .into());
        }
        Ok(Self {
            points,
            shared_edge: None,
        })
    }

    /// Tags this loop with a shared-edge identifier.
    #[must_use]
    pub fn with_shared_edge(mut self, id: u32) -> Self {
        self.shared_edge = Some(id);
        self
    }

    /// The shared-edge identifier, if any.
    #[must_use]
    pub fn shared_edge(&self) -> Option<u32> {
        self.shared_edge
    }

    /// The loop vertices (without the closing duplicate).
    #[must_use]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Whether `(u, v)` lies inside this loop.
    #[must_use]
    pub fn contains(&self, u: f64, v: f64) -> bool {
        point_in_polygon(&self.points, u, v)
    }

    /// The loop as a closed parameter-space sampled curve
    /// (`(u, v, 0)` points, unit parameter step per vertex).
    ///
    /// # Errors
    ///
    /// Propagates curve construction failure (cannot happen for a
    /// validated loop).
    pub fn to_curve(&self) -> Result<SampledCurve> {
        let mut pts: Vec<Point3> = self
            .points
            .iter()
            .map(|p| Point3::new(p.x, p.y, 0.0))
            .collect();
        pts.push(Point3::new(self.points[0].x, self.points[0].y, 0.0));
        #[allow(clippy::cast_precision_loss)]
        SampledCurve::new(
            (0..pts.len()).map(|i| i as f64).collect(),
            pts,
            CurveForm::Polyline,
        )
    }
}

/// Even-odd containment across a loop set: a point is in the valid
/// region iff it lies inside an odd number of loops.
#[must_use]
pub fn point_in_loops(loops: &[TrimLoop], u: f64, v: f64) -> bool {
    loops.iter().filter(|l| l.contains(u, v)).count() % 2 == 1
}

/// Clips a parameter-space curve against a set of trim loops, returning
/// the runs that lie in the valid region.
///
/// The curve is split at every loop crossing; each resulting run is
/// kept iff its midpoint passes [`point_in_loops`].
///
/// # Errors
///
/// Propagates loop-curve construction failure.
pub fn clip_curve(curve: &SampledCurve, loops: &[TrimLoop], eps: f64) -> Result<Vec<SampledCurve>> {
    if loops.is_empty() {
        return Ok(vec![curve.clone()]);
    }
    let mut cuts: Vec<f64> = Vec::new();
    for l in loops {
        let boundary = l.to_curve()?;
        for (t, _) in planar_intersections(curve, &boundary, eps) {
            cuts.push(t);
        }
    }
    let pieces = curve.split_at_many(&cuts);
    Ok(pieces
        .into_iter()
        .filter(|piece| {
            let d = piece.domain();
            let mid = piece.point_at((d.t_min + d.t_max) / 2.0);
            point_in_loops(loops, mid.x, mid.y)
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square_loop(lo: f64, hi: f64) -> TrimLoop {
        TrimLoop::new(vec![
            Point2::new(lo, lo),
            Point2::new(hi, lo),
            Point2::new(hi, hi),
            Point2::new(lo, hi),
        ])
        .unwrap()
    }

    #[test]
    fn closing_vertex_is_dropped() {
        let l = TrimLoop::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(l.points().len(), 3);
    }

    #[test]
    fn containment_with_hole() {
        let loops = vec![square_loop(0.0, 1.0), square_loop(0.25, 0.75)];
        assert!(point_in_loops(&loops, 0.1, 0.1));
        assert!(!point_in_loops(&loops, 0.5, 0.5));
        assert!(!point_in_loops(&loops, 2.0, 2.0));
    }

    #[test]
    fn clip_keeps_inside_run() {
        // Horizontal line crossing the unit square: only the middle
        // run survives.
        let curve = SampledCurve::new(
            vec![0.0, 1.0],
            vec![Point3::new(-1.0, 0.5, 0.0), Point3::new(2.0, 0.5, 0.0)],
            CurveForm::Polyline,
        )
        .unwrap();
        let loops = vec![square_loop(0.0, 1.0)];
        let kept = clip_curve(&curve, &loops, 1e-9).unwrap();
        assert_eq!(kept.len(), 1);
        let d = kept[0].domain();
        // The square's walls sit at 1/3 and 2/3 of the curve parameter.
        assert!((d.t_min - 1.0 / 3.0).abs() < 1e-6);
        assert!((d.t_max - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn clip_fully_outside_yields_nothing() {
        let curve = SampledCurve::new(
            vec![0.0, 1.0],
            vec![Point3::new(-1.0, 5.0, 0.0), Point3::new(2.0, 5.0, 0.0)],
            CurveForm::Polyline,
        )
        .unwrap();
        let loops = vec![square_loop(0.0, 1.0)];
        assert!(clip_curve(&curve, &loops, 1e-9).unwrap().is_empty());
    }

    #[test]
    fn shared_edge_tag_round_trips() {
        let l = square_loop(0.0, 1.0).with_shared_edge(7);
        assert_eq!(l.shared_edge(), Some(7));
    }
}
