use std::f64::consts::{FRAC_PI_2, PI, TAU};

use tracing::debug;

use crate::config::Config;
use crate::fragment::FragmentSet;
use crate::geometry::curve::{CurveForm, SampledCurve};
use crate::math::TOLERANCE;

/// Optional stage two: splits active curves until each piece is
/// monotone in screen x.
///
/// Exact polylines are cut at the vertex where the x-displacement
/// reverses sign. Smooth samplings are first screened by the angular
/// span of their tangent directions (a cone narrower than a quarter
/// turn cannot reverse), then cut at the interpolated zeros of the
/// x-derivative.
pub struct MonotonicityNormalizer<'a> {
    config: &'a Config,
}

impl<'a> MonotonicityNormalizer<'a> {
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Normalizes every active fragment in the set.
    #[must_use]
    pub fn execute(&self, mut set: FragmentSet) -> FragmentSet {
        for id in set.ids() {
            let Some(fragment) = set.get(id) else {
                continue;
            };
            if !fragment.kind.is_active() {
                continue;
            }
            let cuts = match fragment.curve.form() {
                CurveForm::Polyline => reversal_cuts(&fragment.curve, self.config.tolerance),
                CurveForm::Smooth => {
                    if tangent_cone_span(&fragment.curve) >= FRAC_PI_2 {
                        derivative_zero_cuts(&fragment.curve, self.config.tolerance)
                    } else {
                        Vec::new()
                    }
                }
            };
            if cuts.is_empty() {
                continue;
            }
            debug!(fragment = ?id, cuts = cuts.len(), "splitting non-monotone fragment");
            // Parameters survive splitting, so later cuts land in the
            // right half of each split.
            let mut current = id;
            for t in cuts {
                if let Some((_, right)) = set.split(current, t) {
                    current = right;
                }
            }
        }
        set
    }
}

/// Vertex parameters where an exact polyline's x-displacement reverses.
fn reversal_cuts(curve: &SampledCurve, eps: f64) -> Vec<f64> {
    let points = curve.points();
    let params = curve.params();
    let mut cuts = Vec::new();
    let mut last_sign = 0.0;
    for i in 0..points.len() - 1 {
        let dx = points[i + 1].x - points[i].x;
        if dx.abs() <= eps {
            continue;
        }
        let sign = dx.signum();
        if last_sign != 0.0 && sign != last_sign {
            cuts.push(params[i]);
        }
        last_sign = sign;
    }
    cuts
}

/// Angular span of the cone containing all 2D tangent directions.
fn tangent_cone_span(curve: &SampledCurve) -> f64 {
    let points = curve.points();
    let mut base: Option<f64> = None;
    let (mut lo, mut hi) = (0.0_f64, 0.0_f64);
    for w in points.windows(2) {
        let (dx, dy) = (w[1].x - w[0].x, w[1].y - w[0].y);
        if dx.hypot(dy) < TOLERANCE {
            continue;
        }
        let theta = dy.atan2(dx);
        let Some(b) = base else {
            base = Some(theta);
            continue;
        };
        let mut delta = theta - b;
        while delta > PI {
            delta -= TAU;
        }
        while delta < -PI {
            delta += TAU;
        }
        lo = lo.min(delta);
        hi = hi.max(delta);
    }
    hi - lo
}

/// Zeros of the x-derivative of a smooth sampling, taking each
/// segment's slope at its parameter midpoint and interpolating between
/// consecutive midpoints.
fn derivative_zero_cuts(curve: &SampledCurve, eps: f64) -> Vec<f64> {
    let points = curve.points();
    let params = curve.params();
    let segments = points.len() - 1;
    let mut mids = Vec::with_capacity(segments);
    let mut slopes = Vec::with_capacity(segments);
    for i in 0..segments {
        let dt = params[i + 1] - params[i];
        mids.push((params[i] + params[i + 1]) / 2.0);
        slopes.push((points[i + 1].x - points[i].x) / dt);
    }
    let mut cuts = Vec::new();
    for i in 0..segments.saturating_sub(1) {
        let (a, b) = (slopes[i], slopes[i + 1]);
        if a.abs() <= eps || a * b >= 0.0 {
            continue;
        }
        cuts.push(mids[i] + (mids[i + 1] - mids[i]) * a / (a - b));
    }
    cuts
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fragment::{Fragment, FragmentKind};
    use crate::geometry::curve::Line;
    use crate::math::Point3;
    use crate::scene::{Attributes, ObjectId, SceneStore};

    fn object_id() -> ObjectId {
        let mut scene = SceneStore::new();
        scene.add_curve(
            Box::new(Line::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0)).unwrap()),
            Attributes::default(),
        )
    }

    fn normalize(set: FragmentSet) -> FragmentSet {
        let config = Config {
            monotone: true,
            ..Config::default()
        };
        MonotonicityNormalizer::new(&config).execute(set)
    }

    #[test]
    fn zigzag_polyline_splits_at_reversal_vertex() {
        let curve = SampledCurve::new(
            vec![0.0, 1.0, 2.0],
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
            CurveForm::Polyline,
        )
        .unwrap();
        let mut set = FragmentSet::new();
        set.insert(Fragment::new(FragmentKind::Boundary, object_id(), curve));
        let set = normalize(set);
        assert_eq!(set.len(), 2);
        let domains: Vec<_> = set.iter().map(|(_, f)| f.curve.domain()).collect();
        assert!((domains[0].t_max - 1.0).abs() < 1e-12);
        assert!((domains[1].t_min - 1.0).abs() < 1e-12);
    }

    #[test]
    fn smooth_arch_splits_near_its_apex() {
        // Right half of a circle: x rises to its maximum at t = 0 and
        // falls after, one reversal.
        let samples = 33;
        let mut params = Vec::new();
        let mut points = Vec::new();
        #[allow(clippy::cast_precision_loss)]
        for i in 0..samples {
            let t = -FRAC_PI_2 + PI * (i as f64) / ((samples - 1) as f64);
            params.push(t);
            points.push(Point3::new(t.cos(), t.sin(), 0.0));
        }
        let curve = SampledCurve::new(params, points, CurveForm::Smooth).unwrap();
        let mut set = FragmentSet::new();
        set.insert(Fragment::new(FragmentKind::Silhouette, object_id(), curve));
        let set = normalize(set);
        assert_eq!(set.len(), 2);
        let (_, first) = set.iter().next().unwrap();
        assert!(first.curve.domain().t_max.abs() < 0.2);
    }

    #[test]
    fn monotone_curves_are_left_alone() {
        let curve = SampledCurve::new(
            vec![0.0, 1.0, 2.0],
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(2.0, 0.5, 0.0),
            ],
            CurveForm::Polyline,
        )
        .unwrap();
        let mut set = FragmentSet::new();
        set.insert(Fragment::new(FragmentKind::Boundary, object_id(), curve));
        assert_eq!(normalize(set).len(), 1);
    }

    #[test]
    fn passive_fragments_are_ignored() {
        let curve = SampledCurve::new(
            vec![0.0, 1.0, 2.0],
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
            CurveForm::Polyline,
        )
        .unwrap();
        let mut set = FragmentSet::new();
        set.insert(Fragment::new(
            FragmentKind::Isoparametric,
            object_id(),
            curve,
        ));
        assert_eq!(normalize(set).len(), 1);
    }

    #[test]
    fn narrow_tangent_cone_skips_zero_search() {
        // Strictly monotone smooth curve with gentle waviness.
        let curve = SampledCurve::new(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.2, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(3.0, 0.2, 0.0),
            ],
            CurveForm::Smooth,
        )
        .unwrap();
        assert!(tangent_cone_span(&curve) < FRAC_PI_2);
        let mut set = FragmentSet::new();
        set.insert(Fragment::new(FragmentKind::Boundary, object_id(), curve));
        assert_eq!(normalize(set).len(), 1);
    }
}
