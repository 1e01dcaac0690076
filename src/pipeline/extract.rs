use tracing::debug;

use crate::config::{Config, CountAxis};
use crate::error::Result;
use crate::fragment::{Fragment, FragmentKind, FragmentSet};
use crate::geometry::curve::{planar_intersections, CurveForm, SampledCurve};
use crate::geometry::silhouette::{silhouette_curves, SilhouetteOptions};
use crate::geometry::surface::{Direction, Surface, SurfaceDomain};
use crate::geometry::trim::{clip_curve, TrimLoop};
use crate::math::{Point3, TOLERANCE};
use crate::scene::{ObjectData, ObjectId, SceneGeometry, SceneStore};

use super::view_direction;

/// Stage one: decomposes every scene object into classified curve
/// fragments.
///
/// Surfaces contribute boundaries, interior isoparametric curves,
/// tangent-plane discontinuity seams, and silhouettes; raw curves pass
/// through as independent fragments. All surface-derived curves are
/// built in the 2D parameter domain first (where isoline distribution,
/// silhouette pre-splitting, and trim clipping happen) and evaluated
/// into view space last, keeping the 2D preimage attached.
pub struct CurveExtractor<'a> {
    config: &'a Config,
}

impl<'a> CurveExtractor<'a> {
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Extracts fragments from every object, in scene insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if curve sampling, silhouette extraction, or
    /// surface evaluation fails for any object.
    pub fn execute(&self, scene: &SceneStore) -> Result<FragmentSet> {
        let mut set = FragmentSet::new();
        for (id, data) in scene.iter() {
            self.extract_object(id, data, &mut set)?;
        }
        Ok(set)
    }

    fn extract_object(&self, id: ObjectId, data: &ObjectData, set: &mut FragmentSet) -> Result<()> {
        match &data.geometry {
            SceneGeometry::Curve(curve) => {
                let domain = curve.domain();
                let sampled = SampledCurve::from_curve(
                    curve.as_ref(),
                    domain.t_min,
                    domain.t_max,
                    self.config.curve_samples,
                )?;
                set.insert(Fragment::new(FragmentKind::Independent, id, sampled));
            }
            SceneGeometry::SampledCurve(curve) => {
                let mut curve = curve.clone();
                if curve.coerce_uniform_weights() {
                    debug!(object = ?id, "coerced uniform rational weights");
                }
                set.insert(Fragment::new(FragmentKind::Independent, id, curve));
            }
            SceneGeometry::Surface(surface) => {
                self.extract_surface(id, data, surface.as_ref(), &[], set)?;
            }
            SceneGeometry::TrimmedSurface { surface, loops } => {
                self.extract_surface(id, data, surface.as_ref(), loops, set)?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn extract_surface(
        &self,
        id: ObjectId,
        data: &ObjectData,
        surface: &dyn Surface,
        loops: &[TrimLoop],
        set: &mut FragmentSet,
    ) -> Result<()> {
        let eps = self.config.tolerance;
        let samples = self.config.curve_samples.max(2);
        let domain = surface.domain();

        let opts = SilhouetteOptions {
            grid: self.config.silhouette_grid,
            normal_tolerance: self.config.silhouette_normal_tolerance,
            merge_tolerance: self.config.silhouette_merge_tolerance,
        };
        let silhouettes_2d = silhouette_curves(surface, &view_direction(), &opts)?;

        let silhouette_cuts = |curve2: &SampledCurve| -> Vec<f64> {
            let mut cuts = Vec::new();
            for sil in &silhouettes_2d {
                for (t, _) in planar_intersections(curve2, sil, eps) {
                    cuts.push(t);
                }
            }
            cuts
        };

        // Boundaries: domain extremes of each open direction, or the
        // trim loops when loops are present. Loop boundaries are split
        // where the silhouette set crosses them.
        if loops.is_empty() {
            for dir in [Direction::U, Direction::V] {
                if surface.is_closed(dir) {
                    continue;
                }
                for value in [domain.min(dir), domain.max(dir)] {
                    let curve2 = const_param_curve(&domain, dir, value, samples)?;
                    emit_fragment(surface, id, FragmentKind::Boundary, curve2, None, set)?;
                }
            }
        } else {
            for l in loops {
                let curve2 = l.to_curve()?;
                for piece in curve2.split_at_many(&silhouette_cuts(&curve2)) {
                    emit_fragment(surface, id, FragmentKind::Boundary, piece, l.shared_edge(), set)?;
                }
            }
        }

        // Interior curves: discontinuity seams at their exact
        // parameters, isolines apportioned across the sub-intervals
        // between them. Both are pre-split where silhouettes cross
        // them, then clipped by the trim loops.
        let mut interior: Vec<(FragmentKind, SampledCurve)> = Vec::new();
        for dir in [Direction::U, Direction::V] {
            let axis = count_axis(data, dir);
            let count = self.config.isoline_count(axis, data.resolution_override);
            let discs = surface.c1_discontinuities(dir);
            if self.config.show_discontinuities {
                for &d in &discs {
                    interior.push((
                        FragmentKind::Discontinuity,
                        const_param_curve(&domain, dir, d, samples)?,
                    ));
                }
            }
            for value in distribute_isolines(domain.min(dir), domain.max(dir), &discs, count) {
                interior.push((
                    FragmentKind::Isoparametric,
                    const_param_curve(&domain, dir, value, samples)?,
                ));
            }
        }
        for (kind, curve2) in interior {
            for piece in curve2.split_at_many(&silhouette_cuts(&curve2)) {
                for clipped in clip_curve(&piece, loops, eps)? {
                    emit_fragment(surface, id, kind, clipped, None, set)?;
                }
            }
        }

        for sil in &silhouettes_2d {
            for clipped in clip_curve(sil, loops, eps)? {
                emit_fragment(surface, id, FragmentKind::Silhouette, clipped, None, set)?;
            }
        }

        Ok(())
    }
}

/// Evaluates a parameter-space curve onto the surface and inserts the
/// resulting view-space fragment, preimage attached.
fn emit_fragment(
    surface: &dyn Surface,
    id: ObjectId,
    kind: FragmentKind,
    preimage: SampledCurve,
    shared_edge: Option<u32>,
    set: &mut FragmentSet,
) -> Result<()> {
    let mut points = Vec::with_capacity(preimage.points().len());
    for p in preimage.points() {
        points.push(surface.evaluate(p.x, p.y)?);
    }
    let curve = SampledCurve::new(preimage.params().to_vec(), points, preimage.form())?;
    let mut fragment = Fragment::new(kind, id, curve).with_preimage(preimage);
    if let Some(edge) = shared_edge {
        fragment = fragment.with_shared_edge(edge);
    }
    set.insert(fragment);
    Ok(())
}

fn count_axis(data: &ObjectData, dir: Direction) -> CountAxis {
    match dir {
        Direction::U => data.count_axes.0,
        Direction::V => data.count_axes.1,
    }
}

/// Builds the 2D constant-parameter curve at `value` along `dir`,
/// parameterized by the opposite coordinate.
#[allow(clippy::cast_precision_loss)]
fn const_param_curve(
    domain: &SurfaceDomain,
    dir: Direction,
    value: f64,
    samples: usize,
) -> Result<SampledCurve> {
    let across = match dir {
        Direction::U => Direction::V,
        Direction::V => Direction::U,
    };
    let (lo, hi) = (domain.min(across), domain.max(across));
    let mut params = Vec::with_capacity(samples);
    let mut points = Vec::with_capacity(samples);
    for i in 0..samples {
        let t = lo + (hi - lo) * (i as f64) / ((samples - 1) as f64);
        params.push(t);
        let (u, v) = match dir {
            Direction::U => (value, t),
            Direction::V => (t, value),
        };
        points.push(Point3::new(u, v, 0.0));
    }
    SampledCurve::new(params, points, CurveForm::Smooth)
}

/// Apportions `count` isoline positions over `[lo, hi]`, giving each
/// sub-interval between successive discontinuities a share proportional
/// to its span (largest-remainder rounding, remainder ties going to
/// the wider interval). Positions are strictly interior to their
/// sub-interval, so none coincides with a discontinuity.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn distribute_isolines(lo: f64, hi: f64, discs: &[f64], count: usize) -> Vec<f64> {
    let total = hi - lo;
    if count == 0 || total <= TOLERANCE {
        return Vec::new();
    }
    let mut edges = vec![lo];
    edges.extend(
        discs
            .iter()
            .copied()
            .filter(|&d| d > lo + TOLERANCE && d < hi - TOLERANCE),
    );
    edges.push(hi);

    let shares: Vec<f64> = edges
        .windows(2)
        .map(|w| (w[1] - w[0]) / total * count as f64)
        .collect();
    let mut counts: Vec<usize> = shares.iter().map(|s| s.floor() as usize).collect();
    let mut assigned: usize = counts.iter().sum();
    let mut remainders: Vec<(f64, f64, usize)> = shares
        .iter()
        .enumerate()
        .map(|(i, &s)| (s - s.floor(), s, i))
        .collect();
    remainders.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then(b.1.total_cmp(&a.1))
            .then(a.2.cmp(&b.2))
    });
    let mut k = 0;
    while assigned < count {
        counts[remainders[k].2] += 1;
        assigned += 1;
        k = (k + 1) % remainders.len();
    }

    let mut values = Vec::with_capacity(count);
    for (interval, &n) in edges.windows(2).zip(&counts) {
        for j in 1..=n {
            values.push(interval[0] + (interval[1] - interval[0]) * j as f64 / (n + 1) as f64);
        }
    }
    values
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::IsolineCounts;
    use crate::geometry::surface::{Cylinder, ExtrudedPolyline, Plane};
    use crate::math::Vector3;
    use crate::scene::{Attributes, SceneStore};

    fn unit_quad() -> Box<dyn Surface> {
        Box::new(Plane::axis_aligned(0.0, 1.0, 0.0, 1.0, 0.0).unwrap())
    }

    fn extract(scene: &SceneStore, config: &Config) -> FragmentSet {
        CurveExtractor::new(config).execute(scene).unwrap()
    }

    fn kind_count(set: &FragmentSet, kind: FragmentKind) -> usize {
        set.iter().filter(|(_, f)| f.kind == kind).count()
    }

    #[test]
    fn plane_yields_boundaries_and_isolines() {
        let mut scene = SceneStore::new();
        scene.add_surface(unit_quad(), Attributes::default());
        let config = Config {
            isolines: IsolineCounts::new(2, 3, 0),
            ..Config::default()
        };
        let set = extract(&scene, &config);
        // Four open-direction boundaries, 2 constant-u and 3 constant-v
        // isolines, no silhouettes on a flat patch facing the viewer.
        assert_eq!(kind_count(&set, FragmentKind::Boundary), 4);
        assert_eq!(kind_count(&set, FragmentKind::Isoparametric), 5);
        assert_eq!(kind_count(&set, FragmentKind::Silhouette), 0);
        assert_eq!(kind_count(&set, FragmentKind::Discontinuity), 0);
    }

    #[test]
    fn closed_direction_has_no_boundaries() {
        let mut scene = SceneStore::new();
        let cyl = Cylinder::new(Point3::origin(), 1.0, Vector3::y(), Vector3::x(), 0.0, 1.0)
            .unwrap();
        scene.add_surface(Box::new(cyl), Attributes::default());
        let config = Config {
            isolines: IsolineCounts::new(0, 0, 0),
            ..Config::default()
        };
        let set = extract(&scene, &config);
        // Only the two v-extreme rims; the closed u direction adds none.
        assert_eq!(kind_count(&set, FragmentKind::Boundary), 2);
        for (_, f) in set.iter() {
            if f.kind == FragmentKind::Boundary {
                assert!(f.curve.is_closed());
            }
        }
    }

    #[test]
    fn cylinder_silhouettes_are_extracted() {
        let mut scene = SceneStore::new();
        let cyl = Cylinder::new(Point3::origin(), 1.0, Vector3::y(), Vector3::x(), 0.0, 1.0)
            .unwrap();
        scene.add_surface(Box::new(cyl), Attributes::default());
        let set = extract(&scene, &Config::default());
        assert!(kind_count(&set, FragmentKind::Silhouette) >= 2);
        for (_, f) in set.iter() {
            if f.kind == FragmentKind::Silhouette {
                assert!(f.preimage.is_some());
            }
        }
    }

    #[test]
    fn isolines_are_split_at_silhouette_crossings() {
        let mut scene = SceneStore::new();
        let cyl = Cylinder::new(Point3::origin(), 1.0, Vector3::y(), Vector3::x(), 0.0, 1.0)
            .unwrap();
        scene.add_surface(Box::new(cyl), Attributes::default());
        // Constant-v isolines run the full closed u range and must be
        // cut where the two silhouette generators cross them.
        let config = Config {
            isolines: IsolineCounts::new(0, 2, 0),
            ..Config::default()
        };
        let set = extract(&scene, &config);
        assert!(kind_count(&set, FragmentKind::Isoparametric) >= 4);
    }

    #[test]
    fn discontinuity_seams_shape_isoline_distribution() {
        // L-profile extrusion: one interior crease at u = 1.
        let profile = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, -1.0),
        ];
        let surf = ExtrudedPolyline::new(profile, Vector3::y()).unwrap();
        let mut scene = SceneStore::new();
        scene.add_surface(Box::new(surf), Attributes::default());
        let config = Config {
            isolines: IsolineCounts::new(4, 0, 0),
            show_discontinuities: true,
            ..Config::default()
        };
        let set = extract(&scene, &config);
        assert_eq!(kind_count(&set, FragmentKind::Discontinuity), 1);
        // The crease splits [0, 2] into two unit spans: two isolines each.
        let iso_us: Vec<f64> = set
            .iter()
            .filter(|(_, f)| f.kind == FragmentKind::Isoparametric)
            .map(|(_, f)| f.preimage.as_ref().unwrap().points()[0].x)
            .collect();
        assert_eq!(iso_us.len(), 4);
        assert!(iso_us.iter().all(|&u| (u - 1.0).abs() > 0.1));
        assert_eq!(iso_us.iter().filter(|&&u| u < 1.0).count(), 2);
    }

    #[test]
    fn hiding_discontinuities_keeps_distribution() {
        let profile = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, -1.0),
        ];
        let surf = ExtrudedPolyline::new(profile, Vector3::y()).unwrap();
        let mut scene = SceneStore::new();
        scene.add_surface(Box::new(surf), Attributes::default());
        let config = Config {
            isolines: IsolineCounts::new(4, 0, 0),
            show_discontinuities: false,
            ..Config::default()
        };
        let set = extract(&scene, &config);
        assert_eq!(kind_count(&set, FragmentKind::Discontinuity), 0);
        let iso_us: Vec<f64> = set
            .iter()
            .filter(|(_, f)| f.kind == FragmentKind::Isoparametric)
            .map(|(_, f)| f.preimage.as_ref().unwrap().points()[0].x)
            .collect();
        // Distribution still avoids the crease even when not displayed.
        assert!(iso_us.iter().all(|&u| (u - 1.0).abs() > 0.1));
    }

    #[test]
    fn trimmed_surface_boundaries_come_from_loops() {
        use crate::math::Point2;
        let mut scene = SceneStore::new();
        let outer = TrimLoop::new(vec![
            Point2::new(0.1, 0.1),
            Point2::new(0.9, 0.1),
            Point2::new(0.9, 0.9),
            Point2::new(0.1, 0.9),
        ])
        .unwrap()
        .with_shared_edge(42);
        scene.add_trimmed_surface(unit_quad(), vec![outer], Attributes::default());
        let config = Config {
            isolines: IsolineCounts::new(0, 0, 0),
            ..Config::default()
        };
        let set = extract(&scene, &config);
        assert_eq!(kind_count(&set, FragmentKind::Boundary), 1);
        let (_, boundary) = set
            .iter()
            .find(|(_, f)| f.kind == FragmentKind::Boundary)
            .unwrap();
        assert_eq!(boundary.shared_edge, Some(42));
        assert!(boundary.curve.is_closed());
    }

    #[test]
    fn isolines_are_clipped_to_trim_region() {
        use crate::math::Point2;
        let mut scene = SceneStore::new();
        let outer = TrimLoop::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ])
        .unwrap();
        let hole = TrimLoop::new(vec![
            Point2::new(0.4, 0.4),
            Point2::new(0.6, 0.4),
            Point2::new(0.6, 0.6),
            Point2::new(0.4, 0.6),
        ])
        .unwrap();
        scene.add_trimmed_surface(unit_quad(), vec![outer, hole], Attributes::default());
        let config = Config {
            isolines: IsolineCounts::new(1, 0, 0),
            ..Config::default()
        };
        let set = extract(&scene, &config);
        // A requested count of 1 is forced to 2: u = 1/3 and u = 2/3,
        // neither of which crosses the hole, so both survive whole.
        assert_eq!(kind_count(&set, FragmentKind::Isoparametric), 2);
        for (_, f) in set.iter() {
            if f.kind == FragmentKind::Isoparametric {
                let mid = f.curve.point_at(0.5);
                assert!((mid.z - 0.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn raw_curves_become_independent_fragments() {
        use crate::geometry::curve::Line;
        let mut scene = SceneStore::new();
        scene.add_curve(
            Box::new(Line::new(Point3::origin(), Point3::new(1.0, 1.0, 0.0)).unwrap()),
            Attributes::default(),
        );
        let set = extract(&scene, &Config::default());
        assert_eq!(set.len(), 1);
        let (_, f) = set.iter().next().unwrap();
        assert_eq!(f.kind, FragmentKind::Independent);
        assert!(f.preimage.is_none());
    }

    #[test]
    fn presampled_rational_curve_is_coerced() {
        let curve = SampledCurve::with_weights(
            vec![0.0, 1.0],
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            vec![3.0, 3.0],
            CurveForm::Smooth,
        )
        .unwrap();
        let mut scene = SceneStore::new();
        scene.add_sampled_curve(curve, Attributes::default());
        let set = extract(&scene, &Config::default());
        let (_, f) = set.iter().next().unwrap();
        assert!(f.curve.weights().is_none());
    }

    #[test]
    fn distribute_respects_span_proportions() {
        let values = distribute_isolines(0.0, 4.0, &[1.0], 6);
        assert_eq!(values.len(), 6);
        assert_eq!(values.iter().filter(|&&v| v < 1.0).count(), 1);
        assert_eq!(values.iter().filter(|&&v| v > 1.0).count(), 5);
        assert!(values.iter().all(|&v| (v - 1.0).abs() > 1e-6));
    }

    #[test]
    fn distribute_without_discontinuities_is_uniform() {
        let values = distribute_isolines(0.0, 1.0, &[], 3);
        assert_eq!(values.len(), 3);
        for (i, v) in values.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let expected = (i + 1) as f64 / 4.0;
            assert!((v - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn volume_faces_draw_from_mapped_counts() {
        let mut scene = SceneStore::new();
        let faces: Vec<Box<dyn Surface>> = (0..6)
            .map(|i| {
                Box::new(Plane::axis_aligned(0.0, 1.0, 0.0, 1.0, f64::from(i)).unwrap())
                    as Box<dyn Surface>
            })
            .collect();
        scene.add_volume(faces, Attributes::default()).unwrap();
        let config = Config {
            isolines: IsolineCounts::new(2, 3, 5),
            ..Config::default()
        };
        let set = extract(&scene, &config);
        // Pairs draw (u,v), (u,w), (v,w): (2+3) + (2+5) + (3+5) lines,
        // two faces each.
        assert_eq!(kind_count(&set, FragmentKind::Isoparametric), 2 * (5 + 7 + 8));
    }
}
