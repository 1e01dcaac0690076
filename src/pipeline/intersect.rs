use std::f64::consts::FRAC_1_SQRT_2;

use tracing::debug;

use crate::config::Config;
use crate::fragment::{Fragment, FragmentId, FragmentKind, FragmentSet};
use crate::geometry::curve::{planar_intersections, SampledCurve, ENDPOINT_EPS};
use crate::math::TOLERANCE;

/// Cosine of the turn angle above which a silhouette vertex counts as
/// a cusp.
const CUSP_DOT: f64 = FRAC_1_SQRT_2;

/// Stage three: splits fragments at their planar (screen x, y)
/// crossings so that visibility can only change at fragment endpoints.
///
/// Three passes run in order. Pass one splits every passive curve
/// where an active curve at or in front of it crosses. Pass two
/// pre-splits silhouettes at cusp vertices. Pass three intersects the
/// active curves among themselves: at each crossing only the farther
/// curve is split and rescanned; the nearer curve passes through the
/// crossing whole, since its visibility cannot change there.
///
/// Splits requested within [`ENDPOINT_EPS`] of a fragment's own domain
/// boundary are refused, which is also what terminates re-encounters
/// of an already-consumed crossing.
pub struct CurveIntersector<'a> {
    config: &'a Config,
}

enum PairOutcome {
    /// No split happened; move to the next pair.
    Advance,
    /// The fragment at the outer scan position was replaced by its
    /// halves; rescan the remainder against the first half.
    OuterSplit,
    /// The fragment at the inner scan position was replaced; re-check
    /// the same position.
    InnerSplit,
}

impl<'a> CurveIntersector<'a> {
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Runs the three passes and returns the refined set.
    #[must_use]
    pub fn execute(&self, mut set: FragmentSet) -> FragmentSet {
        self.split_passive_by_active(&mut set);
        self.split_silhouette_cusps(&mut set);
        self.split_active_by_active(&mut set);
        debug!(fragments = set.len(), "intersection passes done");
        set
    }

    /// Pass one: passive curves split where active curves cross them
    /// at equal or lesser depth.
    fn split_passive_by_active(&self, set: &mut FragmentSet) {
        let eps = self.config.tolerance;
        let actives: Vec<FragmentId> = set
            .iter()
            .filter(|(_, f)| f.kind.is_active())
            .map(|(id, _)| id)
            .collect();
        let passives: Vec<FragmentId> = set
            .iter()
            .filter(|(_, f)| !f.kind.is_active())
            .map(|(id, _)| id)
            .collect();

        // Each entry is a passive fragment and the index of the first
        // active it has not been checked against yet; pieces of a
        // split resume after the active that cut them.
        let mut work: Vec<(FragmentId, usize)> =
            passives.into_iter().map(|id| (id, 0)).collect();
        while let Some((pid, start)) = work.pop() {
            let mut split_into: Option<(Vec<FragmentId>, usize)> = None;
            for (ai, &aid) in actives.iter().enumerate().skip(start) {
                let Some(cuts) = passive_cuts(set, pid, aid, eps) else {
                    continue;
                };
                if cuts.is_empty() {
                    continue;
                }
                let pieces = split_many(set, pid, &cuts);
                if pieces.len() > 1 {
                    split_into = Some((pieces, ai + 1));
                    break;
                }
            }
            if let Some((pieces, resume)) = split_into {
                for piece in pieces {
                    work.push((piece, resume));
                }
            }
        }
    }

    /// Pass two: silhouettes split at sharp direction changes.
    fn split_silhouette_cusps(&self, set: &mut FragmentSet) {
        for id in set.ids() {
            let Some(fragment) = set.get(id) else {
                continue;
            };
            if fragment.kind != FragmentKind::Silhouette {
                continue;
            }
            let cuts = cusp_cuts(&fragment.curve);
            let mut current = id;
            for t in cuts {
                if let Some((_, right)) = set.split(current, t) {
                    current = right;
                }
            }
        }
    }

    /// Pass three: active curves against each other. The side list
    /// `order` keeps the scan stable while fragments are replaced by
    /// their halves in place.
    fn split_active_by_active(&self, set: &mut FragmentSet) {
        let eps = self.config.tolerance;
        let mut order: Vec<FragmentId> = set
            .iter()
            .filter(|(_, f)| f.kind.is_active())
            .map(|(id, _)| id)
            .collect();

        let mut i = 0;
        while i < order.len() {
            let mut j = i + 1;
            while j < order.len() {
                match process_pair(set, &mut order, i, j, eps) {
                    PairOutcome::Advance => j += 1,
                    PairOutcome::OuterSplit => j = i + 1,
                    PairOutcome::InnerSplit => {}
                }
            }
            i += 1;
        }
    }
}

/// Cut parameters on a passive fragment where an active fragment
/// crosses it at equal or lesser depth, interior to both domains.
/// `None` when either fragment is gone or the pair shares an edge.
fn passive_cuts(
    set: &FragmentSet,
    pid: FragmentId,
    aid: FragmentId,
    eps: f64,
) -> Option<Vec<f64>> {
    let passive = set.get(pid)?;
    let active = set.get(aid)?;
    if same_shared_edge(passive, active) {
        return None;
    }
    let a_dom = active.curve.domain();
    let guard = ENDPOINT_EPS * a_dom.span();
    let cuts = planar_intersections(&passive.curve, &active.curve, eps)
        .into_iter()
        .filter(|&(tp, ta)| {
            if ta - a_dom.t_min < guard || a_dom.t_max - ta < guard {
                return false;
            }
            active.curve.depth_at(ta) <= passive.curve.depth_at(tp) + eps
        })
        .map(|(tp, _)| tp)
        .collect();
    Some(cuts)
}

fn process_pair(
    set: &mut FragmentSet,
    order: &mut Vec<FragmentId>,
    i: usize,
    j: usize,
    eps: f64,
) -> PairOutcome {
    // Decide every crossing of the pair up front: position of the
    // farther fragment and the cut parameter on it. The nearer curve
    // is never split.
    let decisions: Vec<(usize, f64)> = {
        let (Some(a), Some(b)) = (set.get(order[i]), set.get(order[j])) else {
            return PairOutcome::Advance;
        };
        if same_shared_edge(a, b) {
            return PairOutcome::Advance;
        }
        planar_intersections(&a.curve, &b.curve, eps)
            .into_iter()
            .filter_map(|(ta, tb)| {
                let da = a.curve.depth_at(ta);
                let db = b.curve.depth_at(tb);
                if (da - db).abs() <= eps {
                    // Grazing contact: the curves touch in depth, no
                    // visibility change can start here.
                    return None;
                }
                if da > db {
                    Some((i, ta))
                } else {
                    Some((j, tb))
                }
            })
            .collect()
    };

    for (far_pos, far_t) in decisions {
        if let Some((h1, h2)) = set.split(order[far_pos], far_t) {
            order.splice(far_pos..=far_pos, [h1, h2]);
            return if far_pos == i {
                PairOutcome::OuterSplit
            } else {
                PairOutcome::InnerSplit
            };
        }
    }
    PairOutcome::Advance
}

/// Splits a fragment at each cut in turn, skipping refused splits, and
/// returns the resulting ids in parameter order.
fn split_many(set: &mut FragmentSet, id: FragmentId, cuts: &[f64]) -> Vec<FragmentId> {
    let mut sorted = cuts.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|a, b| (*a - *b).abs() < TOLERANCE);
    let mut out = Vec::new();
    let mut current = id;
    for &t in &sorted {
        if let Some((left, right)) = set.split(current, t) {
            out.push(left);
            current = right;
        }
    }
    out.push(current);
    out
}

fn same_shared_edge(a: &Fragment, b: &Fragment) -> bool {
    matches!((a.shared_edge, b.shared_edge), (Some(x), Some(y)) if x == y)
}

/// Interior vertex parameters where the 2D direction turns by more
/// than 45 degrees.
fn cusp_cuts(curve: &SampledCurve) -> Vec<f64> {
    let points = curve.points();
    let params = curve.params();
    let mut cuts = Vec::new();
    for i in 1..points.len() - 1 {
        let (ax, ay) = (points[i].x - points[i - 1].x, points[i].y - points[i - 1].y);
        let (bx, by) = (points[i + 1].x - points[i].x, points[i + 1].y - points[i].y);
        let (la, lb) = (ax.hypot(ay), bx.hypot(by));
        if la < TOLERANCE || lb < TOLERANCE {
            continue;
        }
        if (ax * bx + ay * by) / (la * lb) < CUSP_DOT {
            cuts.push(params[i]);
        }
    }
    cuts
}
