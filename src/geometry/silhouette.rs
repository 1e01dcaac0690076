use std::collections::HashMap;

use crate::error::Result;
use crate::math::{Point3, Vector3};

use super::curve::{CurveForm, SampledCurve};
use super::surface::Surface;

/// Tolerances and sampling density for the numeric silhouette operator.
#[derive(Debug, Clone, Copy)]
pub struct SilhouetteOptions {
    /// Cells per parametric direction in the sampling grid.
    pub grid: usize,
    /// Gate for the degenerate-normal test: samples whose
    /// `normal . view` magnitude falls below this are nudged off zero.
    pub normal_tolerance: f64,
    /// Endpoint-merge tolerance (in parameter units) when chaining
    /// contour segments into polylines.
    pub merge_tolerance: f64,
}

impl Default for SilhouetteOptions {
    fn default() -> Self {
        Self {
            grid: 32,
            normal_tolerance: 1e-9,
            merge_tolerance: 1e-6,
        }
    }
}

/// Extracts the silhouette curves of a surface with respect to a view
/// direction, as polylines in the surface's 2D parameter domain.
///
/// The silhouette is the zero set of `f(u, v) = normal(u, v) . view`,
/// located by sampling `f` on a regular grid and tracing the contour
/// through each sign-changing cell (marching squares). Cells touching a
/// sample where the normal is degenerate are skipped. The resulting
/// segments are chained into merged polylines; an empty result is a
/// normal zero-contribution outcome.
///
/// # Errors
///
/// Returns an error only if the options are degenerate (zero grid).
pub fn silhouette_curves(
    surface: &dyn Surface,
    view_dir: &Vector3,
    opts: &SilhouetteOptions,
) -> Result<Vec<SampledCurve>> {
    let grid = opts.grid.max(2);
    let domain = surface.domain();
    let (u0, u1) = (domain.u_min, domain.u_max);
    let (v0, v1) = (domain.v_min, domain.v_max);

    // Sample f at the grid nodes; None marks a degenerate normal.
    let nodes = grid + 1;
    let mut values: Vec<Option<f64>> = Vec::with_capacity(nodes * nodes);
    #[allow(clippy::cast_precision_loss)]
    for j in 0..nodes {
        let v = v0 + (v1 - v0) * (j as f64) / (grid as f64);
        for i in 0..nodes {
            let u = u0 + (u1 - u0) * (i as f64) / (grid as f64);
            let f = surface.normal(u, v).ok().map(|n| {
                let d = n.dot(view_dir);
                // Nudge exact grazing samples off zero so every cell
                // edge sees a definite sign.
                if d.abs() < opts.normal_tolerance {
                    opts.normal_tolerance
                } else {
                    d
                }
            });
            values.push(f);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let node_uv = |i: usize, j: usize| -> (f64, f64) {
        (
            u0 + (u1 - u0) * (i as f64) / (grid as f64),
            v0 + (v1 - v0) * (j as f64) / (grid as f64),
        )
    };

    let mut segments: Vec<(Point3, Point3)> = Vec::new();
    for j in 0..grid {
        for i in 0..grid {
            let corners = [
                values[j * nodes + i],
                values[j * nodes + i + 1],
                values[(j + 1) * nodes + i + 1],
                values[(j + 1) * nodes + i],
            ];
            let Some(f) = all_finite(&corners) else {
                continue;
            };
            let uv = [
                node_uv(i, j),
                node_uv(i + 1, j),
                node_uv(i + 1, j + 1),
                node_uv(i, j + 1),
            ];

            // Zero crossings on the four cell edges.
            let mut crossings: Vec<Point3> = Vec::with_capacity(4);
            for e in 0..4 {
                let (fa, fb) = (f[e], f[(e + 1) % 4]);
                if fa * fb < 0.0 {
                    let t = fa / (fa - fb);
                    let (ua, va) = uv[e];
                    let (ub, vb) = uv[(e + 1) % 4];
                    crossings.push(Point3::new(ua + (ub - ua) * t, va + (vb - va) * t, 0.0));
                }
            }

            match crossings.len() {
                2 => segments.push((crossings[0], crossings[1])),
                4 => {
                    // Saddle cell: disambiguate by the sign at the center.
                    let center = (f[0] + f[1] + f[2] + f[3]) / 4.0;
                    if center * f[0] > 0.0 {
                        segments.push((crossings[0], crossings[3]));
                        segments.push((crossings[1], crossings[2]));
                    } else {
                        segments.push((crossings[0], crossings[1]));
                        segments.push((crossings[2], crossings[3]));
                    }
                }
                _ => {}
            }
        }
    }

    let chains = chain_segments(segments, opts.merge_tolerance);
    let mut curves = Vec::with_capacity(chains.len());
    for chain in chains {
        if chain.len() >= 2 {
            curves.push(SampledCurve::new(
                #[allow(clippy::cast_precision_loss)]
                (0..chain.len()).map(|i| i as f64).collect(),
                chain,
                CurveForm::Smooth,
            )?);
        }
    }
    Ok(curves)
}

fn all_finite(corners: &[Option<f64>; 4]) -> Option<[f64; 4]> {
    Some([corners[0]?, corners[1]?, corners[2]?, corners[3]?])
}

/// Chains unordered segments into polylines by matching endpoints
/// within `tolerance`, extending each chain in both directions.
fn chain_segments(segments: Vec<(Point3, Point3)>, tolerance: f64) -> Vec<Vec<Point3>> {
    if segments.is_empty() {
        return Vec::new();
    }

    let key = |p: &Point3| -> (i64, i64) {
        #[allow(clippy::cast_possible_truncation)]
        ((p.x / tolerance).round() as i64, (p.y / tolerance).round() as i64)
    };

    // Endpoint adjacency: quantized point -> (segment index, endpoint side).
    let mut adjacency: HashMap<(i64, i64), Vec<(usize, bool)>> = HashMap::new();
    for (idx, (p0, p1)) in segments.iter().enumerate() {
        adjacency.entry(key(p0)).or_default().push((idx, false));
        adjacency.entry(key(p1)).or_default().push((idx, true));
    }

    let mut used = vec![false; segments.len()];
    let mut chains = Vec::new();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let (p0, p1) = segments[start];
        let mut chain = vec![p0, p1];

        for forward in [true, false] {
            loop {
                let tip = if forward {
                    chain[chain.len() - 1]
                } else {
                    chain[0]
                };
                let Some(neighbors) = adjacency.get(&key(&tip)) else {
                    break;
                };
                let mut extended = false;
                for &(idx, at_end) in neighbors {
                    if used[idx] {
                        continue;
                    }
                    let (s0, s1) = segments[idx];
                    let next = if at_end { s0 } else { s1 };
                    used[idx] = true;
                    if forward {
                        chain.push(next);
                    } else {
                        chain.insert(0, next);
                    }
                    extended = true;
                    break;
                }
                if !extended {
                    break;
                }
            }
        }
        chains.push(chain);
    }

    chains
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::{Cylinder, Plane};
    use crate::math::Point3 as P3;

    #[test]
    fn plane_facing_viewer_has_no_silhouette() {
        let plane = Plane::axis_aligned(0.0, 1.0, 0.0, 1.0, 0.0).unwrap();
        let curves =
            silhouette_curves(&plane, &Vector3::new(0.0, 0.0, -1.0), &SilhouetteOptions::default())
                .unwrap();
        assert!(curves.is_empty());
    }

    #[test]
    fn cylinder_has_two_silhouette_lines() {
        // Viewed along -z, a y-axis cylinder is grazed where the normal
        // is perpendicular to the view, at u = pi/2 and u = 3*pi/2.
        let cyl = Cylinder::new(
            P3::origin(),
            1.0,
            Vector3::y(),
            Vector3::x(),
            0.0,
            2.0,
        )
        .unwrap();
        let curves =
            silhouette_curves(&cyl, &Vector3::new(0.0, 0.0, -1.0), &SilhouetteOptions::default())
                .unwrap();
        assert_eq!(curves.len(), 2);
        for c in &curves {
            // Each contour runs the full v span at nearly constant u.
            let us: Vec<f64> = c.points().iter().map(|p| p.x).collect();
            let spread = us.iter().copied().fold(f64::MIN, f64::max)
                - us.iter().copied().fold(f64::MAX, f64::min);
            assert!(spread < 0.5, "u spread too large: {spread}");
        }
    }

    #[test]
    fn chains_merge_shared_endpoints() {
        let segs = vec![
            (P3::new(0.0, 0.0, 0.0), P3::new(1.0, 0.0, 0.0)),
            (P3::new(2.0, 0.0, 0.0), P3::new(1.0, 0.0, 0.0)),
            (P3::new(5.0, 5.0, 0.0), P3::new(6.0, 5.0, 0.0)),
        ];
        let chains = chain_segments(segs, 1e-6);
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].len(), 3);
    }
}
