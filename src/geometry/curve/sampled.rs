use crate::error::{GeometryError, Result};
use crate::math::{intersect_2d::segment_segment_intersect_2d, Point3, TOLERANCE};

use super::{Curve, CurveDomain};

/// Fraction of a curve's parameter span below which a split request is
/// considered "at the domain boundary" and refused.
///
/// One constant serves every near-endpoint test in the pipeline.
pub const ENDPOINT_EPS: f64 = 1e-6;

/// How a sampled curve was produced.
///
/// `Polyline` curves are exact piecewise-linear geometry (trim loops,
/// raw polylines); `Smooth` curves are dense samplings of continuous
/// geometry. The monotonicity normalizer treats the two differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveForm {
    Polyline,
    Smooth,
}

/// A parameter-tagged polyline, the working representation of every
/// curve in the hidden-line pipeline.
///
/// Samples live either in view space (x, y screen, z depth, smaller z
/// nearer the viewer) or in a surface's parameter space (u, v, 0).
/// Parameters are strictly increasing and survive splitting unchanged:
/// a sub-curve keeps the original parameter values of its samples, so
/// parameters remain comparable across fragments of one source curve.
///
/// An optional per-sample weight vector carries rational curves through
/// the pipeline; uniform weights can be coerced away.
#[derive(Debug, Clone)]
pub struct SampledCurve {
    params: Vec<f64>,
    points: Vec<Point3>,
    weights: Option<Vec<f64>>,
    form: CurveForm,
}

impl SampledCurve {
    /// Creates a sampled curve from parallel parameter and point arrays.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two samples are given, the arrays
    /// differ in length, or the parameters are not strictly increasing.
    pub fn new(params: Vec<f64>, points: Vec<Point3>, form: CurveForm) -> Result<Self> {
        Self::build(params, points, None, form)
    }

    /// Creates a rational sampled curve with one weight per sample.
    ///
    /// # Errors
    ///
    /// As [`SampledCurve::new`], plus a length check on the weights.
    pub fn with_weights(
        params: Vec<f64>,
        points: Vec<Point3>,
        weights: Vec<f64>,
        form: CurveForm,
    ) -> Result<Self> {
        Self::build(params, points, Some(weights), form)
    }

    fn build(
        params: Vec<f64>,
        points: Vec<Point3>,
        weights: Option<Vec<f64>>,
        form: CurveForm,
    ) -> Result<Self> {
        if params.len() < 2 {
            return Err(GeometryError::TooFewSamples {
                required: 2,
                actual: params.len(),
            }
            .into());
        }
        if points.len() != params.len()
            || weights.as_ref().is_some_and(|w| w.len() != params.len())
        {
            return Err(GeometryError::Degenerate(
                "sample arrays must have equal length".into(),
            )
            .into());
        }
        if params.windows(2).any(|w| w[1] <= w[0]) {
            return Err(GeometryError::NonMonotoneParameters.into());
        }
        Ok(Self {
            params,
            points,
            weights,
            form,
        })
    }

    /// Samples a parametric curve over `[t0, t1]` into a smooth sampled curve.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two samples are requested, the
    /// interval is empty, or curve evaluation fails.
    pub fn from_curve(curve: &dyn Curve, t0: f64, t1: f64, samples: usize) -> Result<Self> {
        if samples < 2 {
            return Err(GeometryError::TooFewSamples {
                required: 2,
                actual: samples,
            }
            .into());
        }
        if t1 - t0 < TOLERANCE {
            return Err(GeometryError::Degenerate("empty parameter interval".into()).into());
        }
        let mut params = Vec::with_capacity(samples);
        let mut points = Vec::with_capacity(samples);
        #[allow(clippy::cast_precision_loss)]
        for i in 0..samples {
            let t = t0 + (t1 - t0) * (i as f64) / ((samples - 1) as f64);
            params.push(t);
            points.push(curve.evaluate(t)?);
        }
        Self::new(params, points, CurveForm::Smooth)
    }

    /// Creates a polyline curve with parameters `0, 1, ..., n-1`.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two points are given.
    #[allow(clippy::cast_precision_loss)]
    pub fn polyline(points: Vec<Point3>) -> Result<Self> {
        let params = (0..points.len()).map(|i| i as f64).collect();
        Self::new(params, points, CurveForm::Polyline)
    }

    /// Parameter values of the samples.
    #[must_use]
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Sample points.
    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Per-sample rational weights, if any.
    #[must_use]
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    /// How this curve was produced.
    #[must_use]
    pub fn form(&self) -> CurveForm {
        self.form
    }

    /// Returns the parameter domain.
    #[must_use]
    pub fn domain(&self) -> CurveDomain {
        CurveDomain::new(self.params[0], self.params[self.params.len() - 1])
    }

    /// Returns whether the curve's endpoints coincide geometrically.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        (self.points[self.points.len() - 1] - self.points[0]).norm() < TOLERANCE * 100.0
    }

    /// Evaluates the curve at parameter `t` by linear interpolation,
    /// clamping to the domain.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3 {
        let (i, frac) = self.locate(t);
        let p0 = &self.points[i];
        let p1 = &self.points[i + 1];
        p0 + (p1 - p0) * frac
    }

    /// Depth (z) at parameter `t`.
    #[must_use]
    pub fn depth_at(&self, t: f64) -> f64 {
        self.point_at(t).z
    }

    /// Finds the segment containing `t` and the local fraction within it.
    fn locate(&self, t: f64) -> (usize, f64) {
        let last = self.params.len() - 1;
        if t <= self.params[0] {
            return (0, 0.0);
        }
        if t >= self.params[last] {
            return (last - 1, 1.0);
        }
        let i = self.params.partition_point(|&p| p <= t) - 1;
        let i = i.min(last - 1);
        let span = self.params[i + 1] - self.params[i];
        (i, (t - self.params[i]) / span)
    }

    /// Splits the curve at parameter `t`, returning the two halves.
    ///
    /// Returns `None` if `t` lies within [`ENDPOINT_EPS`] of either end
    /// of the domain (relative to the span) — a refused split, reported
    /// as a stable terminal condition rather than an error. Parameter
    /// values of the samples are preserved on both halves.
    #[must_use]
    pub fn split_at(&self, t: f64) -> Option<(Self, Self)> {
        let domain = self.domain();
        let guard = ENDPOINT_EPS * domain.span();
        if t - domain.t_min < guard || domain.t_max - t < guard {
            return None;
        }

        let (i, frac) = self.locate(t);
        // Reuse an existing interior sample when t lands on one.
        let (cut_idx, cut_point, cut_weight, exact) = if frac * (self.params[i + 1] - self.params[i])
            < TOLERANCE
        {
            (i, self.points[i], self.weights.as_ref().map(|w| w[i]), true)
        } else {
            let p = self.point_at(t);
            let w = self
                .weights
                .as_ref()
                .map(|w| w[i] + (w[i + 1] - w[i]) * frac);
            (i + 1, p, w, false)
        };

        let mut left_params = self.params[..cut_idx].to_vec();
        let mut left_points = self.points[..cut_idx].to_vec();
        left_params.push(t);
        left_points.push(cut_point);

        let tail = if exact { cut_idx + 1 } else { cut_idx };
        let mut right_params = vec![t];
        let mut right_points = vec![cut_point];
        right_params.extend_from_slice(&self.params[tail..]);
        right_points.extend_from_slice(&self.points[tail..]);

        let (left_weights, right_weights) = match (&self.weights, cut_weight) {
            (Some(w), Some(cw)) => {
                let mut lw = w[..cut_idx].to_vec();
                lw.push(cw);
                let mut rw = vec![cw];
                rw.extend_from_slice(&w[tail..]);
                (Some(lw), Some(rw))
            }
            _ => (None, None),
        };

        let left = Self {
            params: left_params,
            points: left_points,
            weights: left_weights,
            form: self.form,
        };
        let right = Self {
            params: right_params,
            points: right_points,
            weights: right_weights,
            form: self.form,
        };
        Some((left, right))
    }

    /// Splits the curve at every parameter in `cuts`, skipping refused
    /// splits, and returns the resulting pieces in parameter order.
    #[must_use]
    pub fn split_at_many(&self, cuts: &[f64]) -> Vec<Self> {
        let mut sorted = cuts.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mut pieces = vec![self.clone()];
        for &t in &sorted {
            let Some(last) = pieces.pop() else { break };
            match last.split_at(t) {
                Some((a, b)) => {
                    pieces.push(a);
                    pieces.push(b);
                }
                None => pieces.push(last),
            }
        }
        pieces
    }

    /// Coerces a rational curve with uniform weights to plain Euclidean
    /// form by dropping the weight vector. Non-uniform weights are left
    /// untouched. Returns whether a coercion happened.
    pub fn coerce_uniform_weights(&mut self) -> bool {
        let Some(weights) = &self.weights else {
            return false;
        };
        let w0 = weights[0];
        if weights.iter().all(|w| (w - w0).abs() < TOLERANCE) {
            self.weights = None;
            true
        } else {
            false
        }
    }
}

/// All planar (x, y) intersections between two sampled curves.
///
/// Returns `(t_a, t_b)` parameter pairs sorted along `a`, with hits
/// closer than `eps` in `a`-parameter deduplicated (adjacent segments
/// sharing a vertex would otherwise report the crossing twice).
#[must_use]
pub fn planar_intersections(a: &SampledCurve, b: &SampledCurve, eps: f64) -> Vec<(f64, f64)> {
    let mut hits: Vec<(f64, f64)> = Vec::new();
    let ap = a.points();
    let bp = b.points();
    for i in 0..ap.len() - 1 {
        for j in 0..bp.len() - 1 {
            if let Some((_, ts, us)) = segment_segment_intersect_2d(&ap[i], &ap[i + 1], &bp[j], &bp[j + 1])
            {
                let ta = a.params[i] + (a.params[i + 1] - a.params[i]) * ts;
                let tb = b.params[j] + (b.params[j + 1] - b.params[j]) * us;
                hits.push((ta, tb));
            }
        }
    }
    hits.sort_by(|x, y| x.0.total_cmp(&y.0));
    let span_a = a.domain().span();
    let span_b = b.domain().span();
    let mut deduped: Vec<(f64, f64)> = Vec::with_capacity(hits.len());
    for (ta, tb) in hits {
        let duplicate = deduped.iter().any(|&(pa, pb)| {
            (ta - pa).abs() < eps.max(TOLERANCE * span_a) && (tb - pb).abs() < eps.max(TOLERANCE * span_b)
        });
        if !duplicate {
            deduped.push((ta, tb));
        }
    }
    deduped
}
