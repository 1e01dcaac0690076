use crate::error::ConfigError;

/// Interior isoline counts for the three parametric directions of the scene.
///
/// Surfaces consume `u` and `v`; the `w` count applies to the third
/// direction of volumetric inputs, whose boundary faces map their own
/// parameters onto `(u, v, w)` pairwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsolineCounts {
    pub u: usize,
    pub v: usize,
    pub w: usize,
}

impl IsolineCounts {
    /// Creates isoline counts from explicit per-direction values.
    #[must_use]
    pub fn new(u: usize, v: usize, w: usize) -> Self {
        Self { u, v, w }
    }

    /// Parses a `"U:V:W"` count string, e.g. `"4:4:2"`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedIsolineCounts`] if the string does
    /// not consist of exactly three `:`-separated non-negative integers.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::MalformedIsolineCounts {
            input: input.to_owned(),
        };
        let mut parts = input.split(':');
        let mut next = || -> Result<usize, ConfigError> {
            parts
                .next()
                .ok_or_else(malformed)?
                .trim()
                .parse::<usize>()
                .map_err(|_| malformed())
        };
        let u = next()?;
        let v = next()?;
        let w = next()?;
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(Self { u, v, w })
    }
}

impl Default for IsolineCounts {
    fn default() -> Self {
        Self { u: 2, v: 2, w: 2 }
    }
}

/// Which parametric direction of the scene a count is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountAxis {
    U,
    V,
    W,
}

impl IsolineCounts {
    /// Returns the count for a given scene axis.
    #[must_use]
    pub fn along(&self, axis: CountAxis) -> usize {
        match axis {
            CountAxis::U => self.u,
            CountAxis::V => self.v,
            CountAxis::W => self.w,
        }
    }
}

/// The stage after which the pipeline stops.
///
/// The serializer always runs on whatever the last executed stage
/// produced; fragments whose visibility was never resolved are emitted
/// with their tri-state flag still unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopStage {
    /// Stop after curve extraction (and the optional monotonicity pass).
    Extraction,
    /// Stop after planar curve-curve intersection.
    Intersection,
    /// Run the full pipeline including visibility resolution.
    #[default]
    Visibility,
}

impl StopStage {
    /// Whether the intersection stage runs under this stop setting.
    #[must_use]
    pub fn runs_intersection(self) -> bool {
        matches!(self, Self::Intersection | Self::Visibility)
    }

    /// Whether the visibility stage runs under this stop setting.
    #[must_use]
    pub fn runs_visibility(self) -> bool {
        matches!(self, Self::Visibility)
    }
}

/// Immutable per-run configuration, threaded through every stage entry
/// point in place of process-wide mutable state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Suppress the per-run summary log line.
    pub quiet: bool,
    /// Emit hidden fragments (with a thin width) instead of dropping them.
    pub dump_hidden: bool,
    /// Interior isoline counts per scene direction.
    pub isolines: IsolineCounts,
    /// Emit C1-discontinuity curves as fragments. Discontinuity
    /// locations always shape isoline sample distribution regardless.
    pub show_discontinuities: bool,
    /// Write binary output records instead of JSON lines.
    pub binary_output: bool,
    /// Run the monotonicity normalizer on active curves.
    pub monotone: bool,
    /// Planar and depth comparison epsilon for the intersection and
    /// visibility stages.
    pub tolerance: f64,
    /// Extra slack added to `tolerance` when comparing a sample's own
    /// depth against the depth buffer; absorbs the chord error of the
    /// coarse occluder tessellation.
    pub depth_bias: f64,
    /// Stage after which to stop.
    pub stop_stage: StopStage,
    /// Depth buffer resolution (cells per side).
    pub depth_resolution: usize,
    /// Samples per curve when evaluating parametric geometry into
    /// view-space polylines.
    pub curve_samples: usize,
    /// Grid density for the numeric silhouette operator.
    pub silhouette_grid: usize,
    /// Tolerance gating the degenerate-normal test in the silhouette
    /// operator.
    pub silhouette_normal_tolerance: f64,
    /// Endpoint-merge tolerance when chaining silhouette segments.
    pub silhouette_merge_tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quiet: false,
            dump_hidden: false,
            isolines: IsolineCounts::default(),
            show_discontinuities: true,
            binary_output: false,
            monotone: false,
            tolerance: 1e-6,
            depth_bias: 1e-3,
            stop_stage: StopStage::Visibility,
            depth_resolution: 256,
            curve_samples: 33,
            silhouette_grid: 32,
            silhouette_normal_tolerance: 1e-9,
            silhouette_merge_tolerance: 1e-6,
        }
    }
}

impl Config {
    /// Resolves the interior isoline count for one surface direction.
    ///
    /// Applies the per-object resolution override (a real multiplier on
    /// the configured default), clamps to zero, and forces a request of
    /// exactly one isoline up to two so a lone interior line never
    /// masquerades as a seam.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn isoline_count(&self, axis: CountAxis, resolution_override: Option<f64>) -> usize {
        let base = self.isolines.along(axis);
        let requested = match resolution_override {
            Some(mult) => (base as f64 * mult).round().max(0.0) as usize,
            None => base,
        };
        if requested == 1 {
            2
        } else {
            requested
        }
    }
}
