//! The hidden-curve pipeline.
//!
//! Five stages run in a fixed order: curve extraction, the optional
//! monotonicity normalization, planar curve-curve intersection,
//! visibility resolution, and output serialization. Each stage takes
//! the whole fragment collection and hands a new one to the next; the
//! serializer always runs, on whatever the last executed stage
//! produced.

mod extract;
mod intersect;
mod monotone;
mod serialize;
mod visibility;

pub use extract::CurveExtractor;
pub use intersect::CurveIntersector;
pub use monotone::MonotonicityNormalizer;
pub use serialize::{
    BinarySink, CollectSink, JsonLinesSink, OutputRecord, OutputSerializer, OutputSink,
};
pub use visibility::{DepthBuffer, VisibilityResolver};

use std::io::Write;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, SceneError};
use crate::fragment::Visibility;
use crate::math::Vector3;
use crate::scene::SceneStore;

/// The fixed view direction. Scenes arrive pre-transformed so the
/// viewer looks along -Z, with smaller z nearer.
#[must_use]
pub fn view_direction() -> Vector3 {
    Vector3::new(0.0, 0.0, -1.0)
}

/// Per-run summary counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Fragments produced by extraction (after normalization, if run).
    pub extracted: usize,
    /// Fragments after the intersection stage.
    pub after_intersection: usize,
    /// Fragments the resolver marked hidden.
    pub hidden: usize,
    /// Records handed to the output sink.
    pub emitted: usize,
}

/// Front door of the crate: runs the configured stages over a scene
/// and streams the surviving fragments into an output sink.
pub struct HiddenCurvePipeline {
    config: Config,
}

impl HiddenCurvePipeline {
    /// Creates a pipeline with the given per-run configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs the pipeline over a scene.
    ///
    /// # Errors
    ///
    /// An empty scene is fatal, as is any stage failure; the error
    /// carries the offending stage's context.
    pub fn execute(&self, scene: &SceneStore, sink: &mut dyn OutputSink) -> Result<PipelineReport> {
        if scene.is_empty() {
            return Err(SceneError::EmptyScene.into());
        }

        let mut report = PipelineReport::default();
        let mut fragments = CurveExtractor::new(&self.config).execute(scene)?;
        if self.config.monotone {
            fragments = MonotonicityNormalizer::new(&self.config).execute(fragments);
        }
        report.extracted = fragments.len();
        debug!(fragments = report.extracted, "extraction complete");

        if self.config.stop_stage.runs_intersection() {
            fragments = CurveIntersector::new(&self.config).execute(fragments);
            report.after_intersection = fragments.len();
            debug!(fragments = report.after_intersection, "intersection complete");
        }

        if self.config.stop_stage.runs_visibility() {
            VisibilityResolver::new(&self.config).execute(scene, &mut fragments)?;
            report.hidden = fragments
                .iter()
                .filter(|(_, f)| f.visibility == Visibility::Hidden)
                .count();
            debug!(hidden = report.hidden, "visibility resolution complete");
        }

        report.emitted = OutputSerializer::new(&self.config).execute(scene, fragments, sink)?;
        if !self.config.quiet {
            info!(
                extracted = report.extracted,
                hidden = report.hidden,
                emitted = report.emitted,
                "hidden-curve pipeline finished"
            );
        }
        Ok(report)
    }

    /// Runs the pipeline into a byte sink, choosing the record format
    /// from [`Config::binary_output`].
    ///
    /// # Errors
    ///
    /// As [`HiddenCurvePipeline::execute`].
    pub fn execute_to_writer<W: Write>(
        &self,
        scene: &SceneStore,
        writer: W,
    ) -> Result<PipelineReport> {
        if self.config.binary_output {
            self.execute(scene, &mut BinarySink::new(writer))
        } else {
            self.execute(scene, &mut JsonLinesSink::new(writer))
        }
    }
}
