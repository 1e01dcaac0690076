use std::io::Write;

use serde::Serialize;
use tracing::warn;

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::fragment::{FragmentKind, FragmentSet, Visibility};
use crate::scene::SceneStore;

/// Width given to hidden fragments when `dump_hidden` emits them.
const HIDDEN_WIDTH: f64 = 0.1;

/// One serialized curve fragment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub kind: FragmentKind,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    pub width: f64,
    pub points: Vec<[f64; 3]>,
}

/// Receives serialized fragments one at a time.
pub trait OutputSink {
    /// Emits one record.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    fn emit(&mut self, record: &OutputRecord) -> Result<()>;
}

/// Text sink: one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputSink for JsonLinesSink<W> {
    fn emit(&mut self, record: &OutputRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|e| PipelineError::Serialization(e.to_string()))?;
        self.writer.write_all(b"\n").map_err(PipelineError::Sink)?;
        Ok(())
    }
}

/// Binary sink with a fixed little-endian framing per record:
/// kind and visibility bytes, a presence-flag byte, the optional layer
/// (u16 length + UTF-8) and color (u32), the width (f64), then the
/// point count (u32) followed by x, y, z as f64 each.
pub struct BinarySink<W: Write> {
    writer: W,
}

impl<W: Write> BinarySink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputSink for BinarySink<W> {
    fn emit(&mut self, record: &OutputRecord) -> Result<()> {
        let w = &mut self.writer;
        let mut flags = 0_u8;
        if record.layer.is_some() {
            flags |= 1;
        }
        if record.color.is_some() {
            flags |= 2;
        }
        let mut write = |bytes: &[u8]| w.write_all(bytes).map_err(PipelineError::Sink);
        write(&[kind_code(record.kind), visibility_code(record.visibility), flags])?;
        if let Some(layer) = &record.layer {
            let bytes = layer.as_bytes();
            let len = u16::try_from(bytes.len())
                .map_err(|_| PipelineError::Serialization("layer name too long".into()))?;
            write(&len.to_le_bytes())?;
            write(bytes)?;
        }
        if let Some(color) = record.color {
            write(&color.to_le_bytes())?;
        }
        write(&record.width.to_le_bytes())?;
        let count = u32::try_from(record.points.len())
            .map_err(|_| PipelineError::Serialization("too many points".into()))?;
        write(&count.to_le_bytes())?;
        for p in &record.points {
            for coord in p {
                write(&coord.to_le_bytes())?;
            }
        }
        Ok(())
    }
}

fn kind_code(kind: FragmentKind) -> u8 {
    match kind {
        FragmentKind::Independent => 0,
        FragmentKind::Boundary => 1,
        FragmentKind::Isoparametric => 2,
        FragmentKind::Silhouette => 3,
        FragmentKind::Discontinuity => 4,
    }
}

fn visibility_code(visibility: Visibility) -> u8 {
    match visibility {
        Visibility::Unknown => 0,
        Visibility::Visible => 1,
        Visibility::Hidden => 2,
    }
}

/// In-memory sink, for tests and for callers that post-process records.
#[derive(Debug, Default)]
pub struct CollectSink {
    records: Vec<OutputRecord>,
}

impl CollectSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The records emitted so far.
    #[must_use]
    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }
}

impl OutputSink for CollectSink {
    fn emit(&mut self, record: &OutputRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Stage five: streams fragments into a sink, one at a time, freeing
/// each as it goes.
///
/// Hidden fragments are dropped unless `dump_hidden` is set, in which
/// case they carry a distinguishing thin width. Display attributes are
/// copied from the origin object; a fragment whose origin has vanished
/// is emitted without them, with a warning. Unresolved visibility
/// passes through unchanged.
pub struct OutputSerializer<'a> {
    config: &'a Config,
}

impl<'a> OutputSerializer<'a> {
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Serializes the whole set, returning the number of records
    /// emitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails.
    pub fn execute(
        &self,
        scene: &SceneStore,
        mut fragments: FragmentSet,
        sink: &mut dyn OutputSink,
    ) -> Result<usize> {
        let mut emitted = 0;
        for id in fragments.ids() {
            let Some(fragment) = fragments.remove(id) else {
                continue;
            };
            if fragment.visibility == Visibility::Hidden && !self.config.dump_hidden {
                continue;
            }
            let attributes = match scene.object(fragment.origin) {
                Ok(data) => Some(data.attributes.clone()),
                Err(_) => {
                    warn!(fragment = ?id, "origin object missing, emitting without attributes");
                    None
                }
            };
            let width = if fragment.visibility == Visibility::Hidden {
                HIDDEN_WIDTH
            } else {
                attributes.as_ref().map_or(1.0, |a| a.width)
            };
            let record = OutputRecord {
                kind: fragment.kind,
                visibility: fragment.visibility,
                layer: attributes.as_ref().map(|a| a.layer.clone()),
                color: attributes.as_ref().map(|a| a.color),
                width,
                points: fragment
                    .curve
                    .points()
                    .iter()
                    .map(|p| [p.x, p.y, p.z])
                    .collect(),
            };
            sink.emit(&record)?;
            emitted += 1;
        }
        Ok(emitted)
    }
}
