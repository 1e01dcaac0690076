use thiserror::Error;

/// Top-level error type for the Sightline hidden-curve engine.
#[derive(Debug, Error)]
pub enum SightlineError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Tessellation(#[from] TessellationError),
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,

    #[error("curve needs at least {required} samples, got {actual}")]
    TooFewSamples { required: usize, actual: usize },

    #[error("curve parameters must be strictly increasing")]
    NonMonotoneParameters,
}

/// Errors related to the scene model.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("scene contains no objects")]
    EmptyScene,

    #[error("a volume must have exactly 6 boundary surfaces, got {0}")]
    BadVolumeBoundary(usize),
}

/// Errors related to run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed isoline count string {input:?}: expected \"U:V:W\"")]
    MalformedIsolineCounts { input: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised while running the hidden-curve pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("output sink error: {0}")]
    Sink(#[from] std::io::Error),

    #[error("output serialization failed: {0}")]
    Serialization(String),
}

/// Errors related to tessellation.
#[derive(Debug, Error)]
pub enum TessellationError {
    #[error("invalid tessellation parameters: {0}")]
    InvalidParameters(String),

    #[error("tessellation failed: {0}")]
    Failed(String),
}

/// Convenience type alias for results using [`SightlineError`].
pub type Result<T> = std::result::Result<T, SightlineError>;
