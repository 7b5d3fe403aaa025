use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The Error type for harvest operations.
///
/// Run-level variants (configuration, I/O, sources) abort a run before dispatch.
/// Record-level variants (`DownloadFailed`, `LocateFailed`, `ConvertFailed`,
/// `Cancelled`) are raised by pipeline steps and turned into an
/// [`Outcome`](crate::data_model::Outcome) at the pipeline boundary.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration validation error: {0}")]
    ConfigValidationError(String),

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Identifier source error: {source}")]
    SourceError {
        #[from]
        source: csv::Error,
    },

    #[error("Serialization/Deserialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Failed to download {identifier} after {attempts} attempts: {reason}")]
    DownloadFailed {
        identifier: String,
        attempts: u32,
        reason: String,
    },

    #[error("Failed to locate the file for {identifier}: {reason}")]
    LocateFailed { identifier: String, reason: String },

    #[error("Failed to convert {file} for {identifier}: {reason}")]
    ConvertFailed {
        identifier: String,
        file: String,
        reason: String,
    },

    #[error("Processing of {identifier} cancelled before step '{next_step}'")]
    Cancelled {
        identifier: String,
        next_step: String,
    },

    #[error("Error in processing step '{step_name}': {source}")]
    StepError {
        step_name: String,
        source: Box<PipelineError>,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PipelineError {
    /// Strips any `StepError` wrapping and returns the underlying error.
    pub fn into_root(self) -> PipelineError {
        match self {
            PipelineError::StepError { source, .. } => source.into_root(),
            other => other,
        }
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Unexpected(format!("worker task failed: {}", err))
    }
}
