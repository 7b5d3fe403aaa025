use crate::config::RunConfig;
use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Opaque token naming one remote record (e.g. `SRR1234567`).
pub type Identifier = String;

/// One unit of work: an identifier plus the shared, read-only run configuration.
///
/// Steps record their progress on the job as it moves through the pipeline so
/// the final outcome can report it even when a later step fails.
#[derive(Debug, Clone)]
pub struct RecordJob {
    pub identifier: Identifier,
    pub config: Arc<RunConfig>,
    pub fetch_attempts: u32,
    pub located: Option<LocatedFile>,
}

impl RecordJob {
    pub fn new(identifier: impl Into<Identifier>, config: Arc<RunConfig>) -> Self {
        RecordJob {
            identifier: identifier.into(),
            config,
            fetch_attempts: 0,
            located: None,
        }
    }
}

/// The on-disk artifact matched to an identifier after a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedFile {
    pub path: PathBuf,
    pub file_name: String,
    /// How many directory entries shared the identifier prefix.
    pub candidates: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Success,
    DownloadFailed,
    LocateFailed,
    ConvertFailed,
    Cancelled,
}

impl OutcomeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "Success",
            OutcomeStatus::DownloadFailed => "DownloadFailed",
            OutcomeStatus::LocateFailed => "LocateFailed",
            OutcomeStatus::ConvertFailed => "ConvertFailed",
            OutcomeStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final, immutable record for one processed identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub identifier: Identifier,
    pub status: OutcomeStatus,
    pub message: String,
    pub fetch_attempts: u32,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

impl Outcome {
    pub fn new(
        identifier: impl Into<Identifier>,
        status: OutcomeStatus,
        message: impl Into<String>,
    ) -> Self {
        Outcome {
            identifier: identifier.into(),
            status,
            message: message.into(),
            fetch_attempts: 0,
            elapsed_ms: 0,
            finished_at: Utc::now(),
        }
    }

    /// Outcome for an identifier that was never started because the run was cancelled.
    pub fn not_started(identifier: impl Into<Identifier>) -> Self {
        let identifier = identifier.into();
        let message = format!("Skipped {}: run cancelled before it was started", identifier);
        Outcome::new(identifier, OutcomeStatus::Cancelled, message)
    }

    /// Converts the result of running the pipeline on `job` into its terminal outcome.
    pub fn from_pipeline_result(
        job: &RecordJob,
        result: crate::error::Result<()>,
        elapsed: Duration,
    ) -> Self {
        let (status, message, fetch_attempts) = match result {
            Ok(()) => (
                OutcomeStatus::Success,
                format!("Successfully processed {}", job.identifier),
                job.fetch_attempts,
            ),
            Err(e) => {
                let root = e.into_root();
                let status = match &root {
                    PipelineError::DownloadFailed { .. } => OutcomeStatus::DownloadFailed,
                    PipelineError::LocateFailed { .. } => OutcomeStatus::LocateFailed,
                    PipelineError::ConvertFailed { .. } => OutcomeStatus::ConvertFailed,
                    PipelineError::Cancelled { .. } => OutcomeStatus::Cancelled,
                    // Anything else escaping a step is attributed to the stage it came from.
                    _ if job.located.is_some() => OutcomeStatus::ConvertFailed,
                    _ if job.fetch_attempts > 0 => OutcomeStatus::LocateFailed,
                    _ => OutcomeStatus::DownloadFailed,
                };
                let attempts = match &root {
                    PipelineError::DownloadFailed { attempts, .. } => *attempts,
                    _ => job.fetch_attempts,
                };
                (status, format!("Error: {}", root), attempts)
            }
        };

        Outcome {
            identifier: job.identifier.clone(),
            status,
            message,
            fetch_attempts,
            elapsed_ms: elapsed.as_millis() as u64,
            finished_at: Utc::now(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.identifier, self.status, self.message)
    }
}
