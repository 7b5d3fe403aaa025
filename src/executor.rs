use crate::data_model::RecordJob;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One stage of the per-record pipeline (fetch, locate, convert).
///
/// Steps update the job in place so that progress made before a failure
/// (attempt counts, the located file) is still available to the outcome.
#[async_trait]
pub trait ProcessingStep: Send + Sync {
    fn name(&self) -> &'static str; // For logging/error reporting

    async fn process(&self, job: &mut RecordJob) -> Result<()>;
}

pub struct PipelineExecutor {
    pub(crate) steps: Vec<Box<dyn ProcessingStep>>, // Holds the ordered steps
}

impl PipelineExecutor {
    pub fn new(steps: Vec<Box<dyn ProcessingStep>>) -> Self {
        if steps.is_empty() {
            warn!("Pipeline created with no steps.");
        }
        PipelineExecutor { steps }
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Runs every step in order, stopping at the first failure.
    ///
    /// The cancellation token is only consulted between steps: a step that has
    /// started always runs to completion.
    pub async fn run_single_async(
        &self,
        job: &mut RecordJob,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for step in &self.steps {
            if cancel.is_cancelled() {
                debug!(identifier = %job.identifier, next_step = step.name(), "Cancelled between steps");
                return Err(PipelineError::Cancelled {
                    identifier: job.identifier.clone(),
                    next_step: step.name().to_string(),
                });
            }

            debug!("Running step: {}", step.name());
            step.process(job)
                .await
                .map_err(|e| PipelineError::StepError {
                    step_name: step.name().to_string(),
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }
}
