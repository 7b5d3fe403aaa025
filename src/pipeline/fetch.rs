use crate::config::RunConfig;
use crate::data_model::RecordJob;
use crate::error::{PipelineError, Result};
use crate::executor::ProcessingStep;
use crate::retry::retry_with_observer;
use crate::stage::{StageInvocation, StageRunner};
use crate::utils::prometheus_metrics::{FETCH_ATTEMPTS_TOTAL, FETCH_FAILED_ATTEMPTS_TOTAL};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Downloads one record with the fetch tool, retrying per the run's policy.
pub struct FetchStep {
    runner: Arc<dyn StageRunner>,
}

impl FetchStep {
    pub fn new(runner: Arc<dyn StageRunner>) -> Self {
        FetchStep { runner }
    }
}

/// `<program> <args...> <identifier>`, run inside the fetch directory.
pub fn fetch_invocation(config: &RunConfig, identifier: &str) -> StageInvocation {
    StageInvocation::new(config.fetch_tool.program.clone())
        .args(config.fetch_tool.args.iter())
        .arg(identifier)
        .current_dir(&config.fetch_dir)
}

#[async_trait]
impl ProcessingStep for FetchStep {
    fn name(&self) -> &'static str {
        "fetch"
    }

    async fn process(&self, job: &mut RecordJob) -> Result<()> {
        let invocation = fetch_invocation(&job.config, &job.identifier);
        let invocation = &invocation;
        let policy = job.config.fetch_retry_policy();
        let identifier = job.identifier.as_str();
        let runner = &self.runner;
        let mut attempts_made = 0u32;

        let result = retry_with_observer(
            &policy,
            |attempt| {
                attempts_made = attempt;
                FETCH_ATTEMPTS_TOTAL.inc();
                debug!(%identifier, attempt, "Fetching");
                runner.run_stage(invocation)
            },
            |attempt, error| {
                FETCH_FAILED_ATTEMPTS_TOTAL.inc();
                debug!(%identifier, attempt, exit_code = ?error.exit_code(), error = %error, "Attempt {} failed to download {}", attempt, identifier);
            },
        )
        .await;

        match result {
            Ok(()) => {
                job.fetch_attempts = attempts_made;
                debug!(identifier = %job.identifier, attempts = attempts_made, "Fetch succeeded");
                Ok(())
            }
            Err(exhausted) => {
                warn!(identifier = %job.identifier, attempts = exhausted.attempts, "Giving up on download");
                job.fetch_attempts = exhausted.attempts;
                Err(PipelineError::DownloadFailed {
                    identifier: job.identifier.clone(),
                    attempts: exhausted.attempts,
                    reason: exhausted.last_error.to_string(),
                })
            }
        }
    }
}
