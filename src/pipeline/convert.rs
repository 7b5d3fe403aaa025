use crate::config::RunConfig;
use crate::data_model::{LocatedFile, RecordJob};
use crate::error::{PipelineError, Result};
use crate::executor::ProcessingStep;
use crate::stage::{StageInvocation, StageRunner};
use crate::utils::prometheus_metrics::CONVERT_INVOCATIONS_TOTAL;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Converts the located artifact into the output directory. Single attempt.
pub struct ConvertStep {
    runner: Arc<dyn StageRunner>,
}

impl ConvertStep {
    pub fn new(runner: Arc<dyn StageRunner>) -> Self {
        ConvertStep { runner }
    }
}

/// `<program> <split_args...> <located path> <output_flag> <output dir>`
pub fn convert_invocation(config: &RunConfig, located: &LocatedFile) -> StageInvocation {
    StageInvocation::new(config.convert_tool.program.clone())
        .args(config.convert_tool.split_args.iter())
        .arg(located.path.clone())
        .arg(config.convert_tool.output_flag.clone())
        .arg(config.output_dir.clone())
}

#[async_trait]
impl ProcessingStep for ConvertStep {
    fn name(&self) -> &'static str {
        "convert"
    }

    async fn process(&self, job: &mut RecordJob) -> Result<()> {
        let Some(located) = job.located.as_ref() else {
            return Err(PipelineError::Unexpected(format!(
                "convert reached for {} without a located file",
                job.identifier
            )));
        };

        let invocation = convert_invocation(&job.config, located);
        CONVERT_INVOCATIONS_TOTAL.inc();
        debug!(identifier = %job.identifier, command = %invocation, "Converting");

        self.runner
            .run_stage(&invocation)
            .await
            .map_err(|failure| PipelineError::ConvertFailed {
                identifier: job.identifier.clone(),
                file: located.file_name.clone(),
                reason: failure.to_string(),
            })
    }
}
