// src/worker_logic.rs

use crate::data_model::{Outcome, OutcomeStatus, RecordJob};
use crate::executor::{PipelineExecutor, ProcessingStep};
use crate::pipeline::{ConvertStep, FetchStep, LocateStep};
use crate::stage::StageRunner;
use crate::utils::prometheus_metrics::*;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

/// Builds the fetch → locate → convert pipeline around a stage runner.
pub fn build_record_pipeline(runner: Arc<dyn StageRunner>) -> PipelineExecutor {
    let steps: Vec<Box<dyn ProcessingStep>> = vec![
        Box::new(FetchStep::new(Arc::clone(&runner))),
        Box::new(LocateStep),
        Box::new(ConvertStep::new(runner)),
    ];
    let executor = PipelineExecutor::new(steps);
    info!(steps = ?executor.step_names(), "Record pipeline built");
    executor
}

/// Runs the pipeline for one job and turns whatever happened into its outcome.
///
/// Never fails: every error is contained here so it cannot reach the pool.
pub async fn execute_record_pipeline(
    mut job: RecordJob,
    executor: Arc<PipelineExecutor>,
    cancel: CancellationToken,
) -> Outcome {
    let span = info_span!("record", identifier = %job.identifier);
    async move {
        ACTIVE_PIPELINES.inc();
        let processing_timer = RECORD_PIPELINE_DURATION_SECONDS.start_timer();
        let started = Instant::now();
        debug!("Processing record");

        let result = executor.run_single_async(&mut job, &cancel).await;
        let outcome = Outcome::from_pipeline_result(&job, result, started.elapsed());
        record_outcome_metric(&outcome);

        processing_timer.observe_duration();
        ACTIVE_PIPELINES.dec();
        outcome
    }
    .instrument(span)
    .await
}

pub fn record_outcome_metric(outcome: &Outcome) {
    match outcome.status {
        OutcomeStatus::Success => RECORDS_SUCCEEDED_TOTAL.inc(),
        OutcomeStatus::DownloadFailed => RECORDS_DOWNLOAD_FAILED_TOTAL.inc(),
        OutcomeStatus::LocateFailed => RECORDS_LOCATE_FAILED_TOTAL.inc(),
        OutcomeStatus::ConvertFailed => RECORDS_CONVERT_FAILED_TOTAL.inc(),
        OutcomeStatus::Cancelled => RECORDS_CANCELLED_TOTAL.inc(),
    }
}
