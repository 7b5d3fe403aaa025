mod common;

use async_trait::async_trait;
use common::{test_config, FetchBehaviour, ScriptedRunner, CONVERT_PROGRAM, FETCH_PROGRAM};
use std::ffi::OsString;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tokio_util::sync::CancellationToken;
use SraHarvest::config::{LocatePolicy, RunConfig};
use SraHarvest::data_model::{OutcomeStatus, RecordJob};
use SraHarvest::error::{PipelineError, Result};
use SraHarvest::executor::{PipelineExecutor, ProcessingStep};
use SraHarvest::worker_logic::{build_record_pipeline, execute_record_pipeline};

struct Dirs {
    fetch: TempDir,
    output: TempDir,
}

fn dirs() -> Dirs {
    Dirs {
        fetch: tempdir().unwrap(),
        output: tempdir().unwrap(),
    }
}

fn config(dirs: &Dirs, max_retries: u32) -> Arc<RunConfig> {
    Arc::new(test_config(dirs.fetch.path(), dirs.output.path(), max_retries))
}

async fn run_one(
    identifier: &str,
    config: Arc<RunConfig>,
    runner: Arc<ScriptedRunner>,
) -> SraHarvest::data_model::Outcome {
    let executor = Arc::new(build_record_pipeline(runner));
    execute_record_pipeline(
        RecordJob::new(identifier, config),
        executor,
        CancellationToken::new(),
    )
    .await
}

#[tokio::test]
async fn test_happy_path_runs_all_three_stages() {
    let dirs = dirs();
    let runner = Arc::new(ScriptedRunner::new());
    let outcome = run_one("SRR900001", config(&dirs, 3), Arc::clone(&runner)).await;

    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.fetch_attempts, 1);
    assert_eq!(outcome.message, "Successfully processed SRR900001");

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].program, FETCH_PROGRAM);
    assert_eq!(calls[0].args, vec![OsString::from("SRR900001")]);
    assert_eq!(calls[0].working_dir.as_deref(), Some(dirs.fetch.path()));

    assert_eq!(calls[1].program, CONVERT_PROGRAM);
    let expected: Vec<OsString> = vec![
        "--split-files".into(),
        dirs.fetch.path().join("SRR900001.sra").into_os_string(),
        "-O".into(),
        dirs.output.path().as_os_str().to_owned(),
    ];
    assert_eq!(calls[1].args, expected);
}

#[tokio::test]
async fn test_fetch_recovers_after_k_failures() {
    let dirs = dirs();
    let runner = Arc::new(ScriptedRunner::new().with_fetch("SRR900002", FetchBehaviour::FailTimes(2)));
    let outcome = run_one("SRR900002", config(&dirs, 3), Arc::clone(&runner)).await;

    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(runner.fetch_attempts("SRR900002"), 3);
    assert_eq!(outcome.fetch_attempts, 3);
    assert_eq!(runner.convert_calls("SRR900002"), 1);
}

#[tokio::test]
async fn test_fetch_exhaustion_is_download_failed_without_convert() {
    let dirs = dirs();
    let runner = Arc::new(ScriptedRunner::new().with_fetch("SRR900003", FetchBehaviour::AlwaysFail));
    let outcome = run_one("SRR900003", config(&dirs, 3), Arc::clone(&runner)).await;

    assert_eq!(outcome.status, OutcomeStatus::DownloadFailed);
    assert_eq!(runner.fetch_attempts("SRR900003"), 3);
    assert_eq!(outcome.fetch_attempts, 3);
    assert!(outcome.message.contains("SRR900003"));
    assert!(outcome.message.contains("after 3 attempts"));
    assert_eq!(runner.convert_calls("SRR900003"), 0);
    assert!(runner.calls().iter().all(|call| call.program == FETCH_PROGRAM));
}

#[tokio::test]
async fn test_max_retries_is_respected() {
    let dirs = dirs();
    let runner = Arc::new(ScriptedRunner::new().with_fetch("SRR900004", FetchBehaviour::AlwaysFail));
    let outcome = run_one("SRR900004", config(&dirs, 5), Arc::clone(&runner)).await;

    assert_eq!(outcome.status, OutcomeStatus::DownloadFailed);
    assert_eq!(runner.fetch_attempts("SRR900004"), 5);
}

#[tokio::test]
async fn test_missing_artifact_is_locate_failed_without_convert() {
    let dirs = dirs();
    let runner = Arc::new(
        ScriptedRunner::new().with_fetch("SRR900005", FetchBehaviour::SucceedWithoutArtifact),
    );
    let outcome = run_one("SRR900005", config(&dirs, 3), Arc::clone(&runner)).await;

    assert_eq!(outcome.status, OutcomeStatus::LocateFailed);
    assert!(outcome.message.contains("SRR900005"));
    assert!(outcome.message.contains("no matches"));
    assert_eq!(outcome.fetch_attempts, 1);
    assert_eq!(runner.convert_calls("SRR900005"), 0);
}

#[tokio::test]
async fn test_ambiguous_artifact_fails_under_strict_policy() {
    let dirs = dirs();
    std::fs::write(dirs.fetch.path().join("SRR900006_extra.sra"), b"x").unwrap();
    let mut strict = test_config(dirs.fetch.path(), dirs.output.path(), 3);
    strict.locate_policy = LocatePolicy::FailOnAmbiguous;

    let runner = Arc::new(ScriptedRunner::new());
    let outcome = run_one("SRR900006", Arc::new(strict), Arc::clone(&runner)).await;

    assert_eq!(outcome.status, OutcomeStatus::LocateFailed);
    assert!(outcome.message.contains("multiple matches"));
    assert_eq!(runner.convert_calls("SRR900006"), 0);
}

#[tokio::test]
async fn test_convert_failure_is_not_retried() {
    let dirs = dirs();
    let runner = Arc::new(ScriptedRunner::new().with_failing_convert("SRR900007"));
    let outcome = run_one("SRR900007", config(&dirs, 3), Arc::clone(&runner)).await;

    assert_eq!(outcome.status, OutcomeStatus::ConvertFailed);
    assert_eq!(runner.convert_calls("SRR900007"), 1);
    assert!(outcome.message.contains("SRR900007.sra"));
    assert!(outcome.message.contains("exited with status 1"));
}

// --- Executor mechanics with hand-written steps ---

struct CountingStep {
    name: &'static str,
}

#[async_trait]
impl ProcessingStep for CountingStep {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn process(&self, job: &mut RecordJob) -> Result<()> {
        job.fetch_attempts += 1;
        Ok(())
    }
}

struct FailingStep;

#[async_trait]
impl ProcessingStep for FailingStep {
    fn name(&self) -> &'static str {
        "FailingStep"
    }

    async fn process(&self, job: &mut RecordJob) -> Result<()> {
        Err(PipelineError::LocateFailed {
            identifier: job.identifier.clone(),
            reason: "test failure".to_string(),
        })
    }
}

#[tokio::test]
async fn test_executor_short_circuits_and_wraps_step_error() {
    let dirs = dirs();
    let steps: Vec<Box<dyn ProcessingStep>> = vec![
        Box::new(CountingStep { name: "first" }),
        Box::new(FailingStep),
        Box::new(CountingStep { name: "never" }),
    ];
    let executor = PipelineExecutor::new(steps);
    let mut job = RecordJob::new("X1", config(&dirs, 3));

    let err = executor
        .run_single_async(&mut job, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(job.fetch_attempts, 1);
    match err {
        PipelineError::StepError { step_name, source } => {
            assert_eq!(step_name, "FailingStep");
            assert!(matches!(*source, PipelineError::LocateFailed { .. }));
        }
        other => panic!("Expected StepError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_executor_stops_between_steps_when_cancelled() {
    let dirs = dirs();
    let steps: Vec<Box<dyn ProcessingStep>> = vec![
        Box::new(CountingStep { name: "first" }),
        Box::new(CountingStep { name: "second" }),
    ];
    let executor = Arc::new(PipelineExecutor::new(steps));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome =
        execute_record_pipeline(RecordJob::new("X2", config(&dirs, 3)), executor, cancel).await;
    assert_eq!(outcome.status, OutcomeStatus::Cancelled);
    assert!(outcome.message.contains("first"));
}

#[tokio::test]
async fn test_empty_pipeline_succeeds() {
    let dirs = dirs();
    let executor = PipelineExecutor::new(vec![]);
    let mut job = RecordJob::new("X3", config(&dirs, 3));
    assert!(executor
        .run_single_async(&mut job, &CancellationToken::new())
        .await
        .is_ok());
    assert!(executor.step_names().is_empty());
}
