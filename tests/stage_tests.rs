// Exercises the real subprocess runner against standard Unix utilities.
#![cfg(unix)]

use tempfile::tempdir;
use SraHarvest::stage::{ProcessStageRunner, StageFailure, StageInvocation, StageRunner};

#[tokio::test]
async fn test_exit_zero_is_success() {
    let runner = ProcessStageRunner::new();
    let result = runner.run_stage(&StageInvocation::new("true")).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_nonzero_exit_carries_code_and_stderr() {
    let runner = ProcessStageRunner::new();
    let invocation = StageInvocation::new("sh").args(["-c", "echo 'network timeout' >&2; exit 3"]);
    match runner.run_stage(&invocation).await {
        Err(StageFailure::Exit {
            code, stderr_tail, ..
        }) => {
            assert_eq!(code, Some(3));
            assert_eq!(stderr_tail, "network timeout");
        }
        other => panic!("Expected exit failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_output_content_does_not_decide_success() {
    let runner = ProcessStageRunner::new();
    let invocation = StageInvocation::new("sh").args(["-c", "echo error: fake >&2; exit 0"]);
    assert!(runner.run_stage(&invocation).await.is_ok());
}

#[tokio::test]
async fn test_missing_program_is_spawn_failure() {
    let runner = ProcessStageRunner::new();
    let invocation = StageInvocation::new("definitely-not-a-real-tool-4821").arg("SRR1");
    match runner.run_stage(&invocation).await {
        Err(StageFailure::Spawn { command, .. }) => {
            assert_eq!(command, "definitely-not-a-real-tool-4821 SRR1")
        }
        other => panic!("Expected spawn failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_working_directory_is_applied() {
    let dir = tempdir().unwrap();
    let runner = ProcessStageRunner::new();
    let invocation = StageInvocation::new("sh")
        .args(["-c", "touch SRR42.sra"])
        .current_dir(dir.path());
    runner.run_stage(&invocation).await.unwrap();
    assert!(dir.path().join("SRR42.sra").exists());
}

#[tokio::test]
async fn test_stdout_is_discarded_and_stderr_captured() {
    let runner = ProcessStageRunner::new();
    // A streaming tool writes into /dev/null rather than into a buffered pipe.
    let stdout_check = StageInvocation::new("sh").args(["-c", "test ! -p /dev/stdout"]);
    assert!(runner.run_stage(&stdout_check).await.is_ok());

    let stderr_check = StageInvocation::new("sh").args(["-c", "test -p /dev/stderr"]);
    assert!(runner.run_stage(&stderr_check).await.is_ok());
}
