// Shared helpers for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use SraHarvest::config::{ConvertToolConfig, FetchToolConfig, LocatePolicy, RunConfig};
use SraHarvest::stage::{StageFailure, StageInvocation, StageResult, StageRunner};

pub const FETCH_PROGRAM: &str = "prefetch";
pub const CONVERT_PROGRAM: &str = "fastq-dump";

/// Run config pointing at test directories, with a near-zero retry delay.
pub fn test_config(fetch_dir: &Path, output_dir: &Path, max_retries: u32) -> RunConfig {
    RunConfig {
        fetch_dir: fetch_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        max_retries,
        retry_delay: Duration::from_millis(1),
        concurrency: 4,
        locate_policy: LocatePolicy::FirstSorted,
        fetch_tool: FetchToolConfig::default(),
        convert_tool: ConvertToolConfig::default(),
    }
}

/// True when one of the convert arguments is a file named after `identifier`.
fn converts_identifier(invocation: &StageInvocation, identifier: &str) -> bool {
    invocation.args.iter().any(|arg| {
        Path::new(arg)
            .file_name()
            .map(|name| name.to_string_lossy().starts_with(identifier))
            .unwrap_or(false)
    })
}

/// How the scripted fetch tool behaves for one identifier.
#[derive(Debug, Clone, Copy)]
pub enum FetchBehaviour {
    /// Fail this many times, then succeed.
    FailTimes(u32),
    AlwaysFail,
    /// Exit 0 without writing anything.
    SucceedWithoutArtifact,
}

/// Stand-in for the external tools.
///
/// A successful fetch writes `<identifier>.sra` into the invocation's working
/// directory, like the real download tool would. Every invocation is recorded.
#[derive(Default)]
pub struct ScriptedRunner {
    fetch: HashMap<String, FetchBehaviour>,
    failing_converts: HashSet<String>,
    fetch_delay: Duration,
    calls: Mutex<Vec<StageInvocation>>,
    fetch_attempts: Mutex<HashMap<String, u32>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        ScriptedRunner::default()
    }

    pub fn with_fetch(mut self, identifier: &str, behaviour: FetchBehaviour) -> Self {
        self.fetch.insert(identifier.to_string(), behaviour);
        self
    }

    pub fn with_failing_convert(mut self, identifier: &str) -> Self {
        self.failing_converts.insert(identifier.to_string());
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn fetch_attempts(&self, identifier: &str) -> u32 {
        self.fetch_attempts
            .lock()
            .unwrap()
            .get(identifier)
            .copied()
            .unwrap_or(0)
    }

    pub fn convert_calls(&self, identifier: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.program == CONVERT_PROGRAM)
            .filter(|call| converts_identifier(call, identifier))
            .count()
    }

    pub fn calls(&self) -> Vec<StageInvocation> {
        self.calls.lock().unwrap().clone()
    }

    fn exit_failure(invocation: &StageInvocation) -> StageFailure {
        StageFailure::Exit {
            command: invocation.command_line(),
            code: Some(1),
            stderr_tail: "scripted failure".to_string(),
        }
    }
}

#[async_trait]
impl StageRunner for ScriptedRunner {
    async fn run_stage(&self, invocation: &StageInvocation) -> StageResult {
        self.calls.lock().unwrap().push(invocation.clone());

        if invocation.program == FETCH_PROGRAM {
            let identifier = invocation
                .args
                .last()
                .map(|arg| arg.to_string_lossy().to_string())
                .unwrap_or_default();
            let attempt = {
                let mut attempts = self.fetch_attempts.lock().unwrap();
                let counter = attempts.entry(identifier.clone()).or_insert(0);
                *counter += 1;
                *counter
            };
            if !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }

            let behaviour = self.fetch.get(&identifier).copied();
            match behaviour {
                Some(FetchBehaviour::AlwaysFail) => return Err(Self::exit_failure(invocation)),
                Some(FetchBehaviour::FailTimes(k)) if attempt <= k => {
                    return Err(Self::exit_failure(invocation))
                }
                Some(FetchBehaviour::SucceedWithoutArtifact) => return Ok(()),
                _ => {}
            }
            let dir = invocation
                .working_dir
                .clone()
                .expect("fetch runs inside the fetch directory");
            std::fs::write(dir.join(format!("{}.sra", identifier)), b"sra").unwrap();
            return Ok(());
        }

        if invocation.program == CONVERT_PROGRAM {
            if self
                .failing_converts
                .iter()
                .any(|id| converts_identifier(invocation, id))
            {
                return Err(Self::exit_failure(invocation));
            }
            return Ok(());
        }

        Err(StageFailure::Spawn {
            command: invocation.command_line(),
            message: "unknown program".to_string(),
        })
    }
}
