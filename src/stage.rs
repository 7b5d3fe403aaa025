use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

const STDERR_TAIL_LINES: usize = 3;
const STDERR_TAIL_MAX_CHARS: usize = 400;

/// One external-process invocation: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInvocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
}

impl StageInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        StageInvocation {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Human-readable command line, used in logs and failure messages.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

impl fmt::Display for StageInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Why an external stage did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageFailure {
    #[error("`{command}` could not be started: {message}")]
    Spawn { command: String, message: String },

    #[error("`{command}` {}{}", describe_exit(.code), describe_stderr(.stderr_tail))]
    Exit {
        command: String,
        /// `None` when the process was terminated by a signal.
        code: Option<i32>,
        stderr_tail: String,
    },
}

impl StageFailure {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            StageFailure::Exit { code, .. } => *code,
            StageFailure::Spawn { .. } => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

fn describe_stderr(tail: &str) -> String {
    if tail.is_empty() {
        String::new()
    } else {
        format!(" (stderr: {})", tail)
    }
}

/// Exit status 0 is the only success; output content is never inspected.
pub type StageResult = std::result::Result<(), StageFailure>;

/// Executes external-process stages. Shared by every worker.
#[async_trait]
pub trait StageRunner: Send + Sync {
    async fn run_stage(&self, invocation: &StageInvocation) -> StageResult;
}

/// Runs stages as real subprocesses via `tokio::process`.
///
/// Stdout is discarded so a tool streaming its data there is never buffered.
/// Stderr is captured, and only a short tail of it is kept for the failure message.
#[derive(Debug, Default, Clone)]
pub struct ProcessStageRunner;

impl ProcessStageRunner {
    pub fn new() -> Self {
        ProcessStageRunner
    }
}

#[async_trait]
impl StageRunner for ProcessStageRunner {
    async fn run_stage(&self, invocation: &StageInvocation) -> StageResult {
        let command_line = invocation.command_line();
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        debug!(command = %command_line, "Starting stage");
        let started = Instant::now();
        let output = command.output().await.map_err(|e| StageFailure::Spawn {
            command: command_line.clone(),
            message: e.to_string(),
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(
            command = %command_line,
            status = %output.status,
            elapsed = ?started.elapsed(),
            "Stage finished"
        );

        map_exit_status(command_line, output.status, &stderr)
    }
}

fn map_exit_status(command: String, status: ExitStatus, stderr: &str) -> StageResult {
    if status.success() {
        return Ok(());
    }
    Err(StageFailure::Exit {
        command,
        code: status.code(),
        stderr_tail: stderr_tail(stderr),
    })
}

/// Last few non-empty stderr lines, joined and capped in length.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let joined = lines[start..].join(" | ");
    if joined.chars().count() > STDERR_TAIL_MAX_CHARS {
        let skip = joined.chars().count() - STDERR_TAIL_MAX_CHARS;
        format!("...{}", joined.chars().skip(skip).collect::<String>())
    } else {
        joined
    }
}
