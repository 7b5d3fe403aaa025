// src/reporter.rs

use crate::data_model::{Identifier, Outcome, OutcomeStatus};
use crate::error::Result;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Receives each outcome once, in the order pipelines finish.
///
/// Reporters only render; they have no say over retries or control flow.
pub trait OutcomeReporter: Send {
    fn report(&mut self, outcome: &Outcome);

    /// Called once after the last outcome.
    fn finish(&mut self, _summary: &RunSummary) {}
}

/// One log line per outcome: `info` on success, `warn` otherwise.
#[derive(Debug, Default)]
pub struct LogReporter;

impl OutcomeReporter for LogReporter {
    fn report(&mut self, outcome: &Outcome) {
        if outcome.status.is_success() {
            info!(
                identifier = %outcome.identifier,
                status = %outcome.status,
                attempts = outcome.fetch_attempts,
                elapsed_ms = outcome.elapsed_ms,
                "{}",
                outcome
            );
        } else {
            warn!(
                identifier = %outcome.identifier,
                status = %outcome.status,
                attempts = outcome.fetch_attempts,
                elapsed_ms = outcome.elapsed_ms,
                "{}",
                outcome
            );
        }
    }

    fn finish(&mut self, summary: &RunSummary) {
        info!(
            total = summary.total(),
            succeeded = summary.succeeded,
            download_failed = summary.download_failed,
            locate_failed = summary.locate_failed,
            convert_failed = summary.convert_failed,
            cancelled = summary.cancelled,
            "Run complete"
        );
    }
}

pub fn create_progress_bar(total_items: u64, message: &str, template: &str) -> ProgressBar {
    let pb = ProgressBar::new(total_items);
    pb.set_message(message.to_string());
    pb.set_style(
        ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar()) // Fallback style
            .progress_chars("=> "),
    );
    pb
}

/// Progress bar over the whole run; each outcome line is printed above it.
pub struct ProgressReporter {
    pb: ProgressBar,
    started: Instant,
}

impl ProgressReporter {
    pub fn new(total: u64) -> Self {
        let pb = create_progress_bar(
            total,
            "Downloading and converting",
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        );
        ProgressReporter {
            pb,
            started: Instant::now(),
        }
    }
}

impl OutcomeReporter for ProgressReporter {
    fn report(&mut self, outcome: &Outcome) {
        self.pb.println(outcome.to_string());
        self.pb.inc(1);
    }

    fn finish(&mut self, summary: &RunSummary) {
        self.pb.finish_with_message(format!(
            "Finished {} records in {}. Success: {}, Failed: {}",
            summary.total(),
            HumanDuration(self.started.elapsed()),
            summary.succeeded,
            summary.failed_identifiers.len()
        ));
    }
}

/// Appends every outcome to a file as one JSON object per line.
pub struct JsonLinesReporter {
    writer: BufWriter<File>,
}

impl JsonLinesReporter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(JsonLinesReporter {
            writer: BufWriter::new(file),
        })
    }

    fn write_outcome(&mut self, outcome: &Outcome) -> Result<()> {
        serde_json::to_writer(&mut self.writer, outcome)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl OutcomeReporter for JsonLinesReporter {
    fn report(&mut self, outcome: &Outcome) {
        if let Err(e) = self.write_outcome(outcome) {
            error!(identifier = %outcome.identifier, error = %e, "Failed to write outcome line");
        }
    }

    fn finish(&mut self, _summary: &RunSummary) {
        if let Err(e) = self.writer.flush() {
            error!(error = %e, "Failed to flush outcome report");
        }
    }
}

/// Forwards each outcome to several reporters in turn.
#[derive(Default)]
pub struct FanoutReporter {
    reporters: Vec<Box<dyn OutcomeReporter>>,
}

impl FanoutReporter {
    pub fn new() -> Self {
        FanoutReporter::default()
    }

    pub fn with(mut self, reporter: Box<dyn OutcomeReporter>) -> Self {
        self.reporters.push(reporter);
        self
    }
}

impl OutcomeReporter for FanoutReporter {
    fn report(&mut self, outcome: &Outcome) {
        for reporter in &mut self.reporters {
            reporter.report(outcome);
        }
    }

    fn finish(&mut self, summary: &RunSummary) {
        for reporter in &mut self.reporters {
            reporter.finish(summary);
        }
    }
}

/// Per-status tally of a run, plus the identifiers worth re-running.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub download_failed: usize,
    pub locate_failed: usize,
    pub convert_failed: usize,
    pub cancelled: usize,
    /// Every identifier whose outcome was not `Success`, in arrival order.
    pub failed_identifiers: Vec<Identifier>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome.status {
            OutcomeStatus::Success => self.succeeded += 1,
            OutcomeStatus::DownloadFailed => self.download_failed += 1,
            OutcomeStatus::LocateFailed => self.locate_failed += 1,
            OutcomeStatus::ConvertFailed => self.convert_failed += 1,
            OutcomeStatus::Cancelled => self.cancelled += 1,
        }
        if !outcome.status.is_success() {
            self.failed_identifiers.push(outcome.identifier.clone());
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded
            + self.download_failed
            + self.locate_failed
            + self.convert_failed
            + self.cancelled
    }

    pub fn all_succeeded(&self) -> bool {
        self.total() == self.succeeded
    }

    /// Writes the failed identifiers, one per line, so they can be fed back
    /// in with `--identifiers-file`.
    pub fn write_failed<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::sources::write_identifier_list(path, &self.failed_identifiers)
    }
}

/// Drains the completion channel into `reporter` until every sender is gone.
pub async fn drain_outcomes(
    outcomes: &mut mpsc::UnboundedReceiver<Outcome>,
    reporter: &mut dyn OutcomeReporter,
) -> RunSummary {
    let mut summary = RunSummary::default();
    while let Some(outcome) = outcomes.recv().await {
        summary.record(&outcome);
        reporter.report(&outcome);
    }
    reporter.finish(&summary);
    summary
}
