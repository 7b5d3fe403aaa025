// src/dispatcher.rs

use crate::config::RunConfig;
use crate::data_model::{Identifier, Outcome, RecordJob};
use crate::error::{PipelineError, Result};
use crate::executor::PipelineExecutor;
use crate::reporter::{drain_outcomes, OutcomeReporter, RunSummary};
use crate::utils::prometheus_metrics::{QUEUED_RECORDS, RECORDS_SUBMITTED_TOTAL};
use crate::worker_logic::{execute_record_pipeline, record_outcome_metric};
use futures::Stream;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs the record pipeline over a set of identifiers with a fixed number of
/// workers.
///
/// Jobs are pushed onto a queue that `concurrency` worker tasks pull from; each
/// worker finishes one pipeline before taking the next job. Outcomes are sent
/// on a completion channel as they finish, so the receiver sees them in
/// completion order.
pub struct Dispatcher {
    executor: Arc<PipelineExecutor>,
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(executor: Arc<PipelineExecutor>, concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(PipelineError::ConfigValidationError(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        Ok(Dispatcher {
            executor,
            concurrency,
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Starts dispatching and returns immediately.
    ///
    /// Every identifier yields exactly one outcome on the handle. After
    /// `cancel` fires, queued identifiers are reported as cancelled instead of
    /// being started; pipelines already running finish their current step.
    pub fn run(
        &self,
        identifiers: Vec<Identifier>,
        config: Arc<RunConfig>,
        cancel: CancellationToken,
    ) -> DispatchHandle {
        let submitted = identifiers.len();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel::<Outcome>();
        // Queue depth equals the worker count: the feeder waits when every
        // worker is busy and one job is already lined up for each.
        let (job_tx, job_rx) = mpsc::channel::<RecordJob>(self.concurrency);
        let job_rx = Arc::new(Mutex::new(job_rx));

        info!(
            identifiers = submitted,
            concurrency = self.concurrency,
            "Dispatching record pipelines"
        );

        let feeder = tokio::spawn(feed_jobs(
            identifiers,
            config,
            job_tx,
            outcome_tx.clone(),
            cancel.clone(),
        ));

        let workers: Vec<JoinHandle<()>> = (0..self.concurrency)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&job_rx),
                    Arc::clone(&self.executor),
                    outcome_tx.clone(),
                    cancel.clone(),
                ))
            })
            .collect();
        // Only the feeder and the workers hold senders now, so the outcome
        // stream ends exactly when all of them are done.
        drop(outcome_tx);

        let supervisor = tokio::spawn(async move {
            let mut first_error: Option<PipelineError> = None;
            if let Err(e) = feeder.await {
                first_error.get_or_insert(PipelineError::from(e));
            }
            for worker in workers {
                if let Err(e) = worker.await {
                    first_error.get_or_insert(PipelineError::from(e));
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        });

        DispatchHandle {
            outcomes: outcome_rx,
            supervisor,
            submitted,
        }
    }

    /// Dispatches, feeds every outcome to `reporter` as it arrives, and waits
    /// for the pool to shut down.
    pub async fn run_and_report(
        &self,
        identifiers: Vec<Identifier>,
        config: Arc<RunConfig>,
        cancel: CancellationToken,
        reporter: &mut dyn OutcomeReporter,
    ) -> Result<RunSummary> {
        let mut handle = self.run(identifiers, config, cancel);
        let summary = drain_outcomes(&mut handle.outcomes, reporter).await;
        let submitted = handle.submitted;
        handle.join().await?;
        if summary.total() != submitted {
            return Err(PipelineError::Unexpected(format!(
                "{} identifiers submitted but {} outcomes received",
                submitted,
                summary.total()
            )));
        }
        Ok(summary)
    }
}

/// Live view of a dispatch: outcomes in completion order, plus the pool's join handle.
pub struct DispatchHandle {
    pub outcomes: mpsc::UnboundedReceiver<Outcome>,
    supervisor: JoinHandle<Result<()>>,
    submitted: usize,
}

impl DispatchHandle {
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Next finished outcome, or `None` once every identifier has been reported.
    pub async fn next(&mut self) -> Option<Outcome> {
        self.outcomes.recv().await
    }

    /// Waits for the feeder and all workers to exit.
    pub async fn join(self) -> Result<()> {
        self.supervisor.await?
    }

    /// Converts the handle into a stream of outcomes; the pool keeps running
    /// in the background until the stream is exhausted.
    pub fn into_stream(self) -> impl Stream<Item = Outcome> {
        futures::stream::unfold(self.outcomes, |mut rx| async move {
            rx.recv().await.map(|outcome| (outcome, rx))
        })
    }
}

async fn feed_jobs(
    identifiers: Vec<Identifier>,
    config: Arc<RunConfig>,
    job_tx: mpsc::Sender<RecordJob>,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    cancel: CancellationToken,
) {
    for identifier in identifiers {
        RECORDS_SUBMITTED_TOTAL.inc();
        if cancel.is_cancelled() {
            report_not_started(identifier, &outcome_tx);
            continue;
        }

        let job = RecordJob::new(identifier.clone(), Arc::clone(&config));
        QUEUED_RECORDS.inc();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                QUEUED_RECORDS.dec();
                report_not_started(identifier, &outcome_tx);
            }
            sent = job_tx.send(job) => {
                if let Err(mpsc::error::SendError(job)) = sent {
                    // All workers are gone; nothing will pick this up.
                    QUEUED_RECORDS.dec();
                    warn!(identifier = %job.identifier, "Job queue closed before submission");
                    report_not_started(job.identifier, &outcome_tx);
                }
            }
        }
    }
    debug!("All identifiers submitted");
}

async fn worker_loop(
    worker_id: usize,
    job_rx: Arc<Mutex<mpsc::Receiver<RecordJob>>>,
    executor: Arc<PipelineExecutor>,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    cancel: CancellationToken,
) {
    debug!(worker_id, "Worker started");
    loop {
        // The lock is held only while waiting for the next job.
        let next_job = { job_rx.lock().await.recv().await };
        let Some(job) = next_job else { break };
        QUEUED_RECORDS.dec();

        let outcome = if cancel.is_cancelled() {
            let outcome = Outcome::not_started(job.identifier);
            record_outcome_metric(&outcome);
            outcome
        } else {
            execute_record_pipeline(job, Arc::clone(&executor), cancel.clone()).await
        };

        if outcome_tx.send(outcome).is_err() {
            debug!(worker_id, "Outcome receiver dropped; result discarded");
        }
    }
    debug!(worker_id, "Worker finished");
}

fn report_not_started(identifier: Identifier, outcome_tx: &mpsc::UnboundedSender<Outcome>) {
    let outcome = Outcome::not_started(identifier);
    record_outcome_metric(&outcome);
    let _ = outcome_tx.send(outcome);
}
