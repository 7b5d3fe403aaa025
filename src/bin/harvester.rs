// src/bin/harvester.rs

//! # Harvester Binary
//!
//! Downloads and converts a random sample of sequence-archive accessions.
//!
//! 1.  **Selecting identifiers**: accessions come from a CSV column (`--input-file`,
//!     `--id-column`) or a plain list (`--identifiers-file`). At most
//!     `--sample-size` of them are picked at random and the selection is written to
//!     `--selected-output`.
//!
//! 2.  **Processing**: every selected accession goes through fetch (retried),
//!     locate and convert on a bounded worker pool. One accession failing never
//!     affects the others.
//!
//! 3.  **Reporting**: outcomes are printed as they complete, optionally appended to
//!     a JSON-lines file, and the accessions that did not succeed can be written
//!     to `--failed-output` for a targeted rerun.
//!
//! Ctrl-C stops new accessions from starting; running ones finish their current
//! stage and everything left is reported as cancelled.

use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use SraHarvest::config::harvester::Args;
use SraHarvest::config::RunConfig;
use SraHarvest::data_model::Identifier;
use SraHarvest::dispatcher::Dispatcher;
use SraHarvest::error::{PipelineError, Result};
use SraHarvest::reporter::{FanoutReporter, JsonLinesReporter, LogReporter, ProgressReporter};
use SraHarvest::sources::{
    load_identifier_list, load_identifiers, sample_identifiers, write_identifier_list,
};
use SraHarvest::stage::ProcessStageRunner;
use SraHarvest::utils::setup_prometheus_metrics;
use SraHarvest::worker_logic::build_record_pipeline;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        fmt::Subscriber::builder().with_env_filter(filter).init();
    }
}

fn select_identifiers(args: &Args) -> Result<Vec<Identifier>> {
    let all = match (&args.identifiers_file, &args.input_file) {
        (Some(list), _) => load_identifier_list(list)?,
        (None, Some(csv)) => load_identifiers(csv, &args.id_column)?,
        (None, None) => {
            return Err(PipelineError::ConfigError(
                "one of --input-file or --identifiers-file is required".to_string(),
            ))
        }
    };
    let selected = sample_identifiers(all, args.sample_size, args.seed);
    write_identifier_list(&args.selected_output, &selected)?;
    info!(
        count = selected.len(),
        "Selected accession numbers saved to: {}",
        args.selected_output.display()
    );
    Ok(selected)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let harvest_config = args.resolve_config()?;
    if args.validate_config {
        info!(config = ?harvest_config, "Configuration is valid");
        return Ok(());
    }

    setup_prometheus_metrics(args.metrics_port).await?;

    let identifiers = select_identifiers(&args)?;
    let run_config = Arc::new(RunConfig::prepare(&harvest_config)?);
    if identifiers.is_empty() {
        warn!("No identifiers selected; nothing to do.");
        return Ok(());
    }

    let executor = Arc::new(build_record_pipeline(Arc::new(ProcessStageRunner::new())));
    let dispatcher = Dispatcher::new(executor, run_config.concurrency)?;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; letting running records finish their current stage.");
            ctrl_c_token.cancel();
        }
    });

    let mut reporter = FanoutReporter::new();
    reporter = if args.no_progress {
        reporter.with(Box::new(LogReporter))
    } else {
        reporter.with(Box::new(ProgressReporter::new(identifiers.len() as u64)))
    };
    if let Some(path) = &args.report_jsonl {
        reporter = reporter.with(Box::new(JsonLinesReporter::create(path)?));
    }

    info!("Downloading and converting {} records in parallel...", identifiers.len());
    let summary = dispatcher
        .run_and_report(identifiers, Arc::clone(&run_config), cancel, &mut reporter)
        .await?;

    if let Some(path) = &args.failed_output {
        match summary.write_failed(path) {
            Ok(()) => info!(
                count = summary.failed_identifiers.len(),
                "Failed identifiers written to {}",
                path.display()
            ),
            Err(e) => error!(error = %e, "Could not write failed identifiers"),
        }
    }

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed_identifiers.len(),
        "Download and conversion complete. Converted files available in: {}",
        run_config.output_dir.display()
    );
    Ok(())
}
