// --- Command-Line Arguments Struct ---
// Lives in the library so tests can build Args without going through the binary.
use crate::config::harvest::{load_harvest_config, HarvestConfig};
use crate::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Download and convert a random sample of SRA accessions", long_about = None)]
pub struct Args {
    /// Path to the harvest configuration YAML file (optional; defaults apply otherwise)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// CSV file listing accessions
    #[arg(short, long, conflicts_with = "identifiers_file")]
    pub input_file: Option<PathBuf>,

    /// Column holding the accession in the CSV file
    #[arg(long, default_value = "acc")]
    pub id_column: String,

    /// Plain text file with one accession per line (e.g. a previous failed list)
    #[arg(long)]
    pub identifiers_file: Option<PathBuf>,

    /// Randomly pick at most this many accessions from the input
    #[arg(short = 'n', long, default_value_t = 100)]
    pub sample_size: usize,

    /// Seed for the random sample, for reproducible selections
    #[arg(long)]
    pub seed: Option<u64>,

    /// Where to write the selected accessions
    #[arg(long, default_value = "SELECTED_ACC.txt")]
    pub selected_output: PathBuf,

    /// Overrides `fetch_dir` from the config file
    #[arg(long)]
    pub fetch_dir: Option<PathBuf>,

    /// Overrides `output_dir` from the config file
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Overrides `max_retries` from the config file
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Overrides `retry_delay_secs` from the config file
    #[arg(long)]
    pub retry_delay_secs: Option<f64>,

    /// Overrides `concurrency` from the config file
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Append every outcome as a JSON line to this file
    #[arg(long)]
    pub report_jsonl: Option<PathBuf>,

    /// Write identifiers that did not succeed to this file, one per line
    #[arg(long)]
    pub failed_output: Option<PathBuf>,

    /// Optional: Port for the Prometheus metrics HTTP endpoint
    #[arg(long)]
    pub metrics_port: Option<u16>,

    /// Validate the configuration and exit
    #[arg(long)]
    pub validate_config: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    /// Loads the config file (if any) and applies command-line overrides on top.
    pub fn resolve_config(&self) -> Result<HarvestConfig> {
        let mut config = match &self.config {
            Some(path) => load_harvest_config(path)?,
            None => HarvestConfig::default(),
        };
        if let Some(dir) = &self.fetch_dir {
            config.fetch_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(delay) = self.retry_delay_secs {
            config.retry_delay_secs = delay;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        config.validate()?;
        Ok(config)
    }
}
