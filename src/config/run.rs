use crate::config::harvest::{ConvertToolConfig, FetchToolConfig, HarvestConfig, LocatePolicy};
use crate::error::{PipelineError, Result};
use crate::retry::RetryPolicy;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Immutable, process-wide settings for one run.
///
/// Built once before dispatch and shared behind an `Arc` by every job; nothing
/// mutates it afterwards.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub fetch_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub concurrency: usize,
    pub locate_policy: LocatePolicy,
    pub fetch_tool: FetchToolConfig,
    pub convert_tool: ConvertToolConfig,
}

impl RunConfig {
    /// Maps a harvest config onto a run config without touching the filesystem.
    pub fn from_harvest_config(config: &HarvestConfig) -> Self {
        RunConfig {
            fetch_dir: config.fetch_dir.clone(),
            output_dir: config.output_dir.clone(),
            max_retries: config.max_retries,
            // Out-of-range delays are rejected by `validate`; unvalidated input falls back to no delay.
            retry_delay: Duration::try_from_secs_f64(config.retry_delay_secs).unwrap_or_default(),
            concurrency: config.concurrency,
            locate_policy: config.locate_policy,
            fetch_tool: config.fetch_tool.clone(),
            convert_tool: config.convert_tool.clone(),
        }
    }

    /// Validates the config and provisions both directories.
    ///
    /// Any error here is a run-level failure: nothing has been dispatched yet.
    pub fn prepare(config: &HarvestConfig) -> Result<Self> {
        config.validate()?;
        provision_dir(&config.fetch_dir, "fetch_dir")?;
        provision_dir(&config.output_dir, "output_dir")?;
        let run_config = RunConfig::from_harvest_config(config);
        info!(
            fetch_dir = %run_config.fetch_dir.display(),
            output_dir = %run_config.output_dir.display(),
            max_retries = run_config.max_retries,
            retry_delay = ?run_config.retry_delay,
            concurrency = run_config.concurrency,
            "Run configuration prepared"
        );
        Ok(run_config)
    }

    pub fn fetch_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }
}

fn provision_dir(path: &Path, label: &str) -> Result<()> {
    if path.exists() && !path.is_dir() {
        return Err(PipelineError::ConfigError(format!(
            "{} '{}' exists but is not a directory",
            label,
            path.display()
        )));
    }
    fs::create_dir_all(path).map_err(|e| {
        PipelineError::ConfigError(format!(
            "Failed to create {} '{}': {}",
            label,
            path.display(),
            e
        ))
    })?;
    debug!(%label, path = %path.display(), "Directory ready");
    Ok(())
}
