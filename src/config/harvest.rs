use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 5.0;
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Harvest configuration as read from YAML.
///
/// Every field has a default, so an empty document (or no file at all) yields
/// the stock `prefetch` / `fastq-dump` setup with 3 attempts, 5 s between
/// attempts and 4 workers.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestConfig {
    /// Where the fetch tool drops downloaded artifacts.
    pub fetch_dir: PathBuf,
    /// Where the convert tool writes its output.
    pub output_dir: PathBuf,
    /// Total fetch attempts per identifier (not extra retries).
    pub max_retries: u32,
    pub retry_delay_secs: f64,
    pub concurrency: usize,
    pub locate_policy: LocatePolicy,
    pub fetch_tool: FetchToolConfig,
    pub convert_tool: ConvertToolConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        HarvestConfig {
            fetch_dir: PathBuf::from("data/sra_raw"),
            output_dir: PathBuf::from("data/fastq"),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            locate_policy: LocatePolicy::default(),
            fetch_tool: FetchToolConfig::default(),
            convert_tool: ConvertToolConfig::default(),
        }
    }
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(PipelineError::ConfigValidationError(
                "max_retries must be greater than 0".to_string(),
            ));
        }
        // Rejects NaN, negatives and values too large for a `Duration`.
        if Duration::try_from_secs_f64(self.retry_delay_secs).is_err() {
            return Err(PipelineError::ConfigValidationError(format!(
                "retry_delay_secs must be a non-negative number of seconds within range, got {}",
                self.retry_delay_secs
            )));
        }
        if self.concurrency == 0 {
            return Err(PipelineError::ConfigValidationError(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        if self.fetch_dir.as_os_str().is_empty() || self.output_dir.as_os_str().is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "fetch_dir and output_dir must not be empty".to_string(),
            ));
        }
        self.fetch_tool.validate()?;
        self.convert_tool.validate()?;
        Ok(())
    }
}

/// How to pick an artifact when several entries in the fetch directory share
/// the identifier prefix.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocatePolicy {
    /// Take the lexicographically smallest name and log a warning.
    #[default]
    FirstSorted,
    /// Treat more than one candidate as a locate failure.
    FailOnAmbiguous,
}

/// Download tool: invoked as `<program> <args...> <identifier>` inside the fetch dir.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FetchToolConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for FetchToolConfig {
    fn default() -> Self {
        FetchToolConfig {
            program: "prefetch".to_string(),
            args: Vec::new(),
        }
    }
}

impl FetchToolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "fetch_tool.program must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Conversion tool: invoked as
/// `<program> <split_args...> <located file> <output_flag> <output dir>`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertToolConfig {
    pub program: String,
    pub split_args: Vec<String>,
    pub output_flag: String,
}

impl Default for ConvertToolConfig {
    fn default() -> Self {
        ConvertToolConfig {
            program: "fastq-dump".to_string(),
            split_args: vec!["--split-files".to_string()],
            output_flag: "-O".to_string(),
        }
    }
}

impl ConvertToolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "convert_tool.program must not be empty".to_string(),
            ));
        }
        if self.output_flag.trim().is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "convert_tool.output_flag must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads and parses the harvest configuration YAML file.
pub fn load_harvest_config<P: AsRef<Path>>(config_path: P) -> Result<HarvestConfig> {
    let path_ref = config_path.as_ref();
    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        PipelineError::ConfigError(format!(
            "Failed to read harvest config file '{}': {}",
            path_ref.display(),
            e
        ))
    })?;

    // An empty file is a valid "all defaults" config.
    if config_content.trim().is_empty() {
        return Ok(HarvestConfig::default());
    }

    serde_yaml::from_str(&config_content).map_err(|e| {
        PipelineError::ConfigError(format!(
            "Failed to parse harvest config YAML from '{}': {}",
            path_ref.display(),
            e
        ))
    })
}
