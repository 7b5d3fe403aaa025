// src/config.rs
pub mod harvest;
pub mod harvester;
pub mod run;

pub use harvest::{
    load_harvest_config, ConvertToolConfig, FetchToolConfig, HarvestConfig, LocatePolicy,
    DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_SECS,
};
pub use run::RunConfig;
