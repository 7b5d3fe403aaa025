#![allow(non_snake_case)]

pub mod config;
pub mod data_model;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod reporter;
pub mod retry;
pub mod sources;
pub mod stage;
pub mod utils;
pub mod worker_logic;

pub use data_model::{Identifier, Outcome, OutcomeStatus};
pub use dispatcher::{DispatchHandle, Dispatcher};
pub use error::{PipelineError, Result};
