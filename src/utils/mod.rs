// Utils

pub mod metrics_server;
pub mod prometheus_metrics;

pub use metrics_server::setup_prometheus_metrics;
