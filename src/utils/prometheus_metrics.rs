// src/utils/prometheus_metrics.rs

use once_cell::sync::Lazy;
use prometheus::{register_counter, register_gauge, register_histogram, Counter, Gauge, Histogram};

// Dispatcher
pub static RECORDS_SUBMITTED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "harvest_records_submitted_total",
        "Total number of identifiers submitted to the worker pool."
    )
    .expect("Failed to register RECORDS_SUBMITTED_TOTAL counter")
});

pub static QUEUED_RECORDS: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "harvest_queued_records",
        "Number of identifiers waiting for a free worker."
    )
    .expect("Failed to register QUEUED_RECORDS gauge")
});

pub static ACTIVE_PIPELINES: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "harvest_active_pipelines",
        "Number of record pipelines currently executing."
    )
    .expect("Failed to register ACTIVE_PIPELINES gauge")
});

pub static RECORD_PIPELINE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "harvest_record_pipeline_duration_seconds",
        "Histogram of per-record pipeline durations (fetch, locate and convert)."
    )
    .expect("Failed to register RECORD_PIPELINE_DURATION_SECONDS histogram")
});

// Stages
pub static FETCH_ATTEMPTS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "harvest_fetch_attempts_total",
        "Total number of fetch tool invocations, retries included."
    )
    .expect("Failed to register FETCH_ATTEMPTS_TOTAL counter")
});

pub static FETCH_FAILED_ATTEMPTS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "harvest_fetch_failed_attempts_total",
        "Total number of fetch tool invocations that failed."
    )
    .expect("Failed to register FETCH_FAILED_ATTEMPTS_TOTAL counter")
});

pub static CONVERT_INVOCATIONS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "harvest_convert_invocations_total",
        "Total number of convert tool invocations."
    )
    .expect("Failed to register CONVERT_INVOCATIONS_TOTAL counter")
});

// Outcomes
pub static RECORDS_SUCCEEDED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "harvest_records_succeeded_total",
        "Total number of identifiers downloaded and converted."
    )
    .expect("Failed to register RECORDS_SUCCEEDED_TOTAL counter")
});

pub static RECORDS_DOWNLOAD_FAILED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "harvest_records_download_failed_total",
        "Total number of identifiers whose fetch attempts were exhausted."
    )
    .expect("Failed to register RECORDS_DOWNLOAD_FAILED_TOTAL counter")
});

pub static RECORDS_LOCATE_FAILED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "harvest_records_locate_failed_total",
        "Total number of identifiers with no usable downloaded artifact."
    )
    .expect("Failed to register RECORDS_LOCATE_FAILED_TOTAL counter")
});

pub static RECORDS_CONVERT_FAILED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "harvest_records_convert_failed_total",
        "Total number of identifiers whose conversion failed."
    )
    .expect("Failed to register RECORDS_CONVERT_FAILED_TOTAL counter")
});

pub static RECORDS_CANCELLED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "harvest_records_cancelled_total",
        "Total number of identifiers skipped or stopped by cancellation."
    )
    .expect("Failed to register RECORDS_CANCELLED_TOTAL counter")
});
