// src/utils/metrics_server.rs

use crate::error::Result;
use axum::{http::StatusCode, routing::get, serve, Router};
use prometheus::{gather, Encoder, TextEncoder};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Renders the default registry in the Prometheus text format.
pub fn render_metrics() -> std::result::Result<String, String> {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    encoder
        .encode(&gather(), &mut buffer)
        .map_err(|e| format!("Could not encode prometheus metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| format!("Prometheus metrics UTF-8 error: {}", e))
}

async fn metrics_handler() -> (StatusCode, String) {
    match render_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(message) => {
            error!("{}", message);
            (StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}

/// Binds the `/metrics` endpoint when a port is given.
///
/// A bind failure aborts startup; serving errors afterwards are only logged.
pub async fn setup_prometheus_metrics(metrics_port: Option<u16>) -> Result<()> {
    let Some(port) = metrics_port else {
        info!("Prometheus metrics endpoint not configured (no port specified).");
        return Ok(());
    };

    let app = Router::new().route("/metrics", get(metrics_handler));
    let listener_addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&listener_addr).await?;
    info!(
        "Metrics endpoint will be available at http://{}/metrics",
        listener_addr
    );

    tokio::spawn(async move {
        if let Err(e) = serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });
    Ok(())
}
