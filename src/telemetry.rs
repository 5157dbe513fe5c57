//! Logging and metrics.
//!
//! Logs go through `tracing`; `RUST_LOG` overrides the configured level.
//! Counters go through the `metrics` facade and are no-ops until a recorder
//! is installed with [`install_metrics_exporter`].

use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use crate::config::{LogFormat, LoggingConfig};

// ============================================================================
// Metric Names
// ============================================================================

/// Served site requests, labelled by status code.
pub const REQUESTS_TOTAL: &str = "siteship_requests_total";

/// Registry mutations, labelled by operation.
pub const REGISTRY_OPERATIONS_TOTAL: &str = "siteship_registry_operations_total";

/// Blob deletions that failed during deploy cleanup.
pub const CLEANUP_FAILURES_TOTAL: &str = "siteship_cleanup_failures_total";

// ============================================================================
// Initialization
// ============================================================================

/// Installs the global tracing subscriber.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    if let Err(e) = result {
        eprintln!("Warning: tracing already initialized: {e}");
    }
}

/// Starts a Prometheus scrape endpoint on `addr` and registers descriptions.
///
/// Must be called from inside a Tokio runtime.
///
/// # Errors
///
/// Returns an error if the recorder is already installed or the listener
/// cannot bind.
pub fn install_metrics_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    describe_counter!(REQUESTS_TOTAL, "Site requests served, by status");
    describe_counter!(REGISTRY_OPERATIONS_TOTAL, "Registry mutations, by operation");
    describe_counter!(CLEANUP_FAILURES_TOTAL, "Failed blob deletions during deploy cleanup");

    info!(%addr, "Metrics exporter listening");
    Ok(())
}

// ============================================================================
// Recording
// ============================================================================

/// Records one served site request.
pub fn record_request(status: u16) {
    counter!(REQUESTS_TOTAL, "status" => status.to_string()).increment(1);
}

/// Records one registry mutation (`upsert`, `finalize`, `publish`).
pub fn record_registry_operation(op: &'static str) {
    counter!(REGISTRY_OPERATIONS_TOTAL, "op" => op).increment(1);
}

/// Records a blob deletion that failed during deploy cleanup.
pub fn record_cleanup_failure(stage: &'static str) {
    counter!(CLEANUP_FAILURES_TOTAL, "stage" => stage).increment(1);
}
