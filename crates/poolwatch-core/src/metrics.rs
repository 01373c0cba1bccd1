//! Prometheus metrics helpers for the poolwatch daemon.
//!
//! Centralized metrics initialization and the metric descriptions used across
//! the pipeline.
//!
//! # Usage
//!
//! ```rust,ignore
//! use poolwatch_core::metrics::{init_metrics, start_metrics_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let handle = init_metrics();
//!     start_metrics_server(9090, handle).await.unwrap();
//!
//!     use metrics::{counter, gauge};
//!     counter!("ingest_lines_total").increment(1);
//!     gauge!("correlator_entries").set(42.0);
//! }
//! ```
//!
//! # Metric Naming Conventions
//!
//! - Prefix: component name (`ingest_`, `tail_`, `correlator_`, `sink_`)
//! - Suffix: unit or type (`_total`, `_entries`)

use axum::{Router, routing::get};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Initialize the Prometheus metrics recorder.
///
/// This must be called once at startup before any metrics are recorded.
/// Returns a handle that can be used with [`start_metrics_server`].
///
/// # Panics
///
/// Panics if called more than once (the recorder can only be installed once).
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    register_metrics();

    handle
}

/// Try to initialize the Prometheus metrics recorder.
///
/// Like [`init_metrics`] but returns `None` if the recorder is already
/// installed, instead of panicking. Useful for tests.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    PrometheusBuilder::new().install_recorder().ok()
}

/// Start the Prometheus metrics HTTP server.
///
/// Serves the `/metrics` endpoint on the specified port. Spawns a background
/// task and returns immediately.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        axum::serve(listener, app).await.unwrap();
    });

    Ok(())
}

/// Register descriptions for the metrics emitted by the daemon.
///
/// Called automatically by [`init_metrics`].
fn register_metrics() {
    // =========================================================================
    // Tail / Extraction Metrics
    // =========================================================================

    describe_counter!("ingest_lines_total", "Raw lines read from the debug log");
    describe_counter!(
        "ingest_accepts_total",
        "Mempool acceptance events extracted"
    );
    describe_counter!(
        "ingest_replacements_total",
        "Mempool replacement lines recorded into the correlator"
    );
    describe_counter!(
        "ingest_replacements_resolved_total",
        "Acceptances that consumed a pending replacement linkage"
    );
    describe_counter!(
        "tail_rotations_detected_total",
        "Times the followed log file was observed truncated, rotated, or inaccessible"
    );
    describe_gauge!(
        "ingest_running",
        "Whether the ingestion daemon is currently running (1=yes, 0=no)"
    );

    // =========================================================================
    // Correlator / Batch Metrics
    // =========================================================================

    describe_gauge!(
        "correlator_entries",
        "Replacement linkages awaiting a matching acceptance"
    );
    describe_counter!(
        "correlator_evictions_total",
        "Unresolved replacement entries evicted by the optional capacity bound"
    );
    describe_gauge!("batch_buffered_events", "Events buffered awaiting flush");
    describe_counter!("flush_total", "Batch flushes handed to the sink");
    describe_counter!("flush_events_total", "Events shipped across all flushes");

    // =========================================================================
    // Sink Metrics
    // =========================================================================

    describe_counter!(
        "parquet_uploads_total",
        "Parquet files uploaded to object storage"
    );
    describe_counter!(
        "parquet_bytes_total",
        "Encoded Parquet bytes uploaded to object storage"
    );
    describe_counter!("kafka_published_total", "Messages acknowledged by Kafka");
    describe_counter!(
        "kafka_publish_failures_total",
        "Messages that failed to publish (logged and dropped)"
    );
    describe_gauge!("kafka_in_flight", "Publishes awaiting acknowledgment");
}
