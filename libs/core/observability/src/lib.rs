//! Observability utilities for the optimization platform.
//!
//! This crate provides:
//! - Prometheus metrics recording and export
//! - Custom metrics for collection, agent, and workflow operations
//! - Axum middleware for automatic request metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, CollectionMetrics};
//!
//! // Initialize metrics recorder
//! init_metrics();
//!
//! // Record collection outcomes
//! CollectionMetrics::record_completed("runpod", "cost", 42, 1.8);
//!
//! // Add metrics endpoint to router
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler));
//! ```

pub mod agents;
pub mod collection;
pub mod middleware;

pub use agents::AgentMetrics;
pub use collection::CollectionMetrics;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup.
/// Returns the PrometheusHandle for rendering metrics.
pub fn init_metrics() -> &'static PrometheusHandle {
    METRICS_HANDLE.get_or_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        info!("Prometheus metrics recorder initialized");

        register_metric_descriptions();

        handle
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for /metrics endpoint
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

/// Register metric descriptions for documentation
fn register_metric_descriptions() {
    use metrics::describe_counter;
    use metrics::describe_gauge;
    use metrics::describe_histogram;

    // HTTP metrics
    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP request errors"
    );

    // Collection metrics
    describe_counter!(
        "collection_runs_total",
        "Collection attempts by provider, data type and status"
    );
    describe_histogram!(
        "collection_duration_seconds",
        "Collection run duration by provider and data type"
    );
    describe_gauge!(
        "metrics_collected_last_run",
        "Rows collected in the last run per (provider, data type)"
    );
    describe_counter!(
        "metrics_rows_written_total",
        "Time-series rows written by table"
    );
    describe_counter!(
        "metrics_rows_rejected_total",
        "Time-series rows rejected by validation, by table"
    );

    // Agent metrics
    describe_gauge!("agents_registered", "Registered agents by type and status");
    describe_counter!("agent_heartbeats_total", "Heartbeats received by agent type");
    describe_counter!(
        "agent_reaped_total",
        "Agents transitioned to unhealthy by the reaper"
    );

    // Workflow metrics
    describe_counter!(
        "workflow_runs_total",
        "Workflow executions by type and terminal status"
    );
    describe_histogram!(
        "workflow_step_duration_seconds",
        "Workflow step duration by step name"
    );
    describe_counter!(
        "workflow_rollbacks_total",
        "Workflows rolled back after a quality regression"
    );
    describe_counter!(
        "approval_votes_total",
        "Peer approval votes by agent type and decision"
    );
}
