//! Collection-pipeline metrics.

use metrics::{counter, gauge, histogram};

/// Collection metrics recorder
pub struct CollectionMetrics;

impl CollectionMetrics {
    /// Record a collection run start
    pub fn record_started(provider: &str, data_type: &str) {
        counter!(
            "collection_runs_total",
            "provider" => provider.to_string(),
            "data_type" => data_type.to_string(),
            "status" => "started"
        )
        .increment(1);
    }

    /// Record a collection run outcome
    pub fn record_completed(
        provider: &str,
        data_type: &str,
        metrics_collected: usize,
        duration_secs: f64,
    ) {
        counter!(
            "collection_runs_total",
            "provider" => provider.to_string(),
            "data_type" => data_type.to_string(),
            "status" => "completed"
        )
        .increment(1);

        histogram!(
            "collection_duration_seconds",
            "provider" => provider.to_string(),
            "data_type" => data_type.to_string()
        )
        .record(duration_secs);

        gauge!(
            "metrics_collected_last_run",
            "provider" => provider.to_string(),
            "data_type" => data_type.to_string()
        )
        .set(metrics_collected as f64);

        tracing::info!(
            provider = provider,
            data_type = data_type,
            metrics_collected = metrics_collected,
            duration_secs = duration_secs,
            "Collection run completed"
        );
    }

    /// Record a partial collection run (some sub-queries failed)
    pub fn record_partial(provider: &str, data_type: &str, metrics_collected: usize) {
        counter!(
            "collection_runs_total",
            "provider" => provider.to_string(),
            "data_type" => data_type.to_string(),
            "status" => "partial"
        )
        .increment(1);

        gauge!(
            "metrics_collected_last_run",
            "provider" => provider.to_string(),
            "data_type" => data_type.to_string()
        )
        .set(metrics_collected as f64);
    }

    /// Record a failed collection run
    pub fn record_failed(provider: &str, data_type: &str, error: &str) {
        counter!(
            "collection_runs_total",
            "provider" => provider.to_string(),
            "data_type" => data_type.to_string(),
            "status" => "failed"
        )
        .increment(1);

        tracing::error!(
            provider = provider,
            data_type = data_type,
            error = error,
            "Collection run failed"
        );
    }

    /// Record rows landed in a time-series table
    pub fn record_rows_written(table: &str, count: usize) {
        counter!("metrics_rows_written_total", "table" => table.to_string())
            .increment(count as u64);
    }

    /// Record rows rejected by per-row validation
    pub fn record_rows_rejected(table: &str, count: usize) {
        if count > 0 {
            counter!("metrics_rows_rejected_total", "table" => table.to_string())
                .increment(count as u64);
        }
    }
}
