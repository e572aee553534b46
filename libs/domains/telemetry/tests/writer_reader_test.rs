//! Integration tests for the metrics writer and readers.
//!
//! These run against real PostgreSQL via testcontainers so the
//! partitioned tables, unique indexes, and upsert paths are exercised for
//! real.

use chrono::{Duration, Utc};
use domain_telemetry::{
    CloudProvider, CostMetricRow, CostReader, MetricBatch, MetricsWriter, PerformanceMetricRow,
    PerformanceReader, PgCostReader, PgMetricsWriter, PgPerformanceReader, TimeWindow,
};
use test_utils::{TestDatabase, TestDataBuilder};

fn cost_row(
    customer_id: uuid::Uuid,
    instance_id: &str,
    amount: f64,
    minutes_ago: i64,
) -> CostMetricRow {
    CostMetricRow {
        timestamp: Utc::now() - Duration::minutes(minutes_ago),
        customer_id,
        provider: CloudProvider::Runpod,
        instance_id: instance_id.to_string(),
        cost_type: "gpu_compute".to_string(),
        amount,
        currency: "USD".to_string(),
        resource_type: "A100".to_string(),
    }
}

#[tokio::test]
async fn test_writer_idempotence_same_batch_twice() {
    let db = TestDatabase::new().await;
    let writer = PgMetricsWriter::new(db.connection());
    let builder = TestDataBuilder::from_test_name("writer_idempotence");
    let customer_id = builder.customer_id();

    let batch = vec![
        cost_row(customer_id, "pod-a", 1.25, 30),
        cost_row(customer_id, "pod-b", 0.80, 30),
    ];

    let first = writer
        .write_batch(MetricBatch::Cost(batch.clone()))
        .await
        .unwrap();
    assert_eq!(first.written, 2);
    assert_eq!(first.rejected, 0);

    // Same series keys again: overwrite, never duplicate
    writer
        .write_batch(MetricBatch::Cost(batch))
        .await
        .unwrap();

    let reader = PgCostReader::new(db.connection());
    let rows = reader
        .list_metrics(
            customer_id,
            CloudProvider::Runpod,
            TimeWindow::last_hours(2),
            100,
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 2, "duplicate rows after re-insert");
}

#[tokio::test]
async fn test_writer_overwrite_updates_amount() {
    let db = TestDatabase::new().await;
    let writer = PgMetricsWriter::new(db.connection());
    let builder = TestDataBuilder::from_test_name("writer_overwrite");
    let customer_id = builder.customer_id();

    let mut row = cost_row(customer_id, "pod-a", 1.0, 10);
    writer
        .write_batch(MetricBatch::Cost(vec![row.clone()]))
        .await
        .unwrap();

    row.amount = 2.5;
    writer
        .write_batch(MetricBatch::Cost(vec![row]))
        .await
        .unwrap();

    let reader = PgCostReader::new(db.connection());
    let total = reader
        .total_cost(customer_id, CloudProvider::Runpod, TimeWindow::last_hours(1))
        .await
        .unwrap();
    assert!((total - 2.5).abs() < 1e-9, "expected overwrite, got {total}");
}

#[tokio::test]
async fn test_writer_rejects_invalid_rows_and_keeps_valid() {
    let db = TestDatabase::new().await;
    let writer = PgMetricsWriter::new(db.connection());
    let builder = TestDataBuilder::from_test_name("writer_partial");
    let customer_id = builder.customer_id();

    let batch = vec![
        cost_row(customer_id, "pod-a", 1.0, 5),
        cost_row(customer_id, "pod-b", f64::NAN, 5),
        cost_row(customer_id, "pod-c", 3.0, 5),
    ];

    let outcome = writer.write_batch(MetricBatch::Cost(batch)).await.unwrap();
    assert_eq!(outcome.written, 2);
    assert_eq!(outcome.rejected, 1);
    assert!(outcome.is_partial());
    assert!(outcome.errors[0].contains("non-finite"));
}

#[tokio::test]
async fn test_cost_reader_trend_and_summary() {
    let db = TestDatabase::new().await;
    let writer = PgMetricsWriter::new(db.connection());
    let builder = TestDataBuilder::from_test_name("cost_trend");
    let customer_id = builder.customer_id();

    // Spread spend over three distinct hours
    let batch = vec![
        cost_row(customer_id, "pod-a", 1.0, 10),
        cost_row(customer_id, "pod-a", 2.0, 70),
        cost_row(customer_id, "pod-a", 4.0, 130),
    ];
    writer.write_batch(MetricBatch::Cost(batch)).await.unwrap();

    let reader = PgCostReader::new(db.connection());
    let window = TimeWindow::last_hours(4);

    let total = reader
        .total_cost(customer_id, CloudProvider::Runpod, window)
        .await
        .unwrap();
    assert!((total - 7.0).abs() < 1e-9);

    let trend = reader
        .hourly_trend(customer_id, CloudProvider::Runpod, window)
        .await
        .unwrap();
    assert_eq!(trend.len(), 3);
    // buckets come back in ascending order
    assert!(trend.windows(2).all(|w| w[0].bucket <= w[1].bucket));

    let summary = reader
        .summary(customer_id, CloudProvider::Runpod, window)
        .await
        .unwrap();
    assert_eq!(summary.sample_count, 3);
    assert!((summary.by_cost_type["gpu_compute"] - 7.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_performance_reader_isolates_customers() {
    let db = TestDatabase::new().await;
    let writer = PgMetricsWriter::new(db.connection());
    let builder = TestDataBuilder::from_test_name("perf_isolation");
    let customer_a = builder.id("customer-a");
    let customer_b = builder.id("customer-b");

    for (customer_id, value) in [(customer_a, 50.0), (customer_b, 90.0)] {
        writer
            .write_batch(MetricBatch::Performance(vec![PerformanceMetricRow {
                timestamp: Utc::now(),
                customer_id,
                provider: CloudProvider::Aws,
                metric_name: "cpu_utilization".to_string(),
                metric_value: value,
                resource_id: "node-1".to_string(),
                tags: Default::default(),
            }]))
            .await
            .unwrap();
    }

    let reader = PgPerformanceReader::new(db.connection());
    let summary = reader
        .summary(customer_a, CloudProvider::Aws, TimeWindow::last_hours(1))
        .await
        .unwrap();

    let aggregate = &summary.metrics["cpu_utilization"];
    assert_eq!(aggregate.sample_count, 1);
    assert!((aggregate.avg - 50.0).abs() < 1e-9);
}
