use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, Statement,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{sanitize_f64, TrendPoint};
use crate::entity::performance::{Column, Entity};
use crate::error::TelemetryResult;
use crate::models::{CloudProvider, PerformanceMetricRow, TimeWindow};

/// Aggregate over one metric name
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MetricAggregate {
    pub avg: f64,
    pub max: f64,
    pub sample_count: u64,
}

/// Aggregated performance view for one (customer, provider, window)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PerformanceSummary {
    /// Aggregates keyed by metric name
    pub metrics: HashMap<String, MetricAggregate>,
}

/// Read facade over performance_metrics
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PerformanceReader: Send + Sync {
    /// Flat row list inside the window, newest first
    async fn list_metrics(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
        limit: u64,
    ) -> TelemetryResult<Vec<PerformanceMetricRow>>;

    /// Hourly average of one metric inside the window
    async fn hourly_trend(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        metric_name: String,
        window: TimeWindow,
    ) -> TelemetryResult<Vec<TrendPoint>>;

    /// Most recent sample of one metric
    async fn latest(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        metric_name: String,
    ) -> TelemetryResult<Option<PerformanceMetricRow>>;

    /// Per-metric aggregates inside the window
    async fn summary(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
    ) -> TelemetryResult<PerformanceSummary>;
}

/// PostgreSQL implementation of PerformanceReader
#[derive(Clone)]
pub struct PgPerformanceReader {
    db: DatabaseConnection,
}

impl PgPerformanceReader {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[derive(FromQueryResult)]
struct BucketRow {
    bucket: chrono::DateTime<chrono::FixedOffset>,
    value: Option<f64>,
}

#[derive(FromQueryResult)]
struct AggregateRow {
    metric_name: String,
    avg_value: Option<f64>,
    max_value: Option<f64>,
    samples: i64,
}

#[async_trait]
impl PerformanceReader for PgPerformanceReader {
    async fn list_metrics(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
        limit: u64,
    ) -> TelemetryResult<Vec<PerformanceMetricRow>> {
        let rows = Entity::find()
            .filter(Column::CustomerId.eq(customer_id))
            .filter(Column::Provider.eq(provider))
            .filter(Column::Timestamp.gte(window.since))
            .filter(Column::Timestamp.lt(window.until))
            .order_by_desc(Column::Timestamp)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|model| {
                let mut row: PerformanceMetricRow = model.into();
                row.metric_value = sanitize_f64(row.metric_value);
                row
            })
            .collect();
        Ok(rows)
    }

    async fn hourly_trend(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        metric_name: String,
        window: TimeWindow,
    ) -> TelemetryResult<Vec<TrendPoint>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT date_trunc('hour', "timestamp") AS bucket, AVG(metric_value) AS value
            FROM performance_metrics
            WHERE customer_id = $1
              AND provider = $2::cloud_provider
              AND metric_name = $3
              AND "timestamp" >= $4 AND "timestamp" < $5
            GROUP BY bucket
            ORDER BY bucket
            "#,
            [
                customer_id.into(),
                provider.to_string().into(),
                metric_name.into(),
                window.since.into(),
                window.until.into(),
            ],
        );

        let rows = BucketRow::find_by_statement(stmt).all(&self.db).await?;
        Ok(rows
            .into_iter()
            .map(|r| TrendPoint::new(r.bucket.into(), r.value.unwrap_or(0.0)))
            .collect())
    }

    async fn latest(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        metric_name: String,
    ) -> TelemetryResult<Option<PerformanceMetricRow>> {
        let row = Entity::find()
            .filter(Column::CustomerId.eq(customer_id))
            .filter(Column::Provider.eq(provider))
            .filter(Column::MetricName.eq(metric_name))
            .order_by_desc(Column::Timestamp)
            .one(&self.db)
            .await?
            .map(|model| {
                let mut row: PerformanceMetricRow = model.into();
                row.metric_value = sanitize_f64(row.metric_value);
                row
            });
        Ok(row)
    }

    async fn summary(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
    ) -> TelemetryResult<PerformanceSummary> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT metric_name,
                   AVG(metric_value) AS avg_value,
                   MAX(metric_value) AS max_value,
                   COUNT(*) AS samples
            FROM performance_metrics
            WHERE customer_id = $1
              AND provider = $2::cloud_provider
              AND "timestamp" >= $3 AND "timestamp" < $4
            GROUP BY metric_name
            "#,
            [
                customer_id.into(),
                provider.to_string().into(),
                window.since.into(),
                window.until.into(),
            ],
        );

        let rows = AggregateRow::find_by_statement(stmt).all(&self.db).await?;

        let metrics = rows
            .into_iter()
            .map(|row| {
                (
                    row.metric_name,
                    MetricAggregate {
                        avg: sanitize_f64(row.avg_value.unwrap_or(0.0)),
                        max: sanitize_f64(row.max_value.unwrap_or(0.0)),
                        sample_count: row.samples.max(0) as u64,
                    },
                )
            })
            .collect();

        Ok(PerformanceSummary { metrics })
    }
}
