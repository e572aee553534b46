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
use crate::entity::application::{Column, Entity};
use crate::error::TelemetryResult;
use crate::models::{ApplicationMetricRow, CloudProvider, TimeWindow};

/// Aggregated application-quality view for one (customer, provider, window)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationSummary {
    /// Average score keyed by metric type (quality, hallucination, toxicity, ...)
    pub avg_scores: HashMap<String, f64>,
    pub sample_count: u64,
}

/// Read facade over application_metrics.
///
/// `average_score` is what the workflow engine's quality-regression check
/// consumes between rollout phases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplicationReader: Send + Sync {
    /// Flat row list inside the window, newest first
    async fn list_metrics(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
        limit: u64,
    ) -> TelemetryResult<Vec<ApplicationMetricRow>>;

    /// Hourly average score of one metric type inside the window
    async fn hourly_trend(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        metric_type: String,
        window: TimeWindow,
    ) -> TelemetryResult<Vec<TrendPoint>>;

    /// Most recent sample of one metric type
    async fn latest(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        metric_type: String,
    ) -> TelemetryResult<Option<ApplicationMetricRow>>;

    /// Per-metric-type aggregates inside the window
    async fn summary(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
    ) -> TelemetryResult<ApplicationSummary>;

    /// Average score of one metric type inside the window, None when no
    /// samples exist
    async fn average_score(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        metric_type: String,
        window: TimeWindow,
    ) -> TelemetryResult<Option<f64>>;
}

/// PostgreSQL implementation of ApplicationReader
#[derive(Clone)]
pub struct PgApplicationReader {
    db: DatabaseConnection,
}

impl PgApplicationReader {
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
    metric_type: String,
    avg_score: Option<f64>,
    samples: i64,
}

#[derive(FromQueryResult)]
struct ScalarRow {
    value: Option<f64>,
}

#[async_trait]
impl ApplicationReader for PgApplicationReader {
    async fn list_metrics(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
        limit: u64,
    ) -> TelemetryResult<Vec<ApplicationMetricRow>> {
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
                let mut row: ApplicationMetricRow = model.into();
                row.score = sanitize_f64(row.score);
                row
            })
            .collect();
        Ok(rows)
    }

    async fn hourly_trend(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        metric_type: String,
        window: TimeWindow,
    ) -> TelemetryResult<Vec<TrendPoint>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT date_trunc('hour', "timestamp") AS bucket, AVG(score) AS value
            FROM application_metrics
            WHERE customer_id = $1
              AND provider = $2::cloud_provider
              AND metric_type = $3
              AND "timestamp" >= $4 AND "timestamp" < $5
            GROUP BY bucket
            ORDER BY bucket
            "#,
            [
                customer_id.into(),
                provider.to_string().into(),
                metric_type.into(),
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
        metric_type: String,
    ) -> TelemetryResult<Option<ApplicationMetricRow>> {
        let row = Entity::find()
            .filter(Column::CustomerId.eq(customer_id))
            .filter(Column::Provider.eq(provider))
            .filter(Column::MetricType.eq(metric_type))
            .order_by_desc(Column::Timestamp)
            .one(&self.db)
            .await?
            .map(|model| {
                let mut row: ApplicationMetricRow = model.into();
                row.score = sanitize_f64(row.score);
                row
            });
        Ok(row)
    }

    async fn summary(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
    ) -> TelemetryResult<ApplicationSummary> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT metric_type, AVG(score) AS avg_score, COUNT(*) AS samples
            FROM application_metrics
            WHERE customer_id = $1
              AND provider = $2::cloud_provider
              AND "timestamp" >= $3 AND "timestamp" < $4
            GROUP BY metric_type
            "#,
            [
                customer_id.into(),
                provider.to_string().into(),
                window.since.into(),
                window.until.into(),
            ],
        );

        let rows = AggregateRow::find_by_statement(stmt).all(&self.db).await?;

        let mut avg_scores = HashMap::new();
        let mut sample_count = 0u64;
        for row in rows {
            sample_count += row.samples.max(0) as u64;
            avg_scores.insert(row.metric_type, sanitize_f64(row.avg_score.unwrap_or(0.0)));
        }

        Ok(ApplicationSummary {
            avg_scores,
            sample_count,
        })
    }

    async fn average_score(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        metric_type: String,
        window: TimeWindow,
    ) -> TelemetryResult<Option<f64>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT AVG(score) AS value
            FROM application_metrics
            WHERE customer_id = $1
              AND provider = $2::cloud_provider
              AND metric_type = $3
              AND "timestamp" >= $4 AND "timestamp" < $5
            "#,
            [
                customer_id.into(),
                provider.to_string().into(),
                metric_type.into(),
                window.since.into(),
                window.until.into(),
            ],
        );

        let row = ScalarRow::find_by_statement(stmt).one(&self.db).await?;
        Ok(row.and_then(|r| r.value).map(sanitize_f64))
    }
}
