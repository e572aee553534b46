use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, Statement,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{sanitize_f64, TrendPoint};
use crate::entity::resource::{Column, Entity};
use crate::error::TelemetryResult;
use crate::models::{CloudProvider, ResourceMetricRow, TimeWindow};

/// Fleet-level utilization view for one (customer, provider, window)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResourceSummary {
    /// Distinct resources seen inside the window
    pub total_instances: u64,
    pub avg_cpu_utilization: f64,
    pub max_cpu_utilization: f64,
}

/// Read facade over resource_metrics
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceReader: Send + Sync {
    /// Flat row list inside the window, newest first
    async fn list_metrics(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
        limit: u64,
    ) -> TelemetryResult<Vec<ResourceMetricRow>>;

    /// Hourly average of one metric inside the window
    async fn hourly_trend(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        metric_name: String,
        window: TimeWindow,
    ) -> TelemetryResult<Vec<TrendPoint>>;

    /// Most recent sample for one resource
    async fn latest(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        resource_id: String,
    ) -> TelemetryResult<Option<ResourceMetricRow>>;

    /// Fleet utilization summary inside the window
    async fn summary(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
    ) -> TelemetryResult<ResourceSummary>;
}

/// PostgreSQL implementation of ResourceReader
#[derive(Clone)]
pub struct PgResourceReader {
    db: DatabaseConnection,
}

impl PgResourceReader {
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
struct FleetRow {
    total_instances: i64,
    avg_cpu: Option<f64>,
    max_cpu: Option<f64>,
}

#[async_trait]
impl ResourceReader for PgResourceReader {
    async fn list_metrics(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
        limit: u64,
    ) -> TelemetryResult<Vec<ResourceMetricRow>> {
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
                let mut row: ResourceMetricRow = model.into();
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
            FROM resource_metrics
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
        resource_id: String,
    ) -> TelemetryResult<Option<ResourceMetricRow>> {
        let row = Entity::find()
            .filter(Column::CustomerId.eq(customer_id))
            .filter(Column::Provider.eq(provider))
            .filter(Column::ResourceId.eq(resource_id))
            .order_by_desc(Column::Timestamp)
            .one(&self.db)
            .await?
            .map(|model| {
                let mut row: ResourceMetricRow = model.into();
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
    ) -> TelemetryResult<ResourceSummary> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT COUNT(DISTINCT resource_id) AS total_instances,
                   AVG(metric_value) FILTER (WHERE metric_name = 'cpu_utilization') AS avg_cpu,
                   MAX(metric_value) FILTER (WHERE metric_name = 'cpu_utilization') AS max_cpu
            FROM resource_metrics
            WHERE customer_id = $1
              AND provider = $2::cloud_provider
              AND "timestamp" >= $3 AND "timestamp" < $4
            "#,
            [
                customer_id.into(),
                provider.to_string().into(),
                window.since.into(),
                window.until.into(),
            ],
        );

        let row = FleetRow::find_by_statement(stmt).one(&self.db).await?;

        Ok(match row {
            Some(row) => ResourceSummary {
                total_instances: row.total_instances.max(0) as u64,
                avg_cpu_utilization: sanitize_f64(row.avg_cpu.unwrap_or(0.0)),
                max_cpu_utilization: sanitize_f64(row.max_cpu.unwrap_or(0.0)),
            },
            None => ResourceSummary {
                total_instances: 0,
                avg_cpu_utilization: 0.0,
                max_cpu_utilization: 0.0,
            },
        })
    }
}
