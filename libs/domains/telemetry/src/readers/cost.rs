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
use crate::entity::cost::{Column, Entity};
use crate::error::TelemetryResult;
use crate::models::{CloudProvider, CostMetricRow, TimeWindow};

/// Aggregated spend view for one (customer, provider, window)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CostSummary {
    pub total_cost: f64,
    /// Spend broken down by cost_type
    pub by_cost_type: HashMap<String, f64>,
    pub sample_count: u64,
    pub currency: String,
}

/// Read facade over cost_metrics
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CostReader: Send + Sync {
    /// Flat row list inside the window, newest first
    async fn list_metrics(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
        limit: u64,
    ) -> TelemetryResult<Vec<CostMetricRow>>;

    /// Total spend inside the window
    async fn total_cost(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
    ) -> TelemetryResult<f64>;

    /// Hourly spend buckets inside the window
    async fn hourly_trend(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
    ) -> TelemetryResult<Vec<TrendPoint>>;

    /// Most recent spend event
    async fn latest(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
    ) -> TelemetryResult<Option<CostMetricRow>>;

    /// Aggregated summary inside the window
    async fn summary(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
    ) -> TelemetryResult<CostSummary>;

    /// Providers with any spend for the customer inside the window
    async fn providers_with_spend(
        &self,
        customer_id: Uuid,
        window: TimeWindow,
    ) -> TelemetryResult<Vec<CloudProvider>>;
}

/// PostgreSQL implementation of CostReader
#[derive(Clone)]
pub struct PgCostReader {
    db: DatabaseConnection,
}

impl PgCostReader {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[derive(FromQueryResult)]
struct ScalarRow {
    total: Option<f64>,
}

#[derive(FromQueryResult)]
struct BucketRow {
    bucket: chrono::DateTime<chrono::FixedOffset>,
    value: Option<f64>,
}

#[derive(FromQueryResult)]
struct BreakdownRow {
    cost_type: String,
    total: Option<f64>,
    samples: i64,
}

#[derive(FromQueryResult)]
struct ProviderRow {
    provider: String,
}

#[async_trait]
impl CostReader for PgCostReader {
    async fn list_metrics(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
        limit: u64,
    ) -> TelemetryResult<Vec<CostMetricRow>> {
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
                let mut row: CostMetricRow = model.into();
                row.amount = sanitize_f64(row.amount);
                row
            })
            .collect();
        Ok(rows)
    }

    async fn total_cost(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
    ) -> TelemetryResult<f64> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT SUM(amount) AS total
            FROM cost_metrics
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

        let row = ScalarRow::find_by_statement(stmt).one(&self.db).await?;
        Ok(sanitize_f64(row.and_then(|r| r.total).unwrap_or(0.0)))
    }

    async fn hourly_trend(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
    ) -> TelemetryResult<Vec<TrendPoint>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT date_trunc('hour', "timestamp") AS bucket, SUM(amount) AS value
            FROM cost_metrics
            WHERE customer_id = $1
              AND provider = $2::cloud_provider
              AND "timestamp" >= $3 AND "timestamp" < $4
            GROUP BY bucket
            ORDER BY bucket
            "#,
            [
                customer_id.into(),
                provider.to_string().into(),
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
    ) -> TelemetryResult<Option<CostMetricRow>> {
        let row = Entity::find()
            .filter(Column::CustomerId.eq(customer_id))
            .filter(Column::Provider.eq(provider))
            .order_by_desc(Column::Timestamp)
            .one(&self.db)
            .await?
            .map(|model| {
                let mut row: CostMetricRow = model.into();
                row.amount = sanitize_f64(row.amount);
                row
            });
        Ok(row)
    }

    async fn summary(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        window: TimeWindow,
    ) -> TelemetryResult<CostSummary> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT cost_type, SUM(amount) AS total, COUNT(*) AS samples
            FROM cost_metrics
            WHERE customer_id = $1
              AND provider = $2::cloud_provider
              AND "timestamp" >= $3 AND "timestamp" < $4
            GROUP BY cost_type
            "#,
            [
                customer_id.into(),
                provider.to_string().into(),
                window.since.into(),
                window.until.into(),
            ],
        );

        let rows = BreakdownRow::find_by_statement(stmt).all(&self.db).await?;

        let mut by_cost_type = HashMap::new();
        let mut total_cost = 0.0;
        let mut sample_count = 0u64;
        for row in rows {
            let total = sanitize_f64(row.total.unwrap_or(0.0));
            total_cost += total;
            sample_count += row.samples.max(0) as u64;
            by_cost_type.insert(row.cost_type, total);
        }

        Ok(CostSummary {
            total_cost: sanitize_f64(total_cost),
            by_cost_type,
            sample_count,
            currency: "USD".to_string(),
        })
    }

    async fn providers_with_spend(
        &self,
        customer_id: Uuid,
        window: TimeWindow,
    ) -> TelemetryResult<Vec<CloudProvider>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT DISTINCT provider::text AS provider
            FROM cost_metrics
            WHERE customer_id = $1
              AND "timestamp" >= $2 AND "timestamp" < $3
            "#,
            [customer_id.into(), window.since.into(), window.until.into()],
        );

        let rows = ProviderRow::find_by_statement(stmt).all(&self.db).await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.provider.parse().ok())
            .collect())
    }
}
