//! Batched writer for the time-series tables.
//!
//! Contract:
//! - **Idempotent**: a row matching an existing series key (customer,
//!   provider, timestamp, metric name, resource) overwrites the value and
//!   refreshes `collected_at`; it never duplicates.
//! - **Atomic per batch**: all validated rows of one call land in a single
//!   transaction or none do.
//! - **Per-row validation**: malformed rows are rejected and accounted for;
//!   the rest of the batch continues.

use async_trait::async_trait;
use observability::CollectionMetrics;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use tracing::{debug, warn};

use crate::entity::{application, cost, performance, resource};
use crate::error::TelemetryResult;
use crate::models::{DataType, MetricBatch};

/// Outcome of one writer call
#[derive(Debug, Clone, Default)]
pub struct WriteOutcome {
    /// Rows that landed (inserted or overwritten)
    pub written: usize,
    /// Rows rejected by validation
    pub rejected: usize,
    /// One entry per rejected row
    pub errors: Vec<String>,
}

impl WriteOutcome {
    /// True when some rows were rejected but others landed
    pub fn is_partial(&self) -> bool {
        self.rejected > 0 && self.written > 0
    }
}

/// Writer trait for time-series batches
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsWriter: Send + Sync {
    async fn write_batch(&self, batch: MetricBatch) -> TelemetryResult<WriteOutcome>;
}

/// PostgreSQL implementation of MetricsWriter
#[derive(Clone)]
pub struct PgMetricsWriter {
    db: DatabaseConnection,
}

impl PgMetricsWriter {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetricsWriter for PgMetricsWriter {
    async fn write_batch(&self, batch: MetricBatch) -> TelemetryResult<WriteOutcome> {
        let data_type = batch.data_type();
        let table = data_type.table_name();

        let outcome = match batch {
            MetricBatch::Cost(rows) => {
                let (valid, outcome) = split_valid(rows, validate_cost);
                let models: Vec<cost::ActiveModel> = valid.into_iter().map(Into::into).collect();
                let written = if models.is_empty() {
                    0
                } else {
                    let txn = self.db.begin().await?;
                    let written = cost::Entity::insert_many(models)
                        .on_conflict(
                            OnConflict::columns([
                                cost::Column::CustomerId,
                                cost::Column::Provider,
                                cost::Column::Timestamp,
                                cost::Column::CostType,
                                cost::Column::InstanceId,
                            ])
                            .update_columns([
                                cost::Column::Amount,
                                cost::Column::Currency,
                                cost::Column::ResourceType,
                                cost::Column::CollectedAt,
                            ])
                            .to_owned(),
                        )
                        .exec_without_returning(&txn)
                        .await?;
                    txn.commit().await?;
                    written as usize
                };
                WriteOutcome { written, ..outcome }
            }
            MetricBatch::Performance(rows) => {
                let (valid, outcome) = split_valid(rows, validate_performance);
                let models: Vec<performance::ActiveModel> =
                    valid.into_iter().map(Into::into).collect();
                let written = if models.is_empty() {
                    0
                } else {
                    let txn = self.db.begin().await?;
                    let written = performance::Entity::insert_many(models)
                        .on_conflict(
                            OnConflict::columns([
                                performance::Column::CustomerId,
                                performance::Column::Provider,
                                performance::Column::Timestamp,
                                performance::Column::MetricName,
                                performance::Column::ResourceId,
                            ])
                            .update_columns([
                                performance::Column::MetricValue,
                                performance::Column::Tags,
                                performance::Column::CollectedAt,
                            ])
                            .to_owned(),
                        )
                        .exec_without_returning(&txn)
                        .await?;
                    txn.commit().await?;
                    written as usize
                };
                WriteOutcome { written, ..outcome }
            }
            MetricBatch::Resource(rows) => {
                let (valid, outcome) = split_valid(rows, validate_resource);
                let models: Vec<resource::ActiveModel> =
                    valid.into_iter().map(Into::into).collect();
                let written = if models.is_empty() {
                    0
                } else {
                    let txn = self.db.begin().await?;
                    let written = resource::Entity::insert_many(models)
                        .on_conflict(
                            OnConflict::columns([
                                resource::Column::CustomerId,
                                resource::Column::Provider,
                                resource::Column::Timestamp,
                                resource::Column::MetricName,
                                resource::Column::ResourceId,
                            ])
                            .update_columns([
                                resource::Column::ResourceType,
                                resource::Column::MetricValue,
                                resource::Column::CollectedAt,
                            ])
                            .to_owned(),
                        )
                        .exec_without_returning(&txn)
                        .await?;
                    txn.commit().await?;
                    written as usize
                };
                WriteOutcome { written, ..outcome }
            }
            MetricBatch::Application(rows) => {
                let (valid, outcome) = split_valid(rows, validate_application);
                let models: Vec<application::ActiveModel> =
                    valid.into_iter().map(Into::into).collect();
                let written = if models.is_empty() {
                    0
                } else {
                    let txn = self.db.begin().await?;
                    let written = application::Entity::insert_many(models)
                        .on_conflict(
                            OnConflict::columns([
                                application::Column::CustomerId,
                                application::Column::Provider,
                                application::Column::Timestamp,
                                application::Column::MetricType,
                                application::Column::ApplicationId,
                            ])
                            .update_columns([
                                application::Column::Score,
                                application::Column::ModelName,
                                application::Column::PromptText,
                                application::Column::ResponseText,
                                application::Column::Metadata,
                                application::Column::CollectedAt,
                            ])
                            .to_owned(),
                        )
                        .exec_without_returning(&txn)
                        .await?;
                    txn.commit().await?;
                    written as usize
                };
                WriteOutcome { written, ..outcome }
            }
        };

        CollectionMetrics::record_rows_written(table, outcome.written);
        CollectionMetrics::record_rows_rejected(table, outcome.rejected);

        if outcome.rejected > 0 {
            warn!(
                table = table,
                written = outcome.written,
                rejected = outcome.rejected,
                "Writer rejected rows during validation"
            );
        } else {
            debug!(
                table = table,
                written = outcome.written,
                "Writer batch landed"
            );
        }

        Ok(outcome)
    }
}

fn split_valid<T>(
    rows: Vec<T>,
    validate: impl Fn(&T) -> Result<(), String>,
) -> (Vec<T>, WriteOutcome) {
    let mut valid = Vec::with_capacity(rows.len());
    let mut outcome = WriteOutcome::default();

    for (index, row) in rows.into_iter().enumerate() {
        match validate(&row) {
            Ok(()) => valid.push(row),
            Err(reason) => {
                outcome.rejected += 1;
                outcome.errors.push(format!("row {index}: {reason}"));
            }
        }
    }

    (valid, outcome)
}

fn validate_cost(row: &crate::models::CostMetricRow) -> Result<(), String> {
    if !row.amount.is_finite() {
        return Err(format!("non-finite amount {}", row.amount));
    }
    if row.cost_type.is_empty() {
        return Err("empty cost_type".to_string());
    }
    if row.currency.len() != 3 {
        return Err(format!("invalid currency '{}'", row.currency));
    }
    Ok(())
}

fn validate_performance(row: &crate::models::PerformanceMetricRow) -> Result<(), String> {
    if !row.metric_value.is_finite() {
        return Err(format!("non-finite metric_value {}", row.metric_value));
    }
    if row.metric_name.is_empty() {
        return Err("empty metric_name".to_string());
    }
    Ok(())
}

fn validate_resource(row: &crate::models::ResourceMetricRow) -> Result<(), String> {
    if !row.metric_value.is_finite() {
        return Err(format!("non-finite metric_value {}", row.metric_value));
    }
    if row.metric_name.is_empty() {
        return Err("empty metric_name".to_string());
    }
    Ok(())
}

fn validate_application(row: &crate::models::ApplicationMetricRow) -> Result<(), String> {
    if !row.score.is_finite() {
        return Err(format!("non-finite score {}", row.score));
    }
    if row.metric_type.is_empty() {
        return Err("empty metric_type".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CloudProvider, CostMetricRow, PerformanceMetricRow};
    use chrono::Utc;
    use uuid::Uuid;

    fn cost_row(amount: f64) -> CostMetricRow {
        CostMetricRow {
            timestamp: Utc::now(),
            customer_id: Uuid::new_v4(),
            provider: CloudProvider::Runpod,
            instance_id: "pod-1".to_string(),
            cost_type: "compute".to_string(),
            amount,
            currency: "USD".to_string(),
            resource_type: "gpu".to_string(),
        }
    }

    #[test]
    fn test_validate_cost_rejects_non_finite() {
        assert!(validate_cost(&cost_row(1.25)).is_ok());
        assert!(validate_cost(&cost_row(f64::NAN)).is_err());
        assert!(validate_cost(&cost_row(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_validate_cost_rejects_bad_currency() {
        let mut row = cost_row(1.0);
        row.currency = "DOLLARS".to_string();
        assert!(validate_cost(&row).is_err());
    }

    #[test]
    fn test_validate_performance_rejects_empty_name() {
        let row = PerformanceMetricRow {
            timestamp: Utc::now(),
            customer_id: Uuid::new_v4(),
            provider: CloudProvider::Aws,
            metric_name: String::new(),
            metric_value: 0.5,
            resource_id: String::new(),
            tags: Default::default(),
        };
        assert!(validate_performance(&row).is_err());
    }

    #[test]
    fn test_split_valid_accounts_rejects() {
        let rows = vec![cost_row(1.0), cost_row(f64::NAN), cost_row(2.0)];
        let (valid, outcome) = split_valid(rows, validate_cost);
        assert_eq!(valid.len(), 2);
        assert_eq!(outcome.rejected, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("row 1"));
    }

    #[test]
    fn test_write_outcome_partial() {
        let outcome = WriteOutcome {
            written: 2,
            rejected: 1,
            errors: vec!["row 1: bad".to_string()],
        };
        assert!(outcome.is_partial());
    }
}
