use crate::models::{CloudProvider, PerformanceMetricRow};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

/// Sea-ORM Entity for the performance_metrics table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "performance_metrics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeWithTimeZone,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    #[sea_orm(column_type = "Text")]
    pub metric_name: String,
    pub metric_value: f64,
    #[sea_orm(column_type = "Text")]
    pub resource_id: String,
    /// JSON-encoded tags
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: serde_json::Value,
    pub collected_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<PerformanceMetricRow> for ActiveModel {
    fn from(row: PerformanceMetricRow) -> Self {
        ActiveModel {
            id: Set(Uuid::now_v7()),
            timestamp: Set(row.timestamp.into()),
            customer_id: Set(row.customer_id),
            provider: Set(row.provider),
            metric_name: Set(row.metric_name),
            metric_value: Set(row.metric_value),
            resource_id: Set(row.resource_id),
            tags: Set(serde_json::to_value(row.tags).unwrap_or_default()),
            collected_at: Set(chrono::Utc::now().into()),
        }
    }
}

impl From<Model> for PerformanceMetricRow {
    fn from(model: Model) -> Self {
        let tags = serde_json::from_value(model.tags).unwrap_or_default();
        Self {
            timestamp: model.timestamp.into(),
            customer_id: model.customer_id,
            provider: model.provider,
            metric_name: model.metric_name,
            metric_value: model.metric_value,
            resource_id: model.resource_id,
            tags,
        }
    }
}
