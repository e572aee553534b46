use crate::models::{CloudProvider, ResourceMetricRow};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

/// Sea-ORM Entity for the resource_metrics table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resource_metrics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeWithTimeZone,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    #[sea_orm(column_type = "Text")]
    pub resource_id: String,
    #[sea_orm(column_type = "Text")]
    pub resource_type: String,
    #[sea_orm(column_type = "Text")]
    pub metric_name: String,
    pub metric_value: f64,
    pub collected_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<ResourceMetricRow> for ActiveModel {
    fn from(row: ResourceMetricRow) -> Self {
        ActiveModel {
            id: Set(Uuid::now_v7()),
            timestamp: Set(row.timestamp.into()),
            customer_id: Set(row.customer_id),
            provider: Set(row.provider),
            resource_id: Set(row.resource_id),
            resource_type: Set(row.resource_type),
            metric_name: Set(row.metric_name),
            metric_value: Set(row.metric_value),
            collected_at: Set(chrono::Utc::now().into()),
        }
    }
}

impl From<Model> for ResourceMetricRow {
    fn from(model: Model) -> Self {
        Self {
            timestamp: model.timestamp.into(),
            customer_id: model.customer_id,
            provider: model.provider,
            resource_id: model.resource_id,
            resource_type: model.resource_type,
            metric_name: model.metric_name,
            metric_value: model.metric_value,
        }
    }
}
