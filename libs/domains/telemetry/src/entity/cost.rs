use crate::models::{CloudProvider, CostMetricRow};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

/// Sea-ORM Entity for the cost_metrics table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cost_metrics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeWithTimeZone,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    #[sea_orm(column_type = "Text")]
    pub instance_id: String,
    #[sea_orm(column_type = "Text")]
    pub cost_type: String,
    pub amount: f64,
    #[sea_orm(column_type = "String(StringLen::N(3))")]
    pub currency: String,
    #[sea_orm(column_type = "Text")]
    pub resource_type: String,
    pub collected_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<CostMetricRow> for ActiveModel {
    fn from(row: CostMetricRow) -> Self {
        ActiveModel {
            id: Set(Uuid::now_v7()),
            timestamp: Set(row.timestamp.into()),
            customer_id: Set(row.customer_id),
            provider: Set(row.provider),
            instance_id: Set(row.instance_id),
            cost_type: Set(row.cost_type),
            amount: Set(row.amount),
            currency: Set(row.currency),
            resource_type: Set(row.resource_type),
            collected_at: Set(chrono::Utc::now().into()),
        }
    }
}

impl From<Model> for CostMetricRow {
    fn from(model: Model) -> Self {
        Self {
            timestamp: model.timestamp.into(),
            customer_id: model.customer_id,
            provider: model.provider,
            instance_id: model.instance_id,
            cost_type: model.cost_type,
            amount: model.amount,
            currency: model.currency,
            resource_type: model.resource_type,
        }
    }
}
