use crate::models::{ApplicationMetricRow, CloudProvider};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

/// Sea-ORM Entity for the application_metrics table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "application_metrics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeWithTimeZone,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    #[sea_orm(column_type = "Text")]
    pub application_id: String,
    #[sea_orm(column_type = "Text")]
    pub metric_type: String,
    pub score: f64,
    #[sea_orm(column_type = "Text")]
    pub model_name: String,
    #[sea_orm(column_type = "Text")]
    pub prompt_text: String,
    #[sea_orm(column_type = "Text")]
    pub response_text: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: serde_json::Value,
    pub collected_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<ApplicationMetricRow> for ActiveModel {
    fn from(row: ApplicationMetricRow) -> Self {
        ActiveModel {
            id: Set(Uuid::now_v7()),
            timestamp: Set(row.timestamp.into()),
            customer_id: Set(row.customer_id),
            provider: Set(row.provider),
            application_id: Set(row.application_id),
            metric_type: Set(row.metric_type),
            score: Set(row.score),
            model_name: Set(row.model_name),
            prompt_text: Set(row.prompt_text),
            response_text: Set(row.response_text),
            metadata: Set(row.metadata),
            collected_at: Set(chrono::Utc::now().into()),
        }
    }
}

impl From<Model> for ApplicationMetricRow {
    fn from(model: Model) -> Self {
        Self {
            timestamp: model.timestamp.into(),
            customer_id: model.customer_id,
            provider: model.provider,
            application_id: model.application_id,
            metric_type: model.metric_type,
            score: model.score,
            model_name: model.model_name,
            prompt_text: model.prompt_text,
            response_text: model.response_text,
            metadata: model.metadata,
        }
    }
}
