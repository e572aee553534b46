use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Cloud provider enumeration
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
    Hash,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "cloud_provider")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CloudProvider {
    #[default]
    #[sea_orm(string_value = "aws")]
    Aws,
    #[sea_orm(string_value = "gcp")]
    Gcp,
    #[sea_orm(string_value = "azure")]
    Azure,
    #[sea_orm(string_value = "vultr")]
    Vultr,
    #[sea_orm(string_value = "runpod")]
    Runpod,
}

/// The four telemetry data types
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
    Hash,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "data_type")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DataType {
    #[sea_orm(string_value = "cost")]
    Cost,
    #[sea_orm(string_value = "performance")]
    Performance,
    #[sea_orm(string_value = "resource")]
    Resource,
    #[sea_orm(string_value = "application")]
    Application,
}

impl DataType {
    pub const ALL: [DataType; 4] = [
        DataType::Cost,
        DataType::Performance,
        DataType::Resource,
        DataType::Application,
    ];

    /// Name of the time-series table this data type lands in
    pub fn table_name(&self) -> &'static str {
        match self {
            DataType::Cost => "cost_metrics",
            DataType::Performance => "performance_metrics",
            DataType::Resource => "resource_metrics",
            DataType::Application => "application_metrics",
        }
    }
}

/// Half-open collection window `[since, until)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimeWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self { since, until }
    }

    /// Window ending now and reaching back the given number of hours
    pub fn last_hours(hours: i64) -> Self {
        let until = Utc::now();
        Self {
            since: until - chrono::Duration::hours(hours),
            until,
        }
    }
}

/// One spend event per resource
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CostMetricRow {
    /// Event time as reported by the provider
    pub timestamp: DateTime<Utc>,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    #[serde(default)]
    pub instance_id: String,
    pub cost_type: String,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub resource_type: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Latency/throughput/utilization sample
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PerformanceMetricRow {
    pub timestamp: DateTime<Utc>,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    pub metric_name: String,
    pub metric_value: f64,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// Inventory + utilization sample
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResourceMetricRow {
    pub timestamp: DateTime<Utc>,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub resource_type: String,
    pub metric_name: String,
    pub metric_value: f64,
}

/// Quality/hallucination/toxicity sample
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationMetricRow {
    pub timestamp: DateTime<Utc>,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    #[serde(default)]
    pub application_id: String,
    pub metric_type: String,
    pub score: f64,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub prompt_text: String,
    #[serde(default)]
    pub response_text: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A typed batch of adapter output destined for one time-series table
#[derive(Debug, Clone)]
pub enum MetricBatch {
    Cost(Vec<CostMetricRow>),
    Performance(Vec<PerformanceMetricRow>),
    Resource(Vec<ResourceMetricRow>),
    Application(Vec<ApplicationMetricRow>),
}

impl MetricBatch {
    pub fn data_type(&self) -> DataType {
        match self {
            MetricBatch::Cost(_) => DataType::Cost,
            MetricBatch::Performance(_) => DataType::Performance,
            MetricBatch::Resource(_) => DataType::Resource,
            MetricBatch::Application(_) => DataType::Application,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MetricBatch::Cost(rows) => rows.len(),
            MetricBatch::Performance(rows) => rows.len(),
            MetricBatch::Resource(rows) => rows.len(),
            MetricBatch::Application(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn empty_for(data_type: DataType) -> Self {
        match data_type {
            DataType::Cost => MetricBatch::Cost(Vec::new()),
            DataType::Performance => MetricBatch::Performance(Vec::new()),
            DataType::Resource => MetricBatch::Resource(Vec::new()),
            DataType::Application => MetricBatch::Application(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_cloud_provider_roundtrip() {
        assert_eq!(CloudProvider::Runpod.to_string(), "runpod");
        assert_eq!(CloudProvider::from_str("vultr").unwrap(), CloudProvider::Vultr);
        assert!(CloudProvider::from_str("digitalocean").is_err());
    }

    #[test]
    fn test_data_type_table_names() {
        assert_eq!(DataType::Cost.table_name(), "cost_metrics");
        assert_eq!(DataType::Application.table_name(), "application_metrics");
    }

    #[test]
    fn test_time_window_last_hours() {
        let window = TimeWindow::last_hours(24);
        let span = window.until - window.since;
        assert_eq!(span.num_hours(), 24);
    }

    #[test]
    fn test_metric_batch_len() {
        let batch = MetricBatch::empty_for(DataType::Performance);
        assert!(batch.is_empty());
        assert_eq!(batch.data_type(), DataType::Performance);
    }
}
