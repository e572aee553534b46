use chrono::{DateTime, Utc};
use domain_telemetry::{CloudProvider, DataType};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Status of one collection attempt.
///
/// `Running` exists because async triggers return the history id before
/// the run completes.
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
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "collection_status")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CollectionStatus {
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// An on-demand collection trigger
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CollectionRequest {
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    /// Empty means every data type the provider's adapters advertise
    #[serde(default)]
    pub data_types: Vec<DataType>,
    /// When true the trigger returns immediately with the history id
    #[serde(default)]
    pub async_mode: bool,
}

/// Outcome of one collection run, returned by synchronous triggers
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CollectionRunReport {
    pub history_id: Uuid,
    pub status: CollectionStatus,
    pub metrics_collected: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// One collection_history row
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    pub data_types: Vec<DataType>,
    pub status: CollectionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub metrics_collected: i32,
    pub error: Option<String>,
}

/// Result of an on-demand trigger: a finished report (sync) or the
/// history row to poll (async)
#[derive(Debug)]
pub enum TriggerOutcome {
    Completed(CollectionRunReport),
    Queued(HistoryRecord),
}

/// Persisted pagination state for one (customer, provider, data_type)
#[derive(Debug, Clone)]
pub struct CursorState {
    pub cursor: Option<String>,
    /// End of the last successfully collected window
    pub window_end: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_collection_status_roundtrip() {
        assert_eq!(CollectionStatus::Partial.to_string(), "partial");
        assert_eq!(
            CollectionStatus::from_str("success").unwrap(),
            CollectionStatus::Success
        );
    }

    #[test]
    fn test_collection_request_defaults() {
        let request: CollectionRequest = serde_json::from_value(serde_json::json!({
            "customer_id": Uuid::new_v4(),
            "provider": "runpod"
        }))
        .unwrap();
        assert!(request.data_types.is_empty());
        assert!(!request.async_mode);
    }
}
