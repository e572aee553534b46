use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// The four agent domains
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "agent_type")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentType {
    #[sea_orm(string_value = "cost")]
    Cost,
    #[sea_orm(string_value = "performance")]
    Performance,
    #[sea_orm(string_value = "resource")]
    Resource,
    #[sea_orm(string_value = "application")]
    Application,
}

impl AgentType {
    pub const ALL: [AgentType; 4] = [
        AgentType::Cost,
        AgentType::Performance,
        AgentType::Resource,
        AgentType::Application,
    ];

    /// The three peers that vote on this agent's proposals
    pub fn peers(&self) -> Vec<AgentType> {
        Self::ALL.into_iter().filter(|t| t != self).collect()
    }
}

/// Lifecycle status of a registered agent
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "agent_status")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentStatus {
    #[sea_orm(string_value = "registered")]
    Registered,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "unhealthy")]
    Unhealthy,
    #[sea_orm(string_value = "terminated")]
    Terminated,
}

/// Work status in agent_states
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "agent_run_status")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentRunStatus {
    #[sea_orm(string_value = "idle")]
    Idle,
    #[sea_orm(string_value = "busy")]
    Busy,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "waiting")]
    Waiting,
    #[sea_orm(string_value = "error")]
    Error,
}

/// Status of a recommendation
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
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "recommendation_status"
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecommendationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "executed")]
    Executed,
}

/// Terminal outcome of an executed optimization
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
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "optimization_outcome"
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OptimizationOutcome {
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "rolled_back")]
    RolledBack,
}

/// One agent row
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Agent {
    pub id: Uuid,
    pub agent_type: AgentType,
    pub status: AgentStatus,
    pub endpoint: String,
    pub capabilities: Vec<CapabilitySpec>,
    pub heartbeat_interval_s: i32,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
}

/// A versioned capability advertised at registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CapabilitySpec {
    pub name: String,
    pub version: String,
}

/// Registration request body
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterAgent {
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    #[validate(length(min = 1, max = 512))]
    pub endpoint: String,
    #[serde(default)]
    pub capabilities: Vec<CapabilitySpec>,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_s: i32,
}

fn default_heartbeat_interval() -> i32 {
    30
}

/// Discriminant stored alongside a config value
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "config_value_type")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConfigValueType {
    #[sea_orm(string_value = "string")]
    String,
    #[sea_orm(string_value = "int")]
    Int,
    #[sea_orm(string_value = "float")]
    Float,
    #[sea_orm(string_value = "bool")]
    Bool,
    #[sea_orm(string_value = "json")]
    Json,
}

/// Kind of an agent operational metric sample
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "metric_kind")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MetricKind {
    #[sea_orm(string_value = "counter")]
    Counter,
    #[sea_orm(string_value = "gauge")]
    Gauge,
    #[sea_orm(string_value = "histogram")]
    Histogram,
}

/// Typed value in agent_configs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Json(serde_json::Value),
}

impl ConfigValue {
    pub fn value_type(&self) -> ConfigValueType {
        match self {
            ConfigValue::String(_) => ConfigValueType::String,
            ConfigValue::Int(_) => ConfigValueType::Int,
            ConfigValue::Float(_) => ConfigValueType::Float,
            ConfigValue::Bool(_) => ConfigValueType::Bool,
            ConfigValue::Json(_) => ConfigValueType::Json,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// A proposed optimization awaiting approval
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Recommendation {
    pub id: Uuid,
    pub optimization_id: Uuid,
    pub customer_id: Uuid,
    pub agent_type: AgentType,
    pub recommendation_type: String,
    pub title: String,
    pub description: String,
    pub estimated_savings_pct: Option<f64>,
    pub status: RecommendationStatus,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// DTO for proposing a recommendation
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRecommendation {
    pub customer_id: Uuid,
    pub agent_type: AgentType,
    #[validate(length(min = 1, max = 255))]
    pub recommendation_type: String,
    #[validate(length(min = 1, max = 512))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub estimated_savings_pct: Option<f64>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// A peer agent's vote on a recommendation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovalVote {
    pub approving_agent_type: AgentType,
    pub approved: bool,
    /// In [0, 1]
    pub confidence: f64,
    #[serde(default)]
    pub rationale: String,
}

/// An executed optimization
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Optimization {
    pub id: Uuid,
    pub optimization_id: Uuid,
    pub recommendation_id: Uuid,
    pub customer_id: Uuid,
    pub optimization_type: String,
    pub outcome: OptimizationOutcome,
    pub detail: serde_json::Value,
    pub executed_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One durable event-log row
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Event {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_type_peers() {
        let peers = AgentType::Cost.peers();
        assert_eq!(peers.len(), 3);
        assert!(!peers.contains(&AgentType::Cost));
    }

    #[test]
    fn test_config_value_typed_access() {
        assert_eq!(ConfigValue::Int(42).as_i64(), Some(42));
        assert_eq!(ConfigValue::Int(42).as_f64(), Some(42.0));
        assert_eq!(ConfigValue::Float(1.5).as_i64(), None);
        assert_eq!(ConfigValue::Bool(true).as_bool(), Some(true));
    }

    #[test]
    fn test_register_agent_defaults() {
        let body: RegisterAgent = serde_json::from_value(serde_json::json!({
            "type": "cost",
            "endpoint": "http://cost-agent:8081"
        }))
        .unwrap();
        assert_eq!(body.heartbeat_interval_s, 30);
        assert!(body.capabilities.is_empty());
    }
}
