use chrono::{DateTime, Utc};
use domain_telemetry::CloudProvider;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a workflow execution
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "workflow_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "running")]
    Running,
    /// Paused awaiting approval or human intervention
    #[sea_orm(string_value = "waiting")]
    Waiting,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "rolled_back")]
    RolledBack,
}

impl WorkflowStatus {
    /// Completed and rolled-back runs are final; failed runs stay
    /// resumable from their checkpoint.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::RolledBack)
    }
}

/// Status of one step attempt
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
    enum_name = "workflow_step_status"
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "rolled_back")]
    RolledBack,
}

/// One workflow_executions row
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub workflow_type: String,
    pub customer_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub recommendation_id: Option<Uuid>,
    pub status: WorkflowStatus,
    /// Checkpoint: index into the expanded plan, -1 before any step lands
    pub last_completed_step: i32,
    pub context: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One workflow_steps row
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StepRecord {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub step_index: i32,
    pub step_name: String,
    pub status: StepStatus,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
    pub undo: serde_json::Value,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Everything a run needs besides the definition
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    pub agent_id: Uuid,
    pub recommendation_id: Uuid,
}

/// A workflow definition: a typed name, the resource the run must lock,
/// and the ordered steps. Steps themselves are trait objects supplied by
/// the owning agent.
pub struct WorkflowDefinition {
    pub workflow_type: String,
    /// Advisory-lock key; concurrent runs touching the same resource
    /// serialize on it
    pub resource: String,
    pub steps: Vec<std::sync::Arc<dyn crate::engine::WorkflowStep>>,
}

impl WorkflowDefinition {
    pub fn new(
        workflow_type: impl Into<String>,
        resource: impl Into<String>,
        steps: Vec<std::sync::Arc<dyn crate::engine::WorkflowStep>>,
    ) -> Self {
        Self {
            workflow_type: workflow_type.into(),
            resource: resource.into(),
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_status_terminality() {
        assert!(WorkflowStatus::Completed.is_terminal());
        assert!(WorkflowStatus::RolledBack.is_terminal());
        assert!(!WorkflowStatus::Waiting.is_terminal());
        assert!(!WorkflowStatus::Running.is_terminal());
        // failed runs resume from their checkpoint
        assert!(!WorkflowStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&WorkflowStatus::RolledBack).unwrap(),
            "\"rolled_back\""
        );
    }
}
