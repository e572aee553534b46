use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::WorkflowResult;
use crate::models::{StepRecord, StepStatus, WorkflowExecution, WorkflowStatus};

/// Repository trait for the durable workflow tables.
///
/// Every status change appends a `workflow_state_transitions` row; the
/// repository owns that bookkeeping so the engine can't forget it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn create_execution(
        &self,
        workflow_type: &str,
        customer_id: Uuid,
        agent_id: Option<Uuid>,
        recommendation_id: Option<Uuid>,
        context: Value,
    ) -> WorkflowResult<WorkflowExecution>;

    async fn get_execution(&self, id: Uuid) -> WorkflowResult<Option<WorkflowExecution>>;

    async fn list_executions(
        &self,
        customer_id: Uuid,
        limit: u64,
    ) -> WorkflowResult<Vec<WorkflowExecution>>;

    /// Transition the execution status, appending the transition row
    async fn set_status(
        &self,
        id: Uuid,
        status: WorkflowStatus,
        detail: Option<String>,
    ) -> WorkflowResult<()>;

    /// Persist the checkpoint after a completed plan entry
    async fn checkpoint(&self, id: Uuid, last_completed_step: i32) -> WorkflowResult<()>;

    /// Merge keys into the execution's context JSON
    async fn merge_context(&self, id: Uuid, patch: Value) -> WorkflowResult<()>;

    /// Open a step row in `running`
    async fn start_step(
        &self,
        execution_id: Uuid,
        step_index: i32,
        step_name: &str,
        input: Value,
    ) -> WorkflowResult<StepRecord>;

    /// Close a step row with its terminal status
    async fn finish_step(
        &self,
        step_id: Uuid,
        status: StepStatus,
        output: Value,
        undo: Value,
        error: Option<String>,
    ) -> WorkflowResult<()>;

    /// Steps of an execution ordered by index then start time
    async fn steps_for(&self, execution_id: Uuid) -> WorkflowResult<Vec<StepRecord>>;

    async fn save_artifact(
        &self,
        execution_id: Uuid,
        step_id: Option<Uuid>,
        artifact_kind: &str,
        content: Value,
    ) -> WorkflowResult<Uuid>;
}
