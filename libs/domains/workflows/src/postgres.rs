use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde_json::Value;
use uuid::Uuid;

use crate::entity::{artifacts, executions, steps, transitions};
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{StepRecord, StepStatus, WorkflowExecution, WorkflowStatus};
use crate::repository::WorkflowRepository;

/// PostgreSQL implementation of WorkflowRepository
#[derive(Clone)]
pub struct PgWorkflowRepository {
    db: DatabaseConnection,
}

impl PgWorkflowRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_execution(&self, id: Uuid) -> WorkflowResult<executions::Model> {
        executions::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl WorkflowRepository for PgWorkflowRepository {
    async fn create_execution(
        &self,
        workflow_type: &str,
        customer_id: Uuid,
        agent_id: Option<Uuid>,
        recommendation_id: Option<Uuid>,
        context: Value,
    ) -> WorkflowResult<WorkflowExecution> {
        let now = Utc::now();
        let model = executions::ActiveModel {
            id: Set(Uuid::now_v7()),
            workflow_type: Set(workflow_type.to_string()),
            customer_id: Set(customer_id),
            agent_id: Set(agent_id),
            recommendation_id: Set(recommendation_id),
            status: Set(WorkflowStatus::Pending),
            last_completed_step: Set(-1),
            context: Set(context),
            started_at: Set(now.into()),
            completed_at: Set(None),
            updated_at: Set(now.into()),
        };
        let result = model.insert(&self.db).await?.into();
        Ok(result)
    }

    async fn get_execution(&self, id: Uuid) -> WorkflowResult<Option<WorkflowExecution>> {
        let result = executions::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Into::into);
        Ok(result)
    }

    async fn list_executions(
        &self,
        customer_id: Uuid,
        limit: u64,
    ) -> WorkflowResult<Vec<WorkflowExecution>> {
        let results = executions::Entity::find()
            .filter(executions::Column::CustomerId.eq(customer_id))
            .order_by_desc(executions::Column::StartedAt)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(results)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: WorkflowStatus,
        detail: Option<String>,
    ) -> WorkflowResult<()> {
        let txn = self.db.begin().await?;

        let existing = executions::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))?;
        let from_status = existing.status;

        let transition = transitions::ActiveModel {
            id: Set(Uuid::now_v7()),
            execution_id: Set(id),
            from_status: Set(from_status.to_string()),
            to_status: Set(status.to_string()),
            detail: Set(detail),
            created_at: Set(Utc::now().into()),
        };
        transition.insert(&txn).await?;

        let mut model: executions::ActiveModel = existing.into();
        model.status = Set(status);
        if status.is_terminal() {
            model.completed_at = Set(Some(Utc::now().into()));
        }
        model.updated_at = Set(Utc::now().into());
        model.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    async fn checkpoint(&self, id: Uuid, last_completed_step: i32) -> WorkflowResult<()> {
        let existing = self.find_execution(id).await?;
        let mut model: executions::ActiveModel = existing.into();
        model.last_completed_step = Set(last_completed_step);
        model.updated_at = Set(Utc::now().into());
        model.update(&self.db).await?;
        Ok(())
    }

    async fn merge_context(&self, id: Uuid, patch: Value) -> WorkflowResult<()> {
        let existing = self.find_execution(id).await?;

        let mut context = existing.context.clone();
        if let (Some(context_map), Some(patch_map)) = (context.as_object_mut(), patch.as_object())
        {
            for (key, value) in patch_map {
                context_map.insert(key.clone(), value.clone());
            }
        }

        let mut model: executions::ActiveModel = existing.into();
        model.context = Set(context);
        model.updated_at = Set(Utc::now().into());
        model.update(&self.db).await?;
        Ok(())
    }

    async fn start_step(
        &self,
        execution_id: Uuid,
        step_index: i32,
        step_name: &str,
        input: Value,
    ) -> WorkflowResult<StepRecord> {
        let model = steps::ActiveModel {
            id: Set(Uuid::now_v7()),
            execution_id: Set(execution_id),
            step_index: Set(step_index),
            step_name: Set(step_name.to_string()),
            status: Set(StepStatus::Running),
            input: Set(input),
            output: Set(serde_json::json!({})),
            undo: Set(serde_json::json!({})),
            error: Set(None),
            started_at: Set(Utc::now().into()),
            completed_at: Set(None),
        };
        let result = model.insert(&self.db).await?.into();
        Ok(result)
    }

    async fn finish_step(
        &self,
        step_id: Uuid,
        status: StepStatus,
        output: Value,
        undo: Value,
        error: Option<String>,
    ) -> WorkflowResult<()> {
        let existing = steps::Entity::find_by_id(step_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("step {step_id}")))?;

        let mut model: steps::ActiveModel = existing.into();
        model.status = Set(status);
        model.output = Set(output);
        model.undo = Set(undo);
        model.error = Set(error);
        model.completed_at = Set(Some(Utc::now().into()));
        model.update(&self.db).await?;
        Ok(())
    }

    async fn steps_for(&self, execution_id: Uuid) -> WorkflowResult<Vec<StepRecord>> {
        let results = steps::Entity::find()
            .filter(steps::Column::ExecutionId.eq(execution_id))
            .order_by_asc(steps::Column::StepIndex)
            .order_by_asc(steps::Column::StartedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(results)
    }

    async fn save_artifact(
        &self,
        execution_id: Uuid,
        step_id: Option<Uuid>,
        artifact_kind: &str,
        content: Value,
    ) -> WorkflowResult<Uuid> {
        let id = Uuid::now_v7();
        let model = artifacts::ActiveModel {
            id: Set(id),
            execution_id: Set(execution_id),
            step_id: Set(step_id),
            artifact_kind: Set(artifact_kind.to_string()),
            content: Set(content),
            created_at: Set(Utc::now().into()),
        };
        model.insert(&self.db).await?;
        Ok(id)
    }
}
