//! SeaORM entities for the workflow tables.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{StepRecord, StepStatus, WorkflowExecution, WorkflowStatus};

pub mod executions {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "workflow_executions")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(column_type = "String(StringLen::N(255))")]
        pub workflow_type: String,
        pub customer_id: Uuid,
        pub agent_id: Option<Uuid>,
        pub recommendation_id: Option<Uuid>,
        pub status: WorkflowStatus,
        pub last_completed_step: i32,
        #[sea_orm(column_type = "JsonBinary")]
        pub context: serde_json::Value,
        pub started_at: DateTimeWithTimeZone,
        pub completed_at: Option<DateTimeWithTimeZone>,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod steps {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "workflow_steps")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub execution_id: Uuid,
        pub step_index: i32,
        #[sea_orm(column_type = "String(StringLen::N(255))")]
        pub step_name: String,
        pub status: StepStatus,
        #[sea_orm(column_type = "JsonBinary")]
        pub input: serde_json::Value,
        #[sea_orm(column_type = "JsonBinary")]
        pub output: serde_json::Value,
        #[sea_orm(column_type = "JsonBinary")]
        pub undo: serde_json::Value,
        #[sea_orm(column_type = "Text", nullable)]
        pub error: Option<String>,
        pub started_at: DateTimeWithTimeZone,
        pub completed_at: Option<DateTimeWithTimeZone>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod transitions {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "workflow_state_transitions")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub execution_id: Uuid,
        #[sea_orm(column_type = "String(StringLen::N(64))")]
        pub from_status: String,
        #[sea_orm(column_type = "String(StringLen::N(64))")]
        pub to_status: String,
        #[sea_orm(column_type = "Text", nullable)]
        pub detail: Option<String>,
        pub created_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod artifacts {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "workflow_artifacts")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub execution_id: Uuid,
        pub step_id: Option<Uuid>,
        #[sea_orm(column_type = "String(StringLen::N(64))")]
        pub artifact_kind: String,
        #[sea_orm(column_type = "JsonBinary")]
        pub content: serde_json::Value,
        pub created_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<executions::Model> for WorkflowExecution {
    fn from(model: executions::Model) -> Self {
        Self {
            id: model.id,
            workflow_type: model.workflow_type,
            customer_id: model.customer_id,
            agent_id: model.agent_id,
            recommendation_id: model.recommendation_id,
            status: model.status,
            last_completed_step: model.last_completed_step,
            context: model.context,
            started_at: model.started_at.into(),
            completed_at: model.completed_at.map(Into::into),
        }
    }
}

impl From<steps::Model> for StepRecord {
    fn from(model: steps::Model) -> Self {
        Self {
            id: model.id,
            execution_id: model.execution_id,
            step_index: model.step_index,
            step_name: model.step_name,
            status: model.status,
            input: model.input,
            output: model.output,
            undo: model.undo,
            error: model.error,
            started_at: model.started_at.into(),
            completed_at: model.completed_at.map(Into::into),
        }
    }
}
