//! Entities for agents and their satellite tables. The satellite rows
//! cascade on agent deletion at the schema level.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{
    Agent, AgentRunStatus, AgentStatus, AgentType, CapabilitySpec, ConfigValueType, MetricKind,
};

pub mod agents {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "agents")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub agent_type: AgentType,
        pub status: AgentStatus,
        #[sea_orm(column_type = "String(StringLen::N(512))")]
        pub endpoint: String,
        #[sea_orm(column_type = "JsonBinary")]
        pub capabilities: serde_json::Value,
        pub heartbeat_interval_s: i32,
        pub last_heartbeat_at: Option<DateTimeWithTimeZone>,
        pub registered_at: DateTimeWithTimeZone,
        pub terminated_at: Option<DateTimeWithTimeZone>,
        pub created_at: DateTimeWithTimeZone,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod agent_states {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "agent_states")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub agent_id: Uuid,
        pub current_status: AgentRunStatus,
        #[sea_orm(column_type = "JsonBinary")]
        pub active_workflow_ids: serde_json::Value,
        #[sea_orm(column_type = "JsonBinary")]
        pub held_resource_locks: serde_json::Value,
        #[sea_orm(column_type = "JsonBinary")]
        pub state: serde_json::Value,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod agent_configs {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "agent_configs")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub agent_id: Uuid,
        #[sea_orm(column_type = "String(StringLen::N(255))")]
        pub config_key: String,
        pub value_type: ConfigValueType,
        #[sea_orm(column_type = "JsonBinary")]
        pub value: serde_json::Value,
        pub created_at: DateTimeWithTimeZone,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod agent_capabilities {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "agent_capabilities")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub agent_id: Uuid,
        #[sea_orm(column_type = "String(StringLen::N(255))")]
        pub capability_name: String,
        #[sea_orm(column_type = "String(StringLen::N(64))")]
        pub version: String,
        pub enabled: bool,
        pub created_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod agent_metrics {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "agent_metrics")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub agent_id: Uuid,
        #[sea_orm(column_type = "String(StringLen::N(255))")]
        pub metric_name: String,
        pub metric_kind: MetricKind,
        pub value: f64,
        #[sea_orm(column_type = "JsonBinary")]
        pub tags: serde_json::Value,
        pub recorded_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<agents::Model> for Agent {
    fn from(model: agents::Model) -> Self {
        let capabilities: Vec<CapabilitySpec> =
            serde_json::from_value(model.capabilities).unwrap_or_default();

        Self {
            id: model.id,
            agent_type: model.agent_type,
            status: model.status,
            endpoint: model.endpoint,
            capabilities,
            heartbeat_interval_s: model.heartbeat_interval_s,
            last_heartbeat_at: model.last_heartbeat_at.map(Into::into),
            registered_at: model.registered_at.into(),
        }
    }
}
