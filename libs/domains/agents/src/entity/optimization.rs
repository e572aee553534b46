//! Entities for the recommendation → approval → optimization flow.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{
    AgentType, ApprovalVote, Optimization, OptimizationOutcome, Recommendation,
    RecommendationStatus,
};

pub mod recommendations {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "recommendations")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub optimization_id: Uuid,
        pub customer_id: Uuid,
        pub agent_type: AgentType,
        #[sea_orm(column_type = "String(StringLen::N(255))")]
        pub recommendation_type: String,
        #[sea_orm(column_type = "String(StringLen::N(512))")]
        pub title: String,
        #[sea_orm(column_type = "Text")]
        pub description: String,
        pub estimated_savings_pct: Option<f64>,
        pub status: RecommendationStatus,
        #[sea_orm(column_type = "JsonBinary")]
        pub payload: serde_json::Value,
        pub created_at: DateTimeWithTimeZone,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod approvals {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "approvals")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub recommendation_id: Uuid,
        pub approving_agent_type: AgentType,
        pub approved: bool,
        pub confidence: f64,
        #[sea_orm(column_type = "Text")]
        pub rationale: String,
        pub created_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod optimizations {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "optimizations")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub optimization_id: Uuid,
        pub recommendation_id: Uuid,
        pub customer_id: Uuid,
        #[sea_orm(column_type = "String(StringLen::N(255))")]
        pub optimization_type: String,
        pub outcome: OptimizationOutcome,
        #[sea_orm(column_type = "JsonBinary")]
        pub detail: serde_json::Value,
        pub executed_at: DateTimeWithTimeZone,
        pub completed_at: Option<DateTimeWithTimeZone>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<recommendations::Model> for Recommendation {
    fn from(model: recommendations::Model) -> Self {
        Self {
            id: model.id,
            optimization_id: model.optimization_id,
            customer_id: model.customer_id,
            agent_type: model.agent_type,
            recommendation_type: model.recommendation_type,
            title: model.title,
            description: model.description,
            estimated_savings_pct: model.estimated_savings_pct,
            status: model.status,
            payload: model.payload,
            created_at: model.created_at.into(),
        }
    }
}

impl From<approvals::Model> for ApprovalVote {
    fn from(model: approvals::Model) -> Self {
        Self {
            approving_agent_type: model.approving_agent_type,
            approved: model.approved,
            confidence: model.confidence,
            rationale: model.rationale,
        }
    }
}

impl From<optimizations::Model> for Optimization {
    fn from(model: optimizations::Model) -> Self {
        Self {
            id: model.id,
            optimization_id: model.optimization_id,
            recommendation_id: model.recommendation_id,
            customer_id: model.customer_id,
            optimization_type: model.optimization_type,
            outcome: model.outcome,
            detail: model.detail,
            executed_at: model.executed_at.into(),
            completed_at: model.completed_at.map(Into::into),
        }
    }
}
