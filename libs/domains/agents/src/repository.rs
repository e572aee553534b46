use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::AgentResult;
use crate::models::{
    Agent, AgentRunStatus, AgentStatus, ApprovalVote, ConfigValue, CreateRecommendation, Event,
    MetricKind, Optimization, OptimizationOutcome, Recommendation, RecommendationStatus,
    RegisterAgent,
};

/// Repository trait for the agent directory: lifecycle rows plus the
/// satellite config/state/capability/metric tables.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Insert the agent plus its 1:1 state row and capability rows
    async fn insert(&self, input: RegisterAgent) -> AgentResult<Agent>;

    async fn get(&self, id: Uuid) -> AgentResult<Option<Agent>>;

    /// All non-terminated agents
    async fn list(&self) -> AgentResult<Vec<Agent>>;

    /// Active agents of one type, newest heartbeat first
    async fn list_active_by_type(&self, agent_type: crate::models::AgentType)
        -> AgentResult<Vec<Agent>>;

    /// Update last_heartbeat_at; transitions registered/unhealthy → active
    async fn record_heartbeat(&self, id: Uuid, at: DateTime<Utc>) -> AgentResult<Agent>;

    async fn set_status(&self, id: Uuid, status: AgentStatus) -> AgentResult<()>;

    /// Active agents whose last heartbeat is older than
    /// `grace_factor * heartbeat_interval_s`
    async fn stale_agents(&self, grace_factor: i32) -> AgentResult<Vec<Agent>>;

    // --- agent_states ---

    async fn set_run_status(&self, agent_id: Uuid, status: AgentRunStatus) -> AgentResult<()>;

    /// Atomically add a resource lock; false when another agent holds it
    async fn try_acquire_lock(&self, agent_id: Uuid, resource: &str) -> AgentResult<bool>;

    async fn release_lock(&self, agent_id: Uuid, resource: &str) -> AgentResult<()>;

    async fn add_active_workflow(&self, agent_id: Uuid, workflow_id: Uuid) -> AgentResult<()>;

    async fn remove_active_workflow(&self, agent_id: Uuid, workflow_id: Uuid) -> AgentResult<()>;

    // --- agent_configs ---

    async fn set_config(&self, agent_id: Uuid, key: &str, value: ConfigValue) -> AgentResult<()>;

    async fn get_config(&self, agent_id: Uuid, key: &str) -> AgentResult<Option<ConfigValue>>;

    // --- agent_metrics ---

    async fn record_metric(
        &self,
        agent_id: Uuid,
        metric_name: &str,
        kind: MetricKind,
        value: f64,
        tags: Value,
    ) -> AgentResult<()>;
}

/// Append-only event log
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(
        &self,
        customer_id: Option<Uuid>,
        agent_id: Option<Uuid>,
        event_type: &str,
        payload: Value,
    ) -> AgentResult<Event>;

    async fn list_recent(
        &self,
        customer_id: Option<Uuid>,
        limit: u64,
    ) -> AgentResult<Vec<Event>>;
}

/// Repository for the recommendation → approval → optimization flow
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OptimizationRepository: Send + Sync {
    /// Insert a pending recommendation with a freshly minted optimization_id
    async fn create_recommendation(
        &self,
        input: CreateRecommendation,
    ) -> AgentResult<Recommendation>;

    async fn get_recommendation(&self, id: Uuid) -> AgentResult<Option<Recommendation>>;

    async fn list_recommendations(
        &self,
        customer_id: Uuid,
        status: Option<RecommendationStatus>,
        limit: u64,
    ) -> AgentResult<Vec<Recommendation>>;

    async fn set_recommendation_status(
        &self,
        id: Uuid,
        status: RecommendationStatus,
    ) -> AgentResult<()>;

    /// Record a peer vote (one per (recommendation, agent type))
    async fn record_vote(&self, recommendation_id: Uuid, vote: ApprovalVote) -> AgentResult<()>;

    async fn list_votes(&self, recommendation_id: Uuid) -> AgentResult<Vec<ApprovalVote>>;

    /// Record the executed optimization for an approved recommendation.
    /// Fails when the recommendation does not exist.
    async fn record_optimization(
        &self,
        recommendation_id: Uuid,
        outcome: OptimizationOutcome,
        detail: Value,
    ) -> AgentResult<Optimization>;

    async fn get_optimization(&self, optimization_id: Uuid) -> AgentResult<Option<Optimization>>;
}
