use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::entity::agent::{agent_capabilities, agent_configs, agent_metrics, agent_states, agents};
use crate::entity::{events, optimization};
use crate::error::{AgentError, AgentResult};
use crate::models::{
    Agent, AgentRunStatus, AgentStatus, AgentType, ApprovalVote, ConfigValue,
    CreateRecommendation, Event, MetricKind, Optimization, OptimizationOutcome, Recommendation,
    RecommendationStatus, RegisterAgent,
};
use crate::repository::{AgentRepository, EventLog, OptimizationRepository};

/// PostgreSQL implementation of AgentRepository
#[derive(Clone)]
pub struct PgAgentRepository {
    db: DatabaseConnection,
}

impl PgAgentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find(&self, id: Uuid) -> AgentResult<agents::Model> {
        agents::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AgentError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl AgentRepository for PgAgentRepository {
    async fn insert(&self, input: RegisterAgent) -> AgentResult<Agent> {
        let txn = self.db.begin().await?;
        let now = Utc::now();
        let agent_id = Uuid::now_v7();

        let agent = agents::ActiveModel {
            id: Set(agent_id),
            agent_type: Set(input.agent_type),
            status: Set(AgentStatus::Registered),
            endpoint: Set(input.endpoint),
            capabilities: Set(serde_json::to_value(&input.capabilities).unwrap_or_default()),
            heartbeat_interval_s: Set(input.heartbeat_interval_s),
            last_heartbeat_at: Set(None),
            registered_at: Set(now.into()),
            terminated_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let agent = agent.insert(&txn).await?;

        let state = agent_states::ActiveModel {
            agent_id: Set(agent_id),
            current_status: Set(AgentRunStatus::Idle),
            active_workflow_ids: Set(json!([])),
            held_resource_locks: Set(json!([])),
            state: Set(json!({})),
            updated_at: Set(now.into()),
        };
        state.insert(&txn).await?;

        for capability in &input.capabilities {
            let row = agent_capabilities::ActiveModel {
                id: Set(Uuid::now_v7()),
                agent_id: Set(agent_id),
                capability_name: Set(capability.name.clone()),
                version: Set(capability.version.clone()),
                enabled: Set(true),
                created_at: Set(now.into()),
            };
            row.insert(&txn).await?;
        }

        txn.commit().await?;
        Ok(agent.into())
    }

    async fn get(&self, id: Uuid) -> AgentResult<Option<Agent>> {
        let result = agents::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Into::into);
        Ok(result)
    }

    async fn list(&self) -> AgentResult<Vec<Agent>> {
        let results = agents::Entity::find()
            .filter(agents::Column::Status.ne(AgentStatus::Terminated))
            .order_by_desc(agents::Column::RegisteredAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(results)
    }

    async fn list_active_by_type(&self, agent_type: AgentType) -> AgentResult<Vec<Agent>> {
        let results = agents::Entity::find()
            .filter(agents::Column::AgentType.eq(agent_type))
            .filter(agents::Column::Status.eq(AgentStatus::Active))
            .order_by_desc(agents::Column::LastHeartbeatAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(results)
    }

    async fn record_heartbeat(&self, id: Uuid, at: DateTime<Utc>) -> AgentResult<Agent> {
        let existing = self.find(id).await?;

        if existing.status == AgentStatus::Terminated {
            return Err(AgentError::InvalidTransition(format!(
                "agent {id} is terminated"
            )));
        }

        let mut model: agents::ActiveModel = existing.into();
        model.last_heartbeat_at = Set(Some(at.into()));
        // First heartbeat activates; a resumed heartbeat recovers from
        // unhealthy.
        model.status = Set(AgentStatus::Active);
        model.updated_at = Set(Utc::now().into());

        let updated = model.update(&self.db).await?;
        Ok(updated.into())
    }

    async fn set_status(&self, id: Uuid, status: AgentStatus) -> AgentResult<()> {
        let existing = self.find(id).await?;
        let mut model: agents::ActiveModel = existing.into();
        model.status = Set(status);
        if status == AgentStatus::Terminated {
            model.terminated_at = Set(Some(Utc::now().into()));
        }
        model.updated_at = Set(Utc::now().into());
        model.update(&self.db).await?;
        Ok(())
    }

    async fn stale_agents(&self, grace_factor: i32) -> AgentResult<Vec<Agent>> {
        // Interval arithmetic against a per-row column needs raw SQL
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT id FROM agents
            WHERE status = 'active'
              AND last_heartbeat_at IS NOT NULL
              AND last_heartbeat_at < NOW() - (heartbeat_interval_s * $1) * interval '1 second'
            "#,
            [grace_factor.into()],
        );

        #[derive(FromQueryResult)]
        struct IdRow {
            id: Uuid,
        }

        let ids: Vec<Uuid> = IdRow::find_by_statement(stmt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = agents::Entity::find()
            .filter(agents::Column::Id.is_in(ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(results)
    }

    async fn set_run_status(&self, agent_id: Uuid, status: AgentRunStatus) -> AgentResult<()> {
        let existing = agent_states::Entity::find_by_id(agent_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AgentError::NotFound(format!("state for {agent_id}")))?;

        let mut model: agent_states::ActiveModel = existing.into();
        model.current_status = Set(status);
        model.updated_at = Set(Utc::now().into());
        model.update(&self.db).await?;
        Ok(())
    }

    async fn try_acquire_lock(&self, agent_id: Uuid, resource: &str) -> AgentResult<bool> {
        let txn = self.db.begin().await?;

        // Serialize competing acquirers on the resource name for the
        // duration of the transaction.
        txn.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_advisory_xact_lock(hashtext($1))",
            [resource.into()],
        ))
        .await?;

        let holder = txn
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT agent_id FROM agent_states WHERE held_resource_locks @> $1::jsonb",
                [serde_json::to_string(&json!([resource])).unwrap().into()],
            ))
            .await?;

        if let Some(row) = holder {
            let holder_id: Uuid = row
                .try_get("", "agent_id")
                .map_err(|e| AgentError::Internal(e.to_string()))?;
            txn.commit().await?;
            // Re-acquiring a lock the agent already holds is fine
            return Ok(holder_id == agent_id);
        }

        txn.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE agent_states
            SET held_resource_locks = held_resource_locks || $1::jsonb,
                updated_at = NOW()
            WHERE agent_id = $2
            "#,
            [
                serde_json::to_string(&json!([resource])).unwrap().into(),
                agent_id.into(),
            ],
        ))
        .await?;

        txn.commit().await?;
        Ok(true)
    }

    async fn release_lock(&self, agent_id: Uuid, resource: &str) -> AgentResult<()> {
        self.db
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                UPDATE agent_states
                SET held_resource_locks = held_resource_locks - $1,
                    updated_at = NOW()
                WHERE agent_id = $2
                "#,
                [resource.into(), agent_id.into()],
            ))
            .await?;
        Ok(())
    }

    async fn add_active_workflow(&self, agent_id: Uuid, workflow_id: Uuid) -> AgentResult<()> {
        self.db
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                UPDATE agent_states
                SET active_workflow_ids = active_workflow_ids || $1::jsonb,
                    updated_at = NOW()
                WHERE agent_id = $2
                "#,
                [
                    serde_json::to_string(&json!([workflow_id])).unwrap().into(),
                    agent_id.into(),
                ],
            ))
            .await?;
        Ok(())
    }

    async fn remove_active_workflow(&self, agent_id: Uuid, workflow_id: Uuid) -> AgentResult<()> {
        self.db
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                UPDATE agent_states
                SET active_workflow_ids = active_workflow_ids - $1,
                    updated_at = NOW()
                WHERE agent_id = $2
                "#,
                [workflow_id.to_string().into(), agent_id.into()],
            ))
            .await?;
        Ok(())
    }

    async fn set_config(&self, agent_id: Uuid, key: &str, value: ConfigValue) -> AgentResult<()> {
        let existing = agent_configs::Entity::find()
            .filter(agent_configs::Column::AgentId.eq(agent_id))
            .filter(agent_configs::Column::ConfigKey.eq(key))
            .one(&self.db)
            .await?;

        let value_type = value.value_type();
        let value_json = serde_json::to_value(&value)
            .map_err(|e| AgentError::InvalidInput(format!("config value: {e}")))?;

        match existing {
            Some(model) => {
                let mut model: agent_configs::ActiveModel = model.into();
                model.value_type = Set(value_type);
                model.value = Set(value_json);
                model.updated_at = Set(Utc::now().into());
                model.update(&self.db).await?;
            }
            None => {
                let now = Utc::now();
                let model = agent_configs::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    agent_id: Set(agent_id),
                    config_key: Set(key.to_string()),
                    value_type: Set(value_type),
                    value: Set(value_json),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                model.insert(&self.db).await?;
            }
        }

        Ok(())
    }

    async fn get_config(&self, agent_id: Uuid, key: &str) -> AgentResult<Option<ConfigValue>> {
        let result = agent_configs::Entity::find()
            .filter(agent_configs::Column::AgentId.eq(agent_id))
            .filter(agent_configs::Column::ConfigKey.eq(key))
            .one(&self.db)
            .await?;

        Ok(result.and_then(|model| serde_json::from_value(model.value).ok()))
    }

    async fn record_metric(
        &self,
        agent_id: Uuid,
        metric_name: &str,
        kind: MetricKind,
        value: f64,
        tags: Value,
    ) -> AgentResult<()> {
        let model = agent_metrics::ActiveModel {
            id: Set(Uuid::now_v7()),
            agent_id: Set(agent_id),
            metric_name: Set(metric_name.to_string()),
            metric_kind: Set(kind),
            value: Set(value),
            tags: Set(tags),
            recorded_at: Set(Utc::now().into()),
        };
        model.insert(&self.db).await?;
        Ok(())
    }
}

/// PostgreSQL implementation of EventLog
#[derive(Clone)]
pub struct PgEventLog {
    db: DatabaseConnection,
}

impl PgEventLog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventLog for PgEventLog {
    async fn append(
        &self,
        customer_id: Option<Uuid>,
        agent_id: Option<Uuid>,
        event_type: &str,
        payload: Value,
    ) -> AgentResult<Event> {
        let model = events::ActiveModel {
            id: Set(Uuid::now_v7()),
            customer_id: Set(customer_id),
            agent_id: Set(agent_id),
            event_type: Set(event_type.to_string()),
            payload: Set(payload),
            created_at: Set(Utc::now().into()),
        };
        let result = model.insert(&self.db).await?.into();
        Ok(result)
    }

    async fn list_recent(
        &self,
        customer_id: Option<Uuid>,
        limit: u64,
    ) -> AgentResult<Vec<Event>> {
        let mut query = events::Entity::find();
        if let Some(customer_id) = customer_id {
            query = query.filter(events::Column::CustomerId.eq(customer_id));
        }

        let results = query
            .order_by_desc(events::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(results)
    }
}

/// PostgreSQL implementation of OptimizationRepository
#[derive(Clone)]
pub struct PgOptimizationRepository {
    db: DatabaseConnection,
}

impl PgOptimizationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OptimizationRepository for PgOptimizationRepository {
    async fn create_recommendation(
        &self,
        input: CreateRecommendation,
    ) -> AgentResult<Recommendation> {
        let now = Utc::now();
        let model = optimization::recommendations::ActiveModel {
            id: Set(Uuid::now_v7()),
            optimization_id: Set(Uuid::new_v4()),
            customer_id: Set(input.customer_id),
            agent_type: Set(input.agent_type),
            recommendation_type: Set(input.recommendation_type),
            title: Set(input.title),
            description: Set(input.description),
            estimated_savings_pct: Set(input.estimated_savings_pct),
            status: Set(RecommendationStatus::Pending),
            payload: Set(input.payload),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let result = model.insert(&self.db).await?.into();
        Ok(result)
    }

    async fn get_recommendation(&self, id: Uuid) -> AgentResult<Option<Recommendation>> {
        let result = optimization::recommendations::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Into::into);
        Ok(result)
    }

    async fn list_recommendations(
        &self,
        customer_id: Uuid,
        status: Option<RecommendationStatus>,
        limit: u64,
    ) -> AgentResult<Vec<Recommendation>> {
        let mut query = optimization::recommendations::Entity::find()
            .filter(optimization::recommendations::Column::CustomerId.eq(customer_id));

        if let Some(status) = status {
            query = query.filter(optimization::recommendations::Column::Status.eq(status));
        }

        let results = query
            .order_by_desc(optimization::recommendations::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(results)
    }

    async fn set_recommendation_status(
        &self,
        id: Uuid,
        status: RecommendationStatus,
    ) -> AgentResult<()> {
        let existing = optimization::recommendations::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AgentError::RecordNotFound(format!("recommendation {id}")))?;

        let mut model: optimization::recommendations::ActiveModel = existing.into();
        model.status = Set(status);
        model.updated_at = Set(Utc::now().into());
        model.update(&self.db).await?;
        Ok(())
    }

    async fn record_vote(&self, recommendation_id: Uuid, vote: ApprovalVote) -> AgentResult<()> {
        if !(0.0..=1.0).contains(&vote.confidence) {
            return Err(AgentError::InvalidInput(format!(
                "confidence {} outside [0, 1]",
                vote.confidence
            )));
        }

        // Repeated votes from the same peer overwrite
        let existing = optimization::approvals::Entity::find()
            .filter(optimization::approvals::Column::RecommendationId.eq(recommendation_id))
            .filter(
                optimization::approvals::Column::ApprovingAgentType
                    .eq(vote.approving_agent_type),
            )
            .one(&self.db)
            .await?;

        match existing {
            Some(model) => {
                let mut model: optimization::approvals::ActiveModel = model.into();
                model.approved = Set(vote.approved);
                model.confidence = Set(vote.confidence);
                model.rationale = Set(vote.rationale);
                model.update(&self.db).await?;
            }
            None => {
                let model = optimization::approvals::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    recommendation_id: Set(recommendation_id),
                    approving_agent_type: Set(vote.approving_agent_type),
                    approved: Set(vote.approved),
                    confidence: Set(vote.confidence),
                    rationale: Set(vote.rationale),
                    created_at: Set(Utc::now().into()),
                };
                model.insert(&self.db).await?;
            }
        }

        Ok(())
    }

    async fn list_votes(&self, recommendation_id: Uuid) -> AgentResult<Vec<ApprovalVote>> {
        let results = optimization::approvals::Entity::find()
            .filter(optimization::approvals::Column::RecommendationId.eq(recommendation_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(results)
    }

    async fn record_optimization(
        &self,
        recommendation_id: Uuid,
        outcome: OptimizationOutcome,
        detail: Value,
    ) -> AgentResult<Optimization> {
        let txn = self.db.begin().await?;

        let recommendation = optimization::recommendations::Entity::find_by_id(recommendation_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AgentError::RecordNotFound(format!("recommendation {recommendation_id}"))
            })?;

        let now = Utc::now();
        let model = optimization::optimizations::ActiveModel {
            id: Set(Uuid::now_v7()),
            optimization_id: Set(recommendation.optimization_id),
            recommendation_id: Set(recommendation_id),
            customer_id: Set(recommendation.customer_id),
            optimization_type: Set(recommendation.recommendation_type.clone()),
            outcome: Set(outcome),
            detail: Set(detail),
            executed_at: Set(now.into()),
            completed_at: Set(Some(now.into())),
        };
        let result = model.insert(&txn).await?;

        let mut recommendation: optimization::recommendations::ActiveModel =
            recommendation.into();
        recommendation.status = Set(RecommendationStatus::Executed);
        recommendation.updated_at = Set(now.into());
        recommendation.update(&txn).await?;

        txn.commit().await?;
        Ok(result.into())
    }

    async fn get_optimization(&self, optimization_id: Uuid) -> AgentResult<Option<Optimization>> {
        let result = optimization::optimizations::Entity::find()
            .filter(optimization::optimizations::Column::OptimizationId.eq(optimization_id))
            .one(&self.db)
            .await?
            .map(Into::into);
        Ok(result)
    }
}
