//! Agent lifecycle service: registration, heartbeat, reaping, and the
//! cached endpoint directory the orchestrator routes through.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use observability::AgentMetrics;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AgentError, AgentResult};
use crate::models::{Agent, AgentStatus, AgentType, RegisterAgent};
use crate::repository::{AgentRepository, EventLog};

/// Missed heartbeats past this factor of the interval mark an agent
/// unhealthy.
const HEARTBEAT_GRACE_FACTOR: i32 = 3;

/// Endpoint cache TTL; short so a re-registered agent is routable quickly.
const ENDPOINT_CACHE_TTL_S: u64 = 10;

pub struct AgentLifecycleService {
    agents: Arc<dyn AgentRepository>,
    events: Arc<dyn EventLog>,
    endpoint_cache: Cache<AgentType, Arc<Agent>>,
}

impl AgentLifecycleService {
    pub fn new(agents: Arc<dyn AgentRepository>, events: Arc<dyn EventLog>) -> Self {
        Self {
            agents,
            events,
            endpoint_cache: Cache::builder()
                .max_capacity(16)
                .time_to_live(Duration::from_secs(ENDPOINT_CACHE_TTL_S))
                .build(),
        }
    }

    /// Register an agent: status starts at `registered` and flips to
    /// `active` on the first heartbeat.
    pub async fn register(&self, input: RegisterAgent) -> AgentResult<Agent> {
        let agent = self.agents.insert(input).await?;

        self.events
            .append(
                None,
                Some(agent.id),
                "agent.registered",
                json!({
                    "agent_type": agent.agent_type,
                    "endpoint": agent.endpoint,
                    "heartbeat_interval_s": agent.heartbeat_interval_s,
                }),
            )
            .await?;

        self.endpoint_cache.invalidate(&agent.agent_type).await;

        info!(
            agent_id = %agent.id,
            agent_type = %agent.agent_type,
            endpoint = %agent.endpoint,
            "Agent registered"
        );

        Ok(agent)
    }

    /// Record a heartbeat; recovery from `unhealthy` emits an event.
    pub async fn heartbeat(&self, id: Uuid) -> AgentResult<Agent> {
        let before = self
            .agents
            .get(id)
            .await?
            .ok_or_else(|| AgentError::NotFound(id.to_string()))?;

        let agent = self.agents.record_heartbeat(id, Utc::now()).await?;
        AgentMetrics::record_heartbeat(&agent.agent_type.to_string());

        if before.status == AgentStatus::Unhealthy {
            self.events
                .append(
                    None,
                    Some(id),
                    "agent.recovered",
                    json!({ "agent_type": agent.agent_type }),
                )
                .await?;
            info!(agent_id = %id, "Agent recovered from unhealthy");
        }

        Ok(agent)
    }

    /// Unregister on shutdown: terminal, the row stays for audit.
    pub async fn unregister(&self, id: Uuid) -> AgentResult<()> {
        let agent = self
            .agents
            .get(id)
            .await?
            .ok_or_else(|| AgentError::NotFound(id.to_string()))?;

        self.agents.set_status(id, AgentStatus::Terminated).await?;
        self.endpoint_cache.invalidate(&agent.agent_type).await;

        self.events
            .append(
                None,
                Some(id),
                "agent.terminated",
                json!({ "agent_type": agent.agent_type }),
            )
            .await?;

        info!(agent_id = %id, agent_type = %agent.agent_type, "Agent unregistered");
        Ok(())
    }

    /// One reaper cycle: agents silent past the grace factor go unhealthy.
    /// Returns how many were reaped.
    pub async fn reap_stale(&self) -> AgentResult<usize> {
        let stale = self.agents.stale_agents(HEARTBEAT_GRACE_FACTOR).await?;
        let reaped = stale.len();

        for agent in stale {
            if let Err(e) = self
                .agents
                .set_status(agent.id, AgentStatus::Unhealthy)
                .await
            {
                warn!(agent_id = %agent.id, error = %e, "Failed to mark agent unhealthy");
                continue;
            }

            AgentMetrics::record_reaped(&agent.agent_type.to_string());
            self.endpoint_cache.invalidate(&agent.agent_type).await;

            self.events
                .append(
                    None,
                    Some(agent.id),
                    "agent.unhealthy",
                    json!({
                        "agent_type": agent.agent_type,
                        "last_heartbeat_at": agent.last_heartbeat_at,
                    }),
                )
                .await?;

            warn!(
                agent_id = %agent.id,
                agent_type = %agent.agent_type,
                "Agent marked unhealthy after missed heartbeats"
            );
        }

        Ok(reaped)
    }

    /// All non-terminated agents (dashboard view)
    pub async fn list(&self) -> AgentResult<Vec<Agent>> {
        self.agents.list().await
    }

    /// The routable agent of a type, through the TTL cache. Picks the
    /// active agent with the freshest heartbeat.
    pub async fn route_to(&self, agent_type: AgentType) -> AgentResult<Arc<Agent>> {
        if let Some(agent) = self.endpoint_cache.get(&agent_type).await {
            return Ok(agent);
        }

        let agent = self
            .agents
            .list_active_by_type(agent_type)
            .await?
            .into_iter()
            .next()
            .map(Arc::new)
            .ok_or_else(|| AgentError::NotFound(format!("no active {agent_type} agent")))?;

        self.endpoint_cache.insert(agent_type, agent.clone()).await;
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CapabilitySpec;
    use crate::repository::{MockAgentRepository, MockEventLog};
    use mockall::predicate::eq;

    fn agent(status: AgentStatus) -> Agent {
        Agent {
            id: Uuid::new_v4(),
            agent_type: AgentType::Cost,
            status,
            endpoint: "http://cost-agent:8081".to_string(),
            capabilities: vec![CapabilitySpec {
                name: "cost_analysis".to_string(),
                version: "1.0".to_string(),
            }],
            heartbeat_interval_s: 1,
            last_heartbeat_at: None,
            registered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_register_emits_event() {
        let mut agents = MockAgentRepository::new();
        agents
            .expect_insert()
            .returning(|_| Ok(agent(AgentStatus::Registered)));

        let mut events = MockEventLog::new();
        events
            .expect_append()
            .withf(|_, _, event_type, _| event_type == "agent.registered")
            .times(1)
            .returning(|customer_id, agent_id, event_type, payload| {
                Ok(crate::models::Event {
                    id: Uuid::new_v4(),
                    customer_id,
                    agent_id,
                    event_type: event_type.to_string(),
                    payload,
                    created_at: Utc::now(),
                })
            });

        let service = AgentLifecycleService::new(Arc::new(agents), Arc::new(events));
        let registered = service
            .register(RegisterAgent {
                agent_type: AgentType::Cost,
                endpoint: "http://cost-agent:8081".to_string(),
                capabilities: vec![],
                heartbeat_interval_s: 30,
            })
            .await
            .unwrap();

        assert_eq!(registered.status, AgentStatus::Registered);
    }

    #[tokio::test]
    async fn test_reap_marks_stale_unhealthy() {
        let stale = agent(AgentStatus::Active);
        let stale_id = stale.id;

        let mut agents = MockAgentRepository::new();
        agents
            .expect_stale_agents()
            .with(eq(HEARTBEAT_GRACE_FACTOR))
            .returning(move |_| Ok(vec![stale.clone()]));
        agents
            .expect_set_status()
            .with(eq(stale_id), eq(AgentStatus::Unhealthy))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut events = MockEventLog::new();
        events
            .expect_append()
            .withf(|_, _, event_type, _| event_type == "agent.unhealthy")
            .times(1)
            .returning(|customer_id, agent_id, event_type, payload| {
                Ok(crate::models::Event {
                    id: Uuid::new_v4(),
                    customer_id,
                    agent_id,
                    event_type: event_type.to_string(),
                    payload,
                    created_at: Utc::now(),
                })
            });

        let service = AgentLifecycleService::new(Arc::new(agents), Arc::new(events));
        let reaped = service.reap_stale().await.unwrap();
        assert_eq!(reaped, 1);
    }

    #[tokio::test]
    async fn test_heartbeat_recovery_emits_event() {
        let unhealthy = agent(AgentStatus::Unhealthy);
        let id = unhealthy.id;
        let mut recovered = unhealthy.clone();
        recovered.status = AgentStatus::Active;

        let mut agents = MockAgentRepository::new();
        let unhealthy_clone = unhealthy.clone();
        agents
            .expect_get()
            .returning(move |_| Ok(Some(unhealthy_clone.clone())));
        agents
            .expect_record_heartbeat()
            .returning(move |_, _| Ok(recovered.clone()));

        let mut events = MockEventLog::new();
        events
            .expect_append()
            .withf(|_, _, event_type, _| event_type == "agent.recovered")
            .times(1)
            .returning(|customer_id, agent_id, event_type, payload| {
                Ok(crate::models::Event {
                    id: Uuid::new_v4(),
                    customer_id,
                    agent_id,
                    event_type: event_type.to_string(),
                    payload,
                    created_at: Utc::now(),
                })
            });

        let service = AgentLifecycleService::new(Arc::new(agents), Arc::new(events));
        let after = service.heartbeat(id).await.unwrap();
        assert_eq!(after.status, AgentStatus::Active);
    }
}
