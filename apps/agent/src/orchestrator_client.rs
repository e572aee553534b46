//! The agent's client side of the orchestrator contract: registration,
//! heartbeat loop, unregistration, approval fan-out, and collection
//! trigger proxying.

use std::time::Duration;

use async_trait::async_trait;
use domain_agents::{Agent, AgentType, ApprovalVote, CapabilitySpec, Recommendation};
use domain_workflows::PeerApprover;
use eyre::WrapErr;
use reqwest::Client;
use serde_json::json;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct OrchestratorClient {
    http: Client,
    base_url: String,
}

impl OrchestratorClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Register with the orchestrator, retrying until it is reachable.
    pub async fn register(
        &self,
        agent_type: AgentType,
        endpoint: &str,
        capabilities: Vec<CapabilitySpec>,
        heartbeat_interval_s: i32,
    ) -> eyre::Result<Agent> {
        let body = json!({
            "type": agent_type,
            "endpoint": endpoint,
            "capabilities": capabilities,
            "heartbeat_interval_s": heartbeat_interval_s,
        });

        let url = format!("{}/agents/register", self.base_url);

        // The orchestrator may still be starting; retry with a fixed pause
        for attempt in 1..=30u32 {
            match self.http.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    let agent: Agent = response
                        .json()
                        .await
                        .wrap_err("malformed registration response")?;
                    info!(agent_id = %agent.id, "Registered with orchestrator");
                    return Ok(agent);
                }
                Ok(response) => {
                    return Err(eyre::eyre!(
                        "orchestrator rejected registration: {}",
                        response.status()
                    ));
                }
                Err(e) => {
                    warn!(attempt = attempt, error = %e, "Orchestrator unreachable, retrying");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }

        Err(eyre::eyre!("orchestrator unreachable after 30 attempts"))
    }

    /// Heartbeat loop; runs until shutdown is signalled.
    pub async fn heartbeat_loop(
        &self,
        agent_id: Uuid,
        interval_s: i32,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let url = format!("{}/agents/{}/heartbeat", self.base_url, agent_id);
        let mut ticker =
            tokio::time::interval(Duration::from_secs(interval_s.max(1) as u64));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.http.post(&url).send().await {
                        error!(error = %e, "Heartbeat delivery failed");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    }

    /// Unregister on shutdown.
    pub async fn unregister(&self, agent_id: Uuid) {
        let url = format!("{}/agents/{}", self.base_url, agent_id);
        if let Err(e) = self.http.delete(&url).send().await {
            warn!(error = %e, "Unregister call failed");
        }
    }

    /// Proxy an on-demand collection trigger to the orchestrator.
    pub async fn trigger_collection(
        &self,
        body: serde_json::Value,
    ) -> Result<(reqwest::StatusCode, serde_json::Value), reqwest::Error> {
        let url = format!("{}/api/v1/collect/trigger", self.base_url);
        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        let body = response.json().await.unwrap_or(json!({}));
        Ok((status, body))
    }
}

/// PeerApprover backed by the orchestrator's fan-out endpoint. The
/// orchestrator owns peer coupling; the engine only sees votes.
pub struct OrchestratorApprover {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl OrchestratorApprover {
    pub fn new(client: Client, base_url: impl Into<String>, timeout_s: u64) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            // One deadline per peer plus slack for the fan-out itself
            timeout: Duration::from_secs(timeout_s * 4),
        }
    }
}

#[async_trait]
impl PeerApprover for OrchestratorApprover {
    async fn gather_votes(&self, recommendation: &Recommendation) -> Vec<ApprovalVote> {
        let url = format!("{}/api/v1/approvals/gather", self.base_url);

        let result = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&json!({ "recommendation_id": recommendation.id }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                #[derive(serde::Deserialize)]
                struct Gathered {
                    votes: Vec<ApprovalVote>,
                }
                response
                    .json::<Gathered>()
                    .await
                    .map(|g| g.votes)
                    .unwrap_or_default()
            }
            Ok(response) => {
                error!(status = %response.status(), "Approval fan-out rejected");
                Vec::new()
            }
            Err(e) => {
                error!(error = %e, "Approval fan-out failed");
                Vec::new()
            }
        }
    }
}
