//! Peer approval fan-out.
//!
//! Agents never call each other directly; the proposing agent asks the
//! orchestrator to gather votes, and the orchestrator calls each peer's
//! `/{domain}/approve` endpoint with a deadline. A peer that times out or
//! errors simply casts no vote, which the approval policy treats as
//! blocking (mean confidence over cast votes only, but missing voters
//! show up in the detail).

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use domain_agents::{AgentError, AgentResult, ApprovalVote, Recommendation};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct GatherRequest {
    pub recommendation_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GatherResponse {
    pub votes: Vec<ApprovalVote>,
    /// Peers that failed to vote before the deadline
    pub unreachable: Vec<String>,
}

/// Fan out to peer agents and collect their votes
pub async fn gather(
    State(state): State<AppState>,
    Json(request): Json<GatherRequest>,
) -> AgentResult<Json<GatherResponse>> {
    let recommendation = state
        .optimizations
        .get_recommendation(request.recommendation_id)
        .await?
        .ok_or_else(|| {
            AgentError::RecordNotFound(format!("recommendation {}", request.recommendation_id))
        })?;

    let response = gather_votes(&state, &recommendation).await;

    // Persist the votes so the approvals table always matches what the
    // engine will evaluate
    for vote in &response.votes {
        state
            .optimizations
            .record_vote(recommendation.id, vote.clone())
            .await?;
    }

    info!(
        recommendation_id = %recommendation.id,
        votes = response.votes.len(),
        unreachable = response.unreachable.len(),
        "Approval fan-out complete"
    );

    Ok(Json(response))
}

/// The fan-out itself, shared with the dashboard-free internal callers
pub async fn gather_votes(state: &AppState, recommendation: &Recommendation) -> GatherResponse {
    let deadline = Duration::from_secs(state.config.rollout.approval_timeout_s);
    let peers = recommendation.agent_type.peers();

    let requests = peers.iter().map(|peer| {
        let state = state.clone();
        let recommendation = recommendation.clone();
        let peer = *peer;
        async move {
            let agent = match state.lifecycle.route_to(peer).await {
                Ok(agent) => agent,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "No routable peer for approval");
                    return Err(peer.to_string());
                }
            };

            let url = format!(
                "{}/{}/approve",
                agent.endpoint.trim_end_matches('/'),
                peer
            );

            let result = state
                .http
                .post(&url)
                .timeout(deadline)
                .json(&recommendation)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    match response.json::<ApprovalVote>().await {
                        Ok(vote) => Ok(vote),
                        Err(e) => {
                            warn!(peer = %peer, error = %e, "Malformed approval vote");
                            Err(peer.to_string())
                        }
                    }
                }
                Ok(response) => {
                    warn!(peer = %peer, status = %response.status(), "Peer rejected approval call");
                    Err(peer.to_string())
                }
                Err(e) => {
                    warn!(peer = %peer, error = %e, "Approval call failed or timed out");
                    Err(peer.to_string())
                }
            }
        }
    });

    let outcomes = join_all(requests).await;

    let mut votes = Vec::new();
    let mut unreachable = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(vote) => votes.push(vote),
            Err(peer) => unreachable.push(peer),
        }
    }

    GatherResponse { votes, unreachable }
}
