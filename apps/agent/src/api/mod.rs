//! Route composition for the agent HTTP surface.
//!
//! The domain read surface mounts under `/api/v2/{domain}` according to
//! the agent's type; the approve endpoint sits at `/{domain}/approve` per
//! the peer protocol.

pub mod optimize;
pub mod reads;

use axum::routing::{get, post};
use axum::{Json, Router};
use domain_agents::AgentType;
use serde_json::json;

use crate::approve;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router {
    let domain = state.agent_type.to_string();
    let domain_prefix = format!("/api/v2/{}", domain_segment(state.agent_type));

    let reads = match state.agent_type {
        AgentType::Cost => reads::cost_router(),
        AgentType::Performance => reads::performance_router(),
        AgentType::Resource => reads::resource_router(),
        AgentType::Application => reads::application_router(),
    };

    let domain_router = reads
        .route("/trigger-collection", post(optimize::trigger_collection))
        .route("/optimize", post(optimize::optimize));

    Router::new()
        .route("/health", get(axum_helpers::health_handler))
        .route("/api/v1/live", get(live))
        .nest(&domain_prefix, domain_router)
        .route(&format!("/{domain}/approve"), post(approve::approve))
        .with_state(state.clone())
}

/// Liveness with identity, used by the orchestrator's routing sanity
/// checks
async fn live(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    Json(json!({
        "agent_id": state.agent_id,
        "agent_type": state.agent_type,
        "status": "live",
    }))
}

/// URL segment for the domain (`costs`, `performance`, `resources`,
/// `applications`)
fn domain_segment(agent_type: AgentType) -> &'static str {
    match agent_type {
        AgentType::Cost => "costs",
        AgentType::Performance => "performance",
        AgentType::Resource => "resources",
        AgentType::Application => "applications",
    }
}
