//! Agent lifecycle endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use axum_helpers::ValidatedJson;
use domain_agents::{Agent, AgentResult, RegisterAgent};
use uuid::Uuid;

use crate::state::AppState;

/// Register an agent at startup
#[utoipa::path(
    post,
    path = "/agents/register",
    request_body = RegisterAgent,
    responses(
        (status = 201, description = "Agent registered", body = Agent)
    ),
    tag = "agents"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<RegisterAgent>,
) -> AgentResult<(StatusCode, Json<Agent>)> {
    let agent = state.lifecycle.register(input).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

/// Periodic heartbeat; missed heartbeats past the grace factor mark the
/// agent unhealthy
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AgentResult<Json<Agent>> {
    let agent = state.lifecycle.heartbeat(id).await?;
    Ok(Json(agent))
}

/// Unregister on shutdown
pub async fn unregister(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AgentResult<StatusCode> {
    state.lifecycle.unregister(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// All non-terminated agents
pub async fn list(State(state): State<AppState>) -> AgentResult<Json<Vec<Agent>>> {
    let agents = state.lifecycle.list().await?;
    Ok(Json(agents))
}
