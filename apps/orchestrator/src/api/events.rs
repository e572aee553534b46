//! Event log and recommendation listing endpoints.

use axum::extract::{Query, State};
use axum::Json;
use domain_agents::{AgentResult, Event, Recommendation, RecommendationStatus};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::state::AppState;

const DEFAULT_LIMIT: u64 = 50;

#[derive(Debug, Deserialize, IntoParams)]
pub struct EventsQuery {
    pub customer_id: Option<Uuid>,
    pub limit: Option<u64>,
}

/// Recent events, newest first
pub async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> AgentResult<Json<Vec<Event>>> {
    let events = state
        .events
        .list_recent(query.customer_id, query.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;
    Ok(Json(events))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RecommendationsQuery {
    pub customer_id: Uuid,
    pub status: Option<RecommendationStatus>,
    pub limit: Option<u64>,
}

/// Recommendations for a customer, newest first
pub async fn recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendationsQuery>,
) -> AgentResult<Json<Vec<Recommendation>>> {
    let recommendations = state
        .optimizations
        .list_recommendations(
            query.customer_id,
            query.status,
            query.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await?;
    Ok(Json(recommendations))
}
