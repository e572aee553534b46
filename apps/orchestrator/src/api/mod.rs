//! Route composition for the orchestrator HTTP surface.

pub mod agents;
pub mod approvals;
pub mod collect;
pub mod dashboard;
pub mod events;
pub mod health;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

pub fn routes(state: &AppState) -> Router {
    let credentials_router =
        domain_credentials::handlers::router(state.credentials.clone());

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        // Agent lifecycle
        .route("/agents/register", post(agents::register))
        .route("/agents/{id}/heartbeat", post(agents::heartbeat))
        .route("/agents/{id}", delete(agents::unregister))
        .route("/agents", get(agents::list))
        // Dashboard aggregation
        .route("/api/v1/dashboard", get(dashboard::dashboard))
        // Collection triggers
        .route("/api/v1/collect/trigger", post(collect::trigger))
        .route("/api/v1/collect/status", get(collect::status))
        .route("/api/v1/collect/history/{id}", get(collect::history))
        // Approval fan-out (agents call this; the orchestrator owns peer
        // coupling)
        .route("/api/v1/approvals/gather", post(approvals::gather))
        // Recommendations + events
        .route("/api/v1/recommendations", get(events::recommendations))
        .route("/api/v1/events", get(events::events))
        // Credential verification probe; lives under collect because it
        // exercises the adapter registry
        .route(
            "/api/v1/collect/verify/{provider}",
            post(collect::verify_credential),
        )
        .with_state(state.clone())
        // The credentials router carries its own service state
        .nest("/api/v1/credentials", credentials_router)
}
