use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_helpers::health::{run_health_checks, HealthCheckFuture};
use axum_helpers::health_handler;
use axum::response::Response;
use serde_json::Value;

use crate::state::AppState;

/// Liveness: always 200 while the process runs
pub async fn health() -> Response {
    health_handler().await
}

/// Readiness: pings the relational store
pub async fn ready(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let checks: Vec<(&str, HealthCheckFuture)> = vec![(
        "database",
        Box::pin(async {
            database::postgres::check_health(&state.db)
                .await
                .map_err(|e| e.to_string())
        }),
    )];

    run_health_checks(checks).await
}
