//! Collection trigger, status, and credential verification endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain_collection::{
    CollectionError, CollectionRequest, CollectionResult, ScheduleStatus, TriggerOutcome,
};
use domain_telemetry::{CloudProvider, DataType};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::state::AppState;

/// Trigger an on-demand collection.
///
/// `async_mode=false` blocks until the run completes and returns the row
/// counts; `async_mode=true` returns 202 with the history id to poll.
#[utoipa::path(
    post,
    path = "/api/v1/collect/trigger",
    request_body = CollectionRequest,
    responses(
        (status = 200, description = "Synchronous run completed"),
        (status = 202, description = "Asynchronous run queued"),
        (status = 400, description = "Unknown provider or no adapter")
    ),
    tag = "collect"
)]
pub async fn trigger(
    State(state): State<AppState>,
    Json(request): Json<CollectionRequest>,
) -> CollectionResult<impl IntoResponse> {
    info!(
        customer_id = %request.customer_id,
        provider = %request.provider,
        async_mode = request.async_mode,
        "Collection trigger received"
    );

    match state.scheduler.trigger(request).await? {
        TriggerOutcome::Completed(report) => {
            Ok((StatusCode::OK, Json(json!(report))).into_response())
        }
        TriggerOutcome::Queued(record) => Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "history_id": record.id, "status": record.status })),
        )
            .into_response()),
    }
}

/// Scheduler status: registered adapters and enabled tuples
pub async fn status(State(state): State<AppState>) -> CollectionResult<Json<ScheduleStatus>> {
    let status = state.scheduler.status().await?;
    Ok(Json(status))
}

/// Fetch one collection_history row (used to poll async triggers)
pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> CollectionResult<impl IntoResponse> {
    let record = state
        .scheduler
        .history_record(id)
        .await?
        .ok_or_else(|| CollectionError::HistoryNotFound(id.to_string()))?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub customer_id: Uuid,
}

/// Round-trip probe against the provider; flips `is_verified` on the
/// newest credential for (customer, provider). Demo credentials verify
/// without a live probe.
pub async fn verify_credential(
    State(state): State<AppState>,
    Path(provider): Path<CloudProvider>,
    Query(query): Query<VerifyQuery>,
) -> CollectionResult<impl IntoResponse> {
    let credential = state
        .credentials
        .fetch_decrypted_for(query.customer_id, provider)
        .await?;

    let verified = if credential.metadata.demo {
        true
    } else {
        // Probe with the cost adapter first, falling back to any adapter
        // the provider advertises
        let adapter = DataType::ALL
            .into_iter()
            .find_map(|dt| state.scheduler.registry().get(provider, dt))
            .ok_or_else(|| CollectionError::NoAdapter(provider.to_string()))?;

        adapter.health_check(&credential).await.unwrap_or(false)
    };

    state
        .credentials
        .mark_verified(credential.id, verified)
        .await?;

    info!(
        customer_id = %query.customer_id,
        provider = %provider,
        verified = verified,
        "Credential verification probe completed"
    );

    Ok(Json(json!({ "is_verified": verified })))
}
