//! HTTP handlers for the credentials surface.
//!
//! Mounted by the orchestrator under `/api/v1/credentials`. The
//! verification probe endpoint lives in the orchestrator itself because it
//! needs the adapter registry.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_helpers::ValidatedJson;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

use domain_telemetry::CloudProvider;

use crate::error::{CredentialError, CredentialResult};
use crate::models::{CreateCredential, CredentialSummary, UpdateCredential};
use crate::repository::CredentialRepository;
use crate::service::CredentialService;

#[derive(Debug, Deserialize, IntoParams)]
pub struct CustomerQuery {
    pub customer_id: Uuid,
}

/// Create the credentials router
pub fn router<R: CredentialRepository + 'static>(
    service: Arc<CredentialService<R>>,
) -> Router {
    Router::new()
        .route("/", post(create_credential).get(list_credentials))
        .route(
            "/{provider}",
            get(get_credential).delete(delete_credential).put(update_credential),
        )
        .with_state(service)
}

/// Create a credential; the secret is encrypted before storage
#[utoipa::path(
    post,
    path = "/api/v1/credentials",
    request_body = CreateCredential,
    responses(
        (status = 201, description = "Credential created", body = CredentialSummary),
        (status = 409, description = "Duplicate (customer, provider, name)")
    ),
    tag = "credentials"
)]
async fn create_credential<R: CredentialRepository>(
    State(service): State<Arc<CredentialService<R>>>,
    ValidatedJson(input): ValidatedJson<CreateCredential>,
) -> CredentialResult<impl IntoResponse> {
    let created = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List a customer's credentials (secrets redacted)
async fn list_credentials<R: CredentialRepository>(
    State(service): State<Arc<CredentialService<R>>>,
    Query(query): Query<CustomerQuery>,
) -> CredentialResult<Json<Vec<CredentialSummary>>> {
    let credentials = service.list_by_customer(query.customer_id).await?;
    Ok(Json(credentials))
}

/// Fetch the newest credential for (customer, provider), secret redacted
#[utoipa::path(
    get,
    path = "/api/v1/credentials/{provider}",
    params(("provider" = CloudProvider, Path), CustomerQuery),
    responses(
        (status = 200, body = CredentialSummary),
        (status = 404, description = "No credential for the tuple")
    ),
    tag = "credentials"
)]
async fn get_credential<R: CredentialRepository>(
    State(service): State<Arc<CredentialService<R>>>,
    Path(provider): Path<CloudProvider>,
    Query(query): Query<CustomerQuery>,
) -> CredentialResult<Json<CredentialSummary>> {
    let credential = service
        .get_summary(query.customer_id, provider)
        .await?
        .ok_or_else(|| {
            CredentialError::NotFound(format!("{}/{}", query.customer_id, provider))
        })?;
    Ok(Json(credential))
}

/// Versioned update of the newest credential for (customer, provider)
async fn update_credential<R: CredentialRepository>(
    State(service): State<Arc<CredentialService<R>>>,
    Path(provider): Path<CloudProvider>,
    Query(query): Query<CustomerQuery>,
    ValidatedJson(input): ValidatedJson<UpdateCredential>,
) -> CredentialResult<Json<CredentialSummary>> {
    let existing = service
        .get_summary(query.customer_id, provider)
        .await?
        .ok_or_else(|| {
            CredentialError::NotFound(format!("{}/{}", query.customer_id, provider))
        })?;

    let updated = service.update(existing.id, input).await?;
    Ok(Json(updated))
}

/// Soft-delete the newest credential for (customer, provider)
async fn delete_credential<R: CredentialRepository>(
    State(service): State<Arc<CredentialService<R>>>,
    Path(provider): Path<CloudProvider>,
    Query(query): Query<CustomerQuery>,
) -> CredentialResult<StatusCode> {
    let existing = service
        .get_summary(query.customer_id, provider)
        .await?
        .ok_or_else(|| {
            CredentialError::NotFound(format!("{}/{}", query.customer_id, provider))
        })?;

    service.delete(existing.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
