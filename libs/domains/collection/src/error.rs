use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for collection operations
pub type CollectionResult<T> = Result<T, CollectionError>;

/// Errors that can occur in the collection domain
#[derive(Debug, Error)]
pub enum CollectionError {
    /// No adapter registered for the (provider, data_type) pair
    #[error("No adapter for {0}")]
    NoAdapter(String),

    /// No usable credential for the tuple
    #[error("No credential: {0}")]
    NoCredential(String),

    /// Invalid trigger request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The run was recorded but the history row is missing
    #[error("History row not found: {0}")]
    HistoryNotFound(String),

    /// Credential domain error
    #[error(transparent)]
    Credential(#[from] domain_credentials::CredentialError),

    /// Telemetry domain error (writer)
    #[error(transparent)]
    Telemetry(#[from] domain_telemetry::TelemetryError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for CollectionError {
    fn into_response(self) -> Response {
        // Nested domain errors carry their own status mapping
        match self {
            CollectionError::Credential(e) => return e.into_response(),
            CollectionError::Telemetry(e) => return e.into_response(),
            _ => {}
        }

        let (status, message) = match &self {
            CollectionError::NoAdapter(_)
            | CollectionError::NoCredential(_)
            | CollectionError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            CollectionError::HistoryNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            CollectionError::Database(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Store unreachable".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
            "detail": format!("collection: {}", self)
        }));

        (status, body).into_response()
    }
}
