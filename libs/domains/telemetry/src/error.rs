use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors that can occur in the telemetry domain
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// No rows matched the query
    #[error("No telemetry found: {0}")]
    NotFound(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Entire batch rejected by validation
    #[error("Batch rejected: {0}")]
    BatchRejected(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for TelemetryError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            TelemetryError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            TelemetryError::InvalidInput(_) | TelemetryError::BatchRejected(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            TelemetryError::Database(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Time-series store unreachable".to_string(),
            ),
            TelemetryError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
            "detail": format!("telemetry: {}", self)
        }));

        (status, body).into_response()
    }
}
