use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for credential operations
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Errors that can occur in the credentials domain
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Credential not found
    #[error("Credential not found: {0}")]
    NotFound(String),

    /// Duplicate (customer, provider, name) tuple
    #[error("Duplicate credential: {0}")]
    Duplicate(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Encryption or decryption failure
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for CredentialError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CredentialError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            CredentialError::Duplicate(_) => (StatusCode::CONFLICT, self.to_string()),
            CredentialError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            CredentialError::Crypto(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Credential crypto error".to_string(),
            ),
            CredentialError::Database(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Credential store unreachable".to_string(),
            ),
            CredentialError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
            "detail": format!("credentials: {}", self)
        }));

        (status, body).into_response()
    }
}
