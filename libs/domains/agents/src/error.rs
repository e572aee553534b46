use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for agent-domain operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur in the agents domain
#[derive(Debug, Error)]
pub enum AgentError {
    /// Agent not found
    #[error("Agent not found: {0}")]
    NotFound(String),

    /// Recommendation or optimization not found
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Illegal state-machine transition
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Approval policy not satisfied
    #[error("Approval denied: {0}")]
    ApprovalDenied(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AgentError::NotFound(_) | AgentError::RecordNotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AgentError::InvalidTransition(_) | AgentError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AgentError::ApprovalDenied(_) => (StatusCode::CONFLICT, self.to_string()),
            AgentError::Database(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Relational store unreachable".to_string(),
            ),
            AgentError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
            "detail": format!("agents: {}", self)
        }));

        (status, body).into_response()
    }
}
