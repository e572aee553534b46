use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that can occur in the workflow engine
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Execution not found
    #[error("Execution not found: {0}")]
    NotFound(String),

    /// Another run holds the resource lock
    #[error("Resource locked: {0}")]
    ResourceLocked(String),

    /// A step failed; the execution is checkpointed before it
    #[error("Step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },

    /// Undo of a step failed during rollback
    #[error("Rollback of step '{step}' failed: {reason}")]
    RollbackFailed { step: String, reason: String },

    /// Invalid definition or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Agent domain error (locks, recommendations)
    #[error(transparent)]
    Agents(#[from] domain_agents::AgentError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        if let WorkflowError::Agents(e) = self {
            return e.into_response();
        }

        let (status, message) = match &self {
            WorkflowError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            WorkflowError::ResourceLocked(_) => (StatusCode::CONFLICT, self.to_string()),
            WorkflowError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            WorkflowError::StepFailed { .. } | WorkflowError::RollbackFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            WorkflowError::Database(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Workflow store unreachable".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
            "detail": format!("workflows: {}", self)
        }));

        (status, body).into_response()
    }
}
