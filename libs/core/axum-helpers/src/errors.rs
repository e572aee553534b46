//! Canonical failure body shared by every HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured error body returned by every endpoint on failure.
///
/// ```json
/// { "error": "credential invalid", "detail": "auth refused by runpod" }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// The kind of failure and the component it came from
    pub error: String,
    /// Human-readable context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
        }
    }

    pub fn with_detail(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: Some(detail.into()),
        }
    }
}

/// Helper to build an error response with the canonical body.
pub fn error_response(status: StatusCode, error: impl Into<String>, detail: Option<String>) -> Response {
    let body = ErrorBody {
        error: error.into(),
        detail,
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_skips_missing_detail() {
        let body = ErrorBody::new("not found");
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"not found"}"#);
    }

    #[test]
    fn test_error_body_with_detail() {
        let body = ErrorBody::with_detail("collection failed", "adapter timeout");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["detail"], "adapter timeout");
    }
}
