//! JSON extractor with automatic validation using the validator crate.

use crate::errors::ErrorBody;
use axum::{
    extract::{FromRequest, Json, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON extractor with automatic validation.
///
/// Validates the request body using the `validator` crate's `Validate`
/// trait and rejects invalid bodies with a 400 and the canonical error
/// body.
///
/// # Example
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct CreateCredential {
///     #[validate(length(min = 1, max = 255))]
///     credential_name: String,
/// }
///
/// async fn create(ValidatedJson(payload): ValidatedJson<CreateCredential>) { ... }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| e.into_response())?;

        data.validate().map_err(|e| {
            let detail = e
                .field_errors()
                .iter()
                .map(|(field, errors)| {
                    let messages: Vec<String> = errors
                        .iter()
                        .map(|err| {
                            err.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| err.code.to_string())
                        })
                        .collect();
                    format!("{}: {}", field, messages.join(", "))
                })
                .collect::<Vec<_>>()
                .join("; ");

            let body = ErrorBody::with_detail("request validation failed", detail);
            (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
        })?;

        Ok(ValidatedJson(data))
    }
}
