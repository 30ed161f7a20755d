//! JSON extractor for the ask endpoints
//!
//! Wraps Axum's `Json` extractor so a malformed body becomes a 400 with an
//! `{"error": ...}` body, regardless of the configured error mode.

use crate::error::AppError;
use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Body decoding failure
///
/// - JSON syntax errors and missing/mistyped fields → 400 Bad Request
/// - Missing content type → 415 Unsupported Media Type
#[derive(Debug)]
pub struct DecodeRejection(JsonRejection);

impl IntoResponse for DecodeRejection {
    fn into_response(self) -> Response {
        match &self.0 {
            JsonRejection::MissingJsonContentType(_) => {
                let mut response = AppError::Decode(
                    "Content-Type must be application/json".to_string(),
                )
                .into_response();
                *response.status_mut() = StatusCode::UNSUPPORTED_MEDIA_TYPE;
                response
            }
            _ => AppError::Decode(self.0.body_text()).into_response(),
        }
    }
}

/// JSON extractor producing [`DecodeRejection`] on failure
pub struct MessageJson<T>(pub T);

impl<S, T> FromRequest<S> for MessageJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = DecodeRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(MessageJson(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "Rejected request body");
                Err(DecodeRejection(rejection))
            }
        }
    }
}
