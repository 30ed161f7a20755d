//! Pirate chat endpoint
//!
//! Handles POST /askAI: persona preamble + caller message, one completion
//! call, all choices concatenated into a plain-text body.

use crate::completion;
use crate::config::DEPLOYMENT_NAME;
use crate::conversation::Conversation;
use crate::error::AppResult;
use crate::handlers::extractor::MessageJson;
use crate::handlers::{AppState, AskRequest, error_response};
use crate::metrics::{Outcome, Route};
use crate::middleware::RequestId;
use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use std::time::Instant;

/// POST /askAI handler
///
/// Returns 200 with the completion text. Failures after decoding go through
/// [`error_response`], which also returns 200 unless strict mode is enabled.
///
/// The provider call is awaited without a timeout of its own.
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    MessageJson(request): MessageJson<AskRequest>,
) -> Response {
    tracing::debug!(
        request_id = %request_id,
        message = %request.message(),
        endpoint = %state.config().provider.endpoint,
        "Received ask request"
    );

    let conversation = state.conversation().build(request.message());
    if tracing::enabled!(tracing::Level::DEBUG) {
        match serde_json::to_string(&conversation) {
            Ok(json) => {
                tracing::debug!(request_id = %request_id, messages = %json, "Chat messages built")
            }
            Err(e) => tracing::warn!(
                request_id = %request_id,
                error = %e,
                "Could not serialize chat messages for logging"
            ),
        }
    }

    let started = Instant::now();
    let result = answer(&state, &conversation).await;
    let elapsed = started.elapsed();

    match result {
        Ok(text) => {
            tracing::info!(
                request_id = %request_id,
                response_length = text.len(),
                duration_ms = elapsed.as_millis() as u64,
                "Ask request completed"
            );
            tracing::debug!(request_id = %request_id, response = %text, "Response from provider");
            state.record_outcome(request_id, Route::Ask, Outcome::Success, elapsed);
            text.into_response()
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                error = %e,
                error_kind = e.kind(),
                duration_ms = elapsed.as_millis() as u64,
                "Ask request failed"
            );
            state.record_outcome(request_id, Route::Ask, Outcome::Error, elapsed);
            error_response(e, state.config().server.error_mode)
        }
    }
}

/// Build a fresh client and run the completion
async fn answer(state: &AppState, conversation: &Conversation) -> AppResult<String> {
    let backend = state.clients().create().await?;
    Ok(completion::invoke(backend.as_ref(), DEPLOYMENT_NAME, conversation).await?)
}
