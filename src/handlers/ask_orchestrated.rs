//! Orchestrated chat endpoint
//!
//! Handles POST /askAILangChain4j. The message is sent without the persona
//! preamble through a [`ChatModel`], which notifies the registered listeners.

use crate::config::DEPLOYMENT_NAME;
use crate::error::AppResult;
use crate::handlers::extractor::MessageJson;
use crate::handlers::{AppState, AskRequest, error_response};
use crate::metrics::{Outcome, Route};
use crate::middleware::RequestId;
use crate::orchestration::ChatModel;
use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use std::time::Instant;

/// POST /askAILangChain4j handler
///
/// Same request and response shape as `/askAI`; returns the first choice only.
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    MessageJson(request): MessageJson<AskRequest>,
) -> Response {
    tracing::debug!(
        request_id = %request_id,
        message = %request.message(),
        listener_count = state.listeners().len(),
        "Received orchestrated ask request"
    );

    let started = Instant::now();
    let result = generate(&state, request.message()).await;
    let elapsed = started.elapsed();

    match result {
        Ok(text) => {
            tracing::info!(
                request_id = %request_id,
                response_length = text.len(),
                duration_ms = elapsed.as_millis() as u64,
                "Orchestrated ask request completed"
            );
            state.record_outcome(request_id, Route::AskOrchestrated, Outcome::Success, elapsed);
            text.into_response()
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                error = %e,
                error_kind = e.kind(),
                "Orchestrated ask request failed"
            );
            state.record_outcome(request_id, Route::AskOrchestrated, Outcome::Error, elapsed);
            error_response(e, state.config().server.error_mode)
        }
    }
}

async fn generate(state: &AppState, message: &str) -> AppResult<String> {
    let backend = state.clients().create().await?;
    let model = ChatModel::new(backend, DEPLOYMENT_NAME).with_listeners(state.listeners().to_vec());
    Ok(model.generate(message).await?)
}
