//! HTTP request handlers for the askai API

use crate::client::{ClientFactory, ProviderClientFactory};
use crate::config::{Config, ErrorMode};
use crate::conversation::ConversationBuilder;
use crate::error::{AppError, AppResult};
use crate::metrics::{Metrics, Outcome, Route};
use crate::middleware::{RequestId, request_id_middleware};
use crate::orchestration::{ChatModelListener, default_listeners};
use axum::{
    Router, middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub mod ask;
pub mod ask_orchestrated;
pub mod extractor;
pub mod health;
pub mod metrics;

/// Body of both ask endpoints: `{"message": "..."}`
///
/// The message is not validated; an empty string is forwarded as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    message: String,
}

impl AskRequest {
    /// Get the message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Application state shared across all handlers
///
/// Everything here is read-only after startup; per-request objects
/// (credential, client, conversation) are never stored.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    clients: Arc<dyn ClientFactory>,
    conversation: ConversationBuilder,
    listeners: Arc<[Arc<dyn ChatModelListener>]>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create state backed by the configured provider
    ///
    /// The HTTP connection pool is created here, once per process.
    pub fn new(config: Arc<Config>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("askai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        let clients = ProviderClientFactory::new(&config, http)?;
        Self::with_client_factory(config, Arc::new(clients))
    }

    /// Create state with a caller-supplied client factory
    pub fn with_client_factory(
        config: Arc<Config>,
        clients: Arc<dyn ClientFactory>,
    ) -> AppResult<Self> {
        let metrics = Metrics::new()
            .map_err(|e| AppError::Internal(format!("Failed to register metrics: {}", e)))?;

        Ok(Self {
            config,
            clients,
            conversation: ConversationBuilder::default(),
            listeners: default_listeners().into(),
            metrics: Arc::new(metrics),
        })
    }

    /// Replace the listeners notified by the orchestrated endpoint
    pub fn with_listeners(mut self, listeners: Vec<Arc<dyn ChatModelListener>>) -> Self {
        self.listeners = listeners.into();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clients(&self) -> &dyn ClientFactory {
        self.clients.as_ref()
    }

    pub fn conversation(&self) -> &ConversationBuilder {
        &self.conversation
    }

    pub fn listeners(&self) -> &[Arc<dyn ChatModelListener>] {
        &self.listeners
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Record request metrics; failures are logged, never returned
    pub(crate) fn record_outcome(
        &self,
        request_id: RequestId,
        route: Route,
        outcome: Outcome,
        elapsed: Duration,
    ) {
        if let Err(e) = self.metrics.record_request(route, outcome) {
            tracing::error!(
                request_id = %request_id,
                error = %e,
                route = route.as_str(),
                "Metrics recording failed (non-fatal)"
            );
        }
        if let Err(e) = self
            .metrics
            .record_provider_duration(route, elapsed.as_secs_f64())
        {
            tracing::error!(
                request_id = %request_id,
                error = %e,
                route = route.as_str(),
                "Metrics recording failed (non-fatal)"
            );
        }
    }
}

/// Render a failed ask request
///
/// `Compatible` returns 200 with the error message as the plain-text body,
/// so callers cannot tell it from an answer by status code. `Strict` uses the
/// error's own status and JSON body.
pub fn error_response(err: AppError, mode: ErrorMode) -> Response {
    match mode {
        ErrorMode::Compatible => err.to_string().into_response(),
        ErrorMode::Strict => err.into_response(),
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/askAI", post(ask::handler))
        .route("/askAILangChain4j", post(ask_orchestrated::handler))
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}
