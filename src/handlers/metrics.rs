//! Prometheus metrics endpoint
//!
//! Exposes metrics in Prometheus text format for scraping.

use axum::{extract::State, http::StatusCode};

use crate::handlers::AppState;

/// Metrics handler for Prometheus scraping
///
/// # Response
///
/// - `200 OK` with metrics in Prometheus text format
/// - `500 Internal Server Error` if metrics collection fails
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/metrics
/// # HELP askai_requests_total Total number of ask requests by route and outcome
/// # TYPE askai_requests_total counter
/// askai_requests_total{outcome="success",route="ask"} 42
/// ```
pub async fn handler(State(state): State<AppState>) -> (StatusCode, String) {
    match state.metrics().gather() {
        Ok(output) => (StatusCode::OK, output),
        Err(e) => {
            tracing::error!(error = %e, "Failed to gather metrics for Prometheus scraping");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to gather metrics: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::metrics::{Outcome, Route};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_metrics_handler_returns_prometheus_format() {
        let mut config = Config::default();
        config.auth.api_key = Some("key".to_string());
        let state = AppState::new(Arc::new(config)).expect("should create AppState");
        state
            .metrics()
            .record_request(Route::Ask, Outcome::Success)
            .unwrap();

        let (status, body) = handler(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("# TYPE askai_requests_total counter"));
    }
}
