//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers.

use axum::{Json, http::StatusCode};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
}

/// Health check handler
///
/// Always 200. The provider is not contacted.
pub async fn handler() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { status: "OK" }))
}
