//! Error types for askai
//!
//! All errors implement `IntoResponse` for Axum handlers. That impl is the
//! strict rendering; the ask endpoints choose between it and the plain-text
//! rendering in [`crate::handlers::error_response`].

use crate::client::ClientConstructionError;
use crate::completion::CompletionError;
use crate::credential::AuthConfigurationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    AuthConfiguration(#[from] AuthConfigurationError),

    #[error(transparent)]
    ClientConstruction(#[from] ClientConstructionError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Invalid request body: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read configuration file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status used by the strict rendering
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::Completion(_) => StatusCode::BAD_GATEWAY,
            Self::AuthConfiguration(_)
            | Self::ClientConstruction(_)
            | Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthConfiguration(_) => "auth_configuration",
            Self::ClientConstruction(_) => "client_construction",
            Self::Completion(_) => "completion",
            Self::Decode(_) => "decode",
            Self::Config(_) | Self::ConfigFileRead { .. } | Self::ConfigParseFailed { .. } => {
                "config"
            }
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_errors_keep_message_text() {
        let err: AppError = CompletionError::Transport("connection refused".to_string()).into();
        assert_eq!(err.to_string(), "connection refused");

        let err: AppError = AuthConfigurationError::MissingCredential.into();
        assert!(err.to_string().starts_with("No credential configured"));
    }

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_decode_error_response_status() {
        let response = AppError::Decode("bad json".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_completion_error_response_status() {
        let err: AppError = CompletionError::Provider {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_auth_error_response_status() {
        let err: AppError = AuthConfigurationError::MissingCredential.into();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_client_construction_error_response_status() {
        let err: AppError = ClientConstructionError::EmptyCredential.into();
        assert_eq!(err.kind(), "client_construction");
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_strict_body_is_json() {
        let response = AppError::Internal("unexpected state".to_string()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal error: unexpected state");
    }
}
