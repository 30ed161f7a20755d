//! Provider client
//!
//! [`ChatClient`] binds an endpoint and a credential to the shared HTTP
//! transport. [`ClientFactory`] produces a fresh client per request.

use crate::completion::{ChatBackend, ChatCompletions, CompletionError};
use crate::config::Config;
use crate::conversation::Conversation;
use crate::credential::{Credential, CredentialResolver};
use crate::error::AppResult;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed construction inputs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientConstructionError {
    #[error("Invalid provider endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Credential is empty; cannot authenticate provider requests")]
    EmptyCredential,
}

/// Request body for the chat-completions operation
#[derive(Debug, Serialize)]
struct ChatCompletionsBody<'a> {
    messages: &'a Conversation,
}

/// Provider error envelope: `{"error": {"message": "..."}}`
#[derive(Debug, Deserialize)]
struct ProviderErrorEnvelope {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// Authenticated handle for chat-completion requests
///
/// Construction performs no I/O.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: Url,
    api_version: String,
    credential: Credential,
}

impl ChatClient {
    /// Bind `endpoint` and `credential` to the transport
    ///
    /// # Errors
    /// Returns an error if the endpoint is not an absolute http(s) URL or the
    /// credential's secret is blank.
    pub fn build(
        http: reqwest::Client,
        endpoint: &str,
        api_version: &str,
        credential: Credential,
    ) -> Result<Self, ClientConstructionError> {
        let invalid = |reason: String| ClientConstructionError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };

        let url = Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "scheme must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }
        if credential.secret().trim().is_empty() {
            return Err(ClientConstructionError::EmptyCredential);
        }

        Ok(Self {
            http,
            endpoint: url,
            api_version: api_version.to_string(),
            credential,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Full URL of the chat-completions operation for `deployment`
    pub fn completions_url(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint.as_str().trim_end_matches('/'),
            deployment
        )
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn chat_completions(
        &self,
        deployment: &str,
        conversation: &Conversation,
    ) -> Result<ChatCompletions, CompletionError> {
        let url = self.completions_url(deployment);
        let (header_name, header_value) = self.credential.auth_header();

        tracing::debug!(
            url = %url,
            api_version = %self.api_version,
            "Sending chat completion request"
        );

        let response = self
            .http
            .post(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .header(header_name, header_value)
            .json(&ChatCompletionsBody {
                messages: conversation,
            })
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ProviderErrorEnvelope>(&body) {
                Ok(envelope) => envelope.error.message,
                Err(_) if !body.trim().is_empty() => body,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("provider request failed")
                    .to_string(),
            };
            tracing::warn!(
                status = status.as_u16(),
                message = %message,
                "Provider rejected chat completion request"
            );
            return Err(CompletionError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<ChatCompletions>()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))
    }
}

/// Produces a ready-to-use backend for one request
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(&self) -> AppResult<Box<dyn ChatBackend>>;
}

/// Resolves a credential and builds a [`ChatClient`] on every call
///
/// The HTTP connection pool is shared; credentials and clients are not.
#[derive(Debug, Clone)]
pub struct ProviderClientFactory {
    resolver: CredentialResolver,
    http: reqwest::Client,
    endpoint: String,
    api_version: String,
}

impl ProviderClientFactory {
    pub fn new(config: &Config, http: reqwest::Client) -> AppResult<Self> {
        let resolver = CredentialResolver::new(&config.auth, http.clone())?;
        tracing::info!(
            strategy = resolver.source().kind(),
            endpoint = %config.provider.endpoint,
            "Provider credential strategy selected"
        );
        Ok(Self {
            resolver,
            http,
            endpoint: config.provider.endpoint.clone(),
            api_version: config.provider.api_version.clone(),
        })
    }
}

#[async_trait]
impl ClientFactory for ProviderClientFactory {
    async fn create(&self) -> AppResult<Box<dyn ChatBackend>> {
        let credential = self.resolver.resolve().await?;
        let client = ChatClient::build(
            self.http.clone(),
            &self.endpoint,
            &self.api_version,
            credential,
        )?;
        tracing::debug!(endpoint = %client.endpoint(), "Provider client instance was created");
        Ok(Box::new(client))
    }
}
