//! Credential selection and acquisition
//!
//! The strategy (managed identity or static key) is chosen once from
//! configuration. A concrete [`Credential`] is produced on demand; managed
//! identity tokens are requested from the platform identity endpoint.

use crate::config::{AuthConfig, AuthStrategy};
use serde::Deserialize;
use thiserror::Error;

/// IMDS token protocol version
const IMDS_API_VERSION: &str = "2018-02-01";
/// App Service token protocol version
const APP_SERVICE_API_VERSION: &str = "2019-08-01";
/// Maximum identity error body kept in error messages
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Missing or unusable credential inputs
#[derive(Error, Debug)]
pub enum AuthConfigurationError {
    #[error(
        "No credential configured: set USER_MANAGED_ID_CLIENT_ID for managed identity \
        or OPENAI_KEY for key authentication"
    )]
    MissingCredential,

    #[error("Auth strategy '{strategy}' requires {field} to be set")]
    MissingInput {
        strategy: &'static str,
        field: &'static str,
    },

    #[error("Managed identity token request failed: {0}")]
    IdentityRequest(String),

    #[error("Managed identity endpoint rejected the token request with status {status}: {body}")]
    IdentityRejected { status: u16, body: String },

    #[error("Managed identity endpoint returned an unusable token response: {0}")]
    MalformedToken(String),
}

/// Credential strategy resolved from configuration
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    ManagedIdentity { client_id: String },
    StaticKey { key: String },
}

impl CredentialSource {
    /// Select the strategy for this process
    ///
    /// An explicit strategy must have its input. Otherwise a client id wins
    /// over a key. Blank values count as absent.
    pub fn select(auth: &AuthConfig) -> Result<Self, AuthConfigurationError> {
        let client_id = non_blank(auth.client_id.as_deref());
        let key = non_blank(auth.api_key.as_deref());

        match auth.strategy {
            Some(AuthStrategy::ManagedIdentity) => client_id
                .map(|client_id| Self::ManagedIdentity { client_id })
                .ok_or(AuthConfigurationError::MissingInput {
                    strategy: "managed_identity",
                    field: "USER_MANAGED_ID_CLIENT_ID",
                }),
            Some(AuthStrategy::ApiKey) => key
                .map(|key| Self::StaticKey { key })
                .ok_or(AuthConfigurationError::MissingInput {
                    strategy: "api_key",
                    field: "OPENAI_KEY",
                }),
            None => match (client_id, key) {
                (Some(client_id), _) => Ok(Self::ManagedIdentity { client_id }),
                (None, Some(key)) => Ok(Self::StaticKey { key }),
                (None, None) => Err(AuthConfigurationError::MissingCredential),
            },
        }
    }

    /// Strategy name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ManagedIdentity { .. } => "managed_identity",
            Self::StaticKey { .. } => "api_key",
        }
    }
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManagedIdentity { client_id } => f
                .debug_struct("ManagedIdentity")
                .field("client_id", client_id)
                .finish(),
            Self::StaticKey { .. } => f.debug_struct("StaticKey").finish_non_exhaustive(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Authentication material for one client
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Managed-identity access token; `expires_on` is a Unix timestamp when known
    Bearer {
        token: String,
        expires_on: Option<u64>,
    },
    /// Static pre-shared key
    ApiKey(String),
}

impl Credential {
    /// The raw secret
    pub fn secret(&self) -> &str {
        match self {
            Self::Bearer { token, .. } => token,
            Self::ApiKey(key) => key,
        }
    }

    /// Header name/value pair that authenticates a provider request
    pub fn auth_header(&self) -> (&'static str, String) {
        match self {
            Self::Bearer { token, .. } => ("authorization", format!("Bearer {}", token)),
            Self::ApiKey(key) => ("api-key", key.clone()),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer { expires_on, .. } => f
                .debug_struct("Bearer")
                .field("token", &"***")
                .field("expires_on", expires_on)
                .finish(),
            Self::ApiKey(_) => f.debug_tuple("ApiKey").field(&"***").finish(),
        }
    }
}

/// Token response from IMDS or the App Service identity endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// String on IMDS, number on some App Service versions
    #[serde(default)]
    expires_on: Option<serde_json::Value>,
}

fn parse_expires_on(value: Option<&serde_json::Value>) -> Option<u64> {
    match value? {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Produces credentials for the configured strategy
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    source: CredentialSource,
    http: reqwest::Client,
    identity_endpoint: String,
    identity_header: Option<String>,
    resource: String,
}

impl CredentialResolver {
    /// Create a resolver, selecting the strategy from `auth`
    pub fn new(auth: &AuthConfig, http: reqwest::Client) -> Result<Self, AuthConfigurationError> {
        let source = CredentialSource::select(auth)?;
        tracing::info!(strategy = source.kind(), "Credential strategy selected");

        Ok(Self {
            source,
            http,
            identity_endpoint: auth.identity_endpoint.clone(),
            identity_header: non_blank(auth.identity_header.as_deref()),
            resource: auth.resource.clone(),
        })
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }

    /// Produce a credential
    ///
    /// Static keys are returned as-is. Managed identity performs one token
    /// request per call; tokens are not cached.
    pub async fn resolve(&self) -> Result<Credential, AuthConfigurationError> {
        match &self.source {
            CredentialSource::StaticKey { key } => Ok(Credential::ApiKey(key.clone())),
            CredentialSource::ManagedIdentity { client_id } => {
                self.acquire_token(client_id).await
            }
        }
    }

    async fn acquire_token(&self, client_id: &str) -> Result<Credential, AuthConfigurationError> {
        tracing::debug!(
            client_id = %client_id,
            identity_endpoint = %self.identity_endpoint,
            app_service = self.identity_header.is_some(),
            "Requesting managed identity token"
        );

        let request = match &self.identity_header {
            Some(header) => self
                .http
                .get(&self.identity_endpoint)
                .header("X-IDENTITY-HEADER", header)
                .query(&[
                    ("api-version", APP_SERVICE_API_VERSION),
                    ("resource", self.resource.as_str()),
                    ("client_id", client_id),
                ]),
            None => self
                .http
                .get(&self.identity_endpoint)
                .header("Metadata", "true")
                .query(&[
                    ("api-version", IMDS_API_VERSION),
                    ("resource", self.resource.as_str()),
                    ("client_id", client_id),
                ]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| AuthConfigurationError::IdentityRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            tracing::error!(
                status = status.as_u16(),
                body = %body,
                "Managed identity token request rejected"
            );
            return Err(AuthConfigurationError::IdentityRejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthConfigurationError::MalformedToken(e.to_string()))?;

        if token.access_token.trim().is_empty() {
            return Err(AuthConfigurationError::MalformedToken(
                "access_token is empty".to_string(),
            ));
        }

        let expires_on = parse_expires_on(token.expires_on.as_ref());
        tracing::debug!(expires_on = ?expires_on, "Managed identity credential was created");

        Ok(Credential::Bearer {
            token: token.access_token,
            expires_on,
        })
    }
}
