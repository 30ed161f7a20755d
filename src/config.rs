//! Configuration management for askai
//!
//! Settings come from an optional TOML file, then environment variables
//! override individual values. Configuration is read once at startup and is
//! immutable afterwards.

use crate::credential::CredentialSource;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Managed-identity client id
pub const ENV_CLIENT_ID: &str = "USER_MANAGED_ID_CLIENT_ID";
/// Provider base URL
pub const ENV_ENDPOINT: &str = "OPENAI_ENDPOINT";
/// Static provider key
pub const ENV_API_KEY: &str = "OPENAI_KEY";
/// App Service identity endpoint (set by the platform)
pub const ENV_IDENTITY_ENDPOINT: &str = "IDENTITY_ENDPOINT";
/// App Service identity header secret (set by the platform)
pub const ENV_IDENTITY_HEADER: &str = "IDENTITY_HEADER";

/// Configuration file read when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "askai.toml";

/// Deployment name used for every completion call
pub const DEPLOYMENT_NAME: &str = "gpt-4o";

/// Where the startup configuration was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file given and the default file is absent
    Defaults,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How handler failures are rendered
    #[serde(default)]
    pub error_mode: ErrorMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            error_mode: ErrorMode::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Error rendering mode for the ask endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Always 200; the error message is the plain-text body
    #[default]
    Compatible,
    /// Status code and JSON body from the error type
    Strict,
}

/// Chat-completion provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Base URL of the provider, e.g. `https://my-resource.openai.azure.com/`
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_version: default_api_version(),
        }
    }
}

fn default_api_version() -> String {
    "2024-06-01".to_string()
}

/// Credential strategy
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    ManagedIdentity,
    ApiKey,
}

/// Authentication configuration
///
/// When `strategy` is omitted, a configured `client_id` selects managed
/// identity and `api_key` is the fallback.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub strategy: Option<AuthStrategy>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_identity_endpoint")]
    pub identity_endpoint: String,
    /// App Service identity header; switches token requests to the App Service protocol
    #[serde(default)]
    pub identity_header: Option<String>,
    #[serde(default = "default_resource")]
    pub resource: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            strategy: None,
            client_id: None,
            api_key: None,
            identity_endpoint: default_identity_endpoint(),
            identity_header: None,
            resource: default_resource(),
        }
    }
}

fn default_identity_endpoint() -> String {
    "http://169.254.169.254/metadata/identity/oauth2/token".to_string()
}

fn default_resource() -> String {
    "https://cognitiveservices.azure.com".to_string()
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file (no environment overrides, no validation)
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
            path: path_display,
            source,
        })
    }

    /// Load the startup configuration from the process environment
    ///
    /// See [`Config::load_with`].
    pub fn load(explicit: Option<&Path>) -> AppResult<(Self, ConfigSource)> {
        Self::load_with(explicit, Path::new(DEFAULT_CONFIG_PATH), |name| {
            std::env::var(name).ok()
        })
    }

    /// Load the startup configuration
    ///
    /// An explicit path must exist. Without one, `default_path` is read when
    /// present and defaults are used otherwise. Environment lookups are
    /// applied on top, then the result is validated.
    pub fn load_with<F>(
        explicit: Option<&Path>,
        default_path: &Path,
        lookup: F,
    ) -> AppResult<(Self, ConfigSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (mut config, source) = match explicit {
            Some(path) => (Self::from_file(path)?, ConfigSource::File(path.to_path_buf())),
            None if default_path.exists() => (
                Self::from_file(default_path)?,
                ConfigSource::File(default_path.to_path_buf()),
            ),
            None => (Self::default(), ConfigSource::Defaults),
        };

        config.apply_env_overrides(lookup);
        config.validate()?;
        Ok((config, source))
    }

    /// Override values from environment-style lookups
    ///
    /// Blank values are ignored so an exported-but-empty variable does not
    /// clobber a file value.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(client_id) = get(ENV_CLIENT_ID) {
            self.auth.client_id = Some(client_id);
        }
        if let Some(endpoint) = get(ENV_ENDPOINT) {
            self.provider.endpoint = endpoint;
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.auth.api_key = Some(key);
        }
        if let Some(identity_endpoint) = get(ENV_IDENTITY_ENDPOINT) {
            self.auth.identity_endpoint = identity_endpoint;
        }
        if let Some(identity_header) = get(ENV_IDENTITY_HEADER) {
            self.auth.identity_header = Some(identity_header);
        }
    }

    /// Validate configuration
    ///
    /// The provider endpoint is deliberately not checked here: a malformed
    /// endpoint surfaces per request as a client construction error.
    pub fn validate(&self) -> AppResult<()> {
        CredentialSource::select(&self.auth)?;

        if self.provider.api_version.trim().is_empty() {
            return Err(AppError::Config(
                "provider.api_version cannot be empty".to_string(),
            ));
        }
        if self.auth.resource.trim().is_empty() {
            return Err(AppError::Config("auth.resource cannot be empty".to_string()));
        }
        Ok(())
    }
}
