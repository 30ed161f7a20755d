//! Command-line interface for askai
//!
//! Provides argument parsing and subcommand handling for the askai binary.

use clap::{Parser, Subcommand};

/// Pirate-persona chat endpoint backed by a hosted chat-completion API
#[derive(Parser)]
#[command(name = "askai")]
#[command(version)]
#[command(about = "Pirate-persona chat endpoint backed by a hosted chat-completion API")]
#[command(
    long_about = "askai serves POST /askAI and POST /askAILangChain4j, forwarding each \
    message to the configured chat-completion deployment using a managed-identity \
    token or a static API key."
)]
pub struct Cli {
    /// Path to configuration file; must exist when given [default: askai.toml, if present]
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# askai Configuration
# ====================
#
# Every value has a default. Environment variables override this file:
#
#   USER_MANAGED_ID_CLIENT_ID  -> auth.client_id
#   OPENAI_ENDPOINT            -> provider.endpoint
#   OPENAI_KEY                 -> auth.api_key
#   IDENTITY_ENDPOINT          -> auth.identity_endpoint   (set by App Service)
#   IDENTITY_HEADER            -> auth.identity_header     (set by App Service)

[server]
host = "0.0.0.0"
port = 8080

# How failed ask requests are rendered:
#   - "compatible": always 200, the error message is the plain-text body
#   - "strict": error status code with a JSON {"error": "..."} body
error_mode = "compatible"

[provider]
# Base URL of the chat-completion resource
endpoint = "https://your-resource.openai.azure.com/"
api_version = "2024-06-01"

[auth]
# Credential strategy: "managed_identity" or "api_key".
# When omitted, a configured client_id selects managed identity and
# api_key is the fallback.
# strategy = "managed_identity"
# client_id = "00000000-0000-0000-0000-000000000000"
# api_key = "for local development only"

# Token endpoint for managed identity (IMDS by default)
identity_endpoint = "http://169.254.169.254/metadata/identity/oauth2/token"
resource = "https://cognitiveservices.azure.com"

[observability]
# Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG overrides)
log_level = "info"
"#
}
