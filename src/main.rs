//! askai HTTP server
//!
//! Starts an Axum web server exposing the ask endpoints.

use askai::{
    cli::{Cli, Command, generate_config_template},
    config::{Config, ConfigSource, DEFAULT_CONFIG_PATH},
    handlers::{self, AppState},
    telemetry,
};
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        match output {
            Some(path) => {
                std::fs::write(&path, generate_config_template())?;
                println!("Configuration template written to {}", path);
            }
            None => print!("{}", generate_config_template()),
        }
        return Ok(());
    }

    // Configuration errors abort startup, including a missing credential
    // and an explicit --config path that does not exist
    let (config, source) = Config::load(cli.config.as_deref().map(Path::new))?;

    telemetry::init(&config.observability.log_level);

    match &source {
        ConfigSource::File(path) => {
            tracing::info!(path = %path.display(), "Loaded configuration file")
        }
        ConfigSource::Defaults => tracing::warn!(
            path = DEFAULT_CONFIG_PATH,
            "Configuration file not found, using defaults and environment"
        ),
    }

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        endpoint = %config.provider.endpoint,
        error_mode = ?config.server.error_mode,
        "Starting askai server"
    );

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    let state = AppState::new(Arc::new(config))?;
    let app = handlers::router(state);

    tracing::info!("Listening on {}", addr);
    tracing::info!("Ask endpoint available at http://{}/askAI", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
