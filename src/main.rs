//! Pitwall - Formula 1 dashboard API proxy
//!
//! Serves circuits, drivers, standings and session telemetry to the dashboard
//! frontend with short-lived caching and sample fallbacks.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pitwall::cli::{Cli, ServerConfig};
use pitwall::server;

/// Log filter used when `RUST_LOG` isn't set
const DEFAULT_LOG_FILTER: &str = "pitwall=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = ServerConfig::from_cli(&cli)?;
    server::serve(config).await
}
