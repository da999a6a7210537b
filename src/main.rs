//! Signwatch daemon
//!
//! Run with: cargo run -- --config ./config.json
//!
//! Environment variables:
//! - SIGNWATCH_CONFIG: Config file path (default: ./config.json)
//! - RUST_LOG: Log level (default: info)

mod cli;

use clap::Parser;
use signwatch::config::Config;
use signwatch::monitor::run_monitor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signwatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if cli.init {
        Config::generate(&cli.config)?;
        tracing::info!("Generated a new config at {}", cli.config.display());
        return Ok(());
    }

    let config = Config::load(&cli.config)?;

    tracing::info!("Signwatch {} configuration:", env!("CARGO_PKG_VERSION"));
    tracing::info!("  Config: {}", cli.config.display());
    tracing::info!("  Networks: {}", config.networks.len());
    for network in &config.networks {
        tracing::info!(
            "    - {} ({} rpcs, {} validators{})",
            network.display_name(),
            network.rpcs.len(),
            network.validators.len(),
            if network.reverse { ", reverse" } else { "" }
        );
    }
    match &config.health {
        Some(health) => tracing::info!(
            "  Health: port {:?}, {} peers",
            health.port,
            health.nodes.len()
        ),
        None => tracing::info!("  Health: DISABLED"),
    }

    run_monitor(config).await
}
