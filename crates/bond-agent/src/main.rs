//! bond-agent - SR Linux NDK agent that logs the notifications it receives

mod app;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bond_core::config::{ConfigOverrides, resolve_config};
use bond_core::{AgentBuilder, logging};
use clap::Parser;
use tracing::info;

/// bond-agent - SR Linux NDK agent that logs the notifications it receives
#[derive(Parser, Debug)]
#[command(name = "bond-agent")]
#[command(about = "SR Linux NDK agent that logs the notifications it receives")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Agent name registered with sdk_mgr
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// NDK service manager endpoint (unix:///path or http://host:port)
    #[arg(long, value_name = "URI")]
    endpoint: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        logging::init_with_level(tracing::Level::DEBUG);
    } else {
        logging::init();
    }

    let current_dir = std::env::current_dir().context("Failed to get current directory")?;

    let overrides = ConfigOverrides {
        config_path: args.config,
        name: args.name,
        endpoint: args.endpoint,
    };
    let config =
        resolve_config(&overrides, &current_dir).context("Failed to resolve configuration")?;

    info!(agent = %config.name, endpoint = %config.endpoint, "bond agent starting");

    let session = AgentBuilder::from_config(&config)
        .build()
        .context("Invalid agent options")?
        .start()
        .await
        .context("Failed to start agent session")?;

    let delivered = app::run(session, &config.notifications.categories).await?;

    info!(delivered, "bond agent shutdown complete");
    Ok(())
}
