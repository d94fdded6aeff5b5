//! pipecho - line echo between two peers over a local named channel.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use pipecho_cli::{Coordinator, UnitStatus};
use pipecho_core::Config;
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "pipecho")]
#[command(about = "Echo console lines, reversed, through a local named channel")]
#[command(version)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON5 config file overriding the built-in defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective config to this path and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = match cli.config {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(path) = cli.write_config {
        config
            .save(&path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        tracing::info!("Config written to {}", path.display());
        return Ok(());
    }

    tracing::debug!("Using channel '{}'", config.channel_name);

    let report = Coordinator::new(config)
        .run(BufReader::new(tokio::io::stdin()))
        .await;

    if let UnitStatus::Completed(client) = &report.client {
        tracing::debug!(
            "Client sent {} message(s) and received {} reply line(s)",
            client.sent.len(),
            client.replies.len()
        );
    }

    Ok(())
}
