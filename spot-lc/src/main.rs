//! Label conversion (spot-lc) - Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use spot_common::config::TomlConfig;
use spot_lc::{run, Args};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing (RUST_LOG wins over the configured level)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "spot-lc {} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let summary = run(&args, &config)?;
    for line in summary.lines() {
        println!("{}", line);
    }
    Ok(())
}
