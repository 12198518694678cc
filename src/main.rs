// src/main.rs

//! Entry point for the coordinator process: loads configuration from the
//! environment, initializes logging, and runs the request surface alongside
//! its background tasks until shutdown.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use vaultsieve::config::Config;
use vaultsieve::server;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load configuration from the environment: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .compact()
        .with_ansi(true)
        .init();

    if let Err(e) = server::run(config).await {
        tracing::error!("coordinator runtime error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
