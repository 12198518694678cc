// src/bin/worker.rs

//! Entry point for the worker process: leases candidate batches from the
//! coordinator and runs the verification pipeline against them (§4.6).

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use vaultsieve::worker::{self, config::WorkerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match WorkerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load worker configuration from the environment: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .compact()
        .with_ansi(true)
        .init();

    if let Err(e) = worker::run(config).await {
        tracing::error!("worker runtime error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
