// src/server/mod.rs

//! Assembles the coordinator's request surface: the shared state, the axum
//! router over every endpoint in §6, the stale-lease sweeper, and the bound
//! listener, then drives all of it until shutdown.

mod auth;
mod handlers;

use crate::config::Config;
use crate::core::errors::CoordinatorError;
use crate::core::state::CoordinatorState;
use crate::core::tasks::sweeper::Sweeper;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Starts the coordinator: initializes state, spawns the sweeper, binds the
/// configured address, and serves until a shutdown signal arrives.
pub async fn run(config: Config) -> Result<(), CoordinatorError> {
    let host = config.host.clone();
    let port = config.port;
    let state = Arc::new(CoordinatorState::initialize(config).await?);

    let (shutdown_tx, sweeper_shutdown) = broadcast::channel(1);
    let sweeper = Sweeper::new(state.clone());
    tokio::spawn(sweeper.run(sweeper_shutdown));

    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "coordinator listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(());
        })
        .await
        .map_err(|e| CoordinatorError::Internal(format!("server error: {e}")))?;

    Ok(())
}

fn build_router(state: Arc<CoordinatorState>) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard::dashboard))
        .route("/health", get(handlers::dashboard::health))
        .route("/count", get(handlers::records::count))
        .route("/records/random", get(handlers::records::get_random))
        .route(
            "/records/by-pwd/{pwd}",
            get(handlers::records::get_by_passphrase),
        )
        .route("/records/{id}", get(handlers::records::get_by_id))
        .route("/work/stats", get(handlers::work::stats))
        .route("/work/request", post(handlers::work::request))
        .route("/work/result", post(handlers::work::result))
        .route("/work/found", post(handlers::work::found))
        .route("/work/reset-timeout", post(handlers::work::reset_timeout))
        .route("/work/reset-found", post(handlers::work::reset_found))
        .with_state(state)
}
