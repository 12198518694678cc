// src/core/tasks/sweeper.rs

//! The stale-lease sweeper: a periodic task that runs every 60 minutes
//! invoking `ReclaimStale(3600)` (§4.2).

use crate::core::state::CoordinatorState;
use crate::core::store::STALE_LEASE_SECONDS;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub struct Sweeper {
    state: Arc<CoordinatorState>,
}

impl Sweeper {
    pub fn new(state: Arc<CoordinatorState>) -> Self {
        Self { state }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        // The first tick fires immediately; skip it so the sweeper's cadence
        // actually matches "every 60 minutes" rather than also firing at boot.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.state.store.reclaim_stale(STALE_LEASE_SECONDS).await {
                        Ok(count) => info!(reclaimed = count, "stale-lease sweep completed"),
                        Err(e) => error!("stale-lease sweep failed, will retry next tick: {e}"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("stale-lease sweeper shutting down");
                    return;
                }
            }
        }
    }
}
