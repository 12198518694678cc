// src/core/state.rs

//! Assembles the coordinator's shared, mutable state: the candidate store,
//! the terminal latch, the liveness registry, and the stats cache, plus the
//! read-only wallet descriptor and configuration every handler needs.

use crate::config::Config;
use crate::core::errors::CoordinatorError;
use crate::core::latch::TerminalLatch;
use crate::core::liveness::LivenessRegistry;
use crate::core::stats::StatsCache;
use crate::core::store::CandidateStore;
use crate::core::wallet::WalletDescriptor;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

pub struct CoordinatorState {
    pub store: CandidateStore,
    pub latch: TerminalLatch,
    pub liveness: LivenessRegistry,
    pub stats_cache: StatsCache,
    pub wallet: WalletDescriptor,
    pub config: Config,
    pub startup_time_millis: i64,
}

impl CoordinatorState {
    pub async fn initialize(config: Config) -> Result<Self, CoordinatorError> {
        let store = CandidateStore::open(config.db_path()).await?;
        let latch = TerminalLatch::load(marker_path(&config.db_name));
        let startup_time_millis = load_or_write_startup_time(&startup_path(&config.db_name))?;
        let wallet = WalletDescriptor::load(&config.wallet_file)?;

        info!(
            db = %config.db_name,
            reset_allowed = config.reset_allowed(),
            "coordinator state initialized"
        );

        Ok(Self {
            store,
            latch,
            liveness: LivenessRegistry::new(),
            stats_cache: StatsCache::new(),
            wallet,
            config,
            startup_time_millis,
        })
    }

    /// Milliseconds elapsed since `startup_time_millis`; recomputed on every
    /// stats read per §4.4.
    pub fn uptime_millis(&self) -> i64 {
        (now_millis() - self.startup_time_millis).max(0)
    }

    pub fn uptime_formatted(&self) -> String {
        format_duration_millis(self.uptime_millis())
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_millis() as i64
}

fn marker_path(db_name: &str) -> String {
    format!("{db_name}.marker.txt")
}

fn startup_path(db_name: &str) -> String {
    format!("{db_name}.startup.txt")
}

/// Reads the single-line startup-time artifact; if it is missing or
/// unparseable, writes the current time and uses that instead (§4.4).
fn load_or_write_startup_time(path: &str) -> Result<i64, CoordinatorError> {
    if let Ok(contents) = std::fs::read_to_string(path)
        && let Ok(parsed) = contents.trim().parse::<i64>()
    {
        return Ok(parsed);
    }
    warn!(path, "startup-time artifact missing or unparseable, recording current time");
    let now = now_millis();
    std::fs::write(path, now.to_string())?;
    Ok(now)
}

fn format_duration_millis(millis: i64) -> String {
    let total_seconds = millis / 1000;
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_uptime_components() {
        assert_eq!(format_duration_millis(5_000), "5s");
        assert_eq!(format_duration_millis(65_000), "1m 5s");
        assert_eq!(format_duration_millis(3_665_000), "1h 1m 5s");
        assert_eq!(format_duration_millis(90_065_000), "1d 1h 1m 5s");
    }
}
