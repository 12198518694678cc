// src/core/liveness.rs

//! The liveness registry: a purely in-memory map of `worker_id -> last_seen`,
//! holding a 1-hour sliding window of recently active workers (§3, §4).

use dashmap::DashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Entries older than this are evicted lazily on every read.
const LIVENESS_WINDOW_MILLIS: i64 = 60 * 60 * 1000;

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_millis() as i64
}

#[derive(Default)]
pub struct LivenessRegistry {
    last_seen: DashMap<String, i64>,
}

impl LivenessRegistry {
    pub fn new() -> Self {
        Self {
            last_seen: DashMap::new(),
        }
    }

    /// Records that `worker_id` made a request right now.
    pub fn touch(&self, worker_id: &str) {
        self.last_seen.insert(worker_id.to_string(), now_millis());
    }

    /// Returns the worker ids active within the last hour, evicting anything
    /// older as it goes.
    pub fn active_worker_ids(&self) -> Vec<String> {
        let cutoff = now_millis() - LIVENESS_WINDOW_MILLIS;
        self.last_seen.retain(|_, last_seen| *last_seen >= cutoff);
        self.last_seen
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.active_worker_ids().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_then_read_reports_the_worker() {
        let registry = LivenessRegistry::new();
        registry.touch("worker-a");
        let active = registry.active_worker_ids();
        assert_eq!(active, vec!["worker-a".to_string()]);
    }

    #[test]
    fn stale_entries_are_evicted_on_read() {
        let registry = LivenessRegistry::new();
        registry
            .last_seen
            .insert("worker-old".to_string(), now_millis() - LIVENESS_WINDOW_MILLIS - 1);
        registry.touch("worker-new");
        let active = registry.active_worker_ids();
        assert_eq!(active, vec!["worker-new".to_string()]);
    }
}
