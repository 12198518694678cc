// src/core/stats.rs

//! The stats cache: an adaptive memoization of the aggregate progress counts,
//! sized to the store's cardinality, with at-most-one recomputation in
//! flight (§4.4).

use crate::core::errors::CoordinatorError;
use crate::core::store::{CandidateStore, StatusCounts};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub uncheck: i64,
    pub checking: i64,
    pub checked: i64,
    pub timeout: i64,
    pub total: i64,
    pub progress: String,
}

impl StatsSnapshot {
    fn from_counts(counts: StatusCounts) -> Self {
        let progress = if counts.total == 0 {
            "0.00".to_string()
        } else {
            format!(
                "{:.2}",
                (counts.checked as f64 / counts.total as f64) * 100.0
            )
        };
        Self {
            uncheck: counts.uncheck,
            checking: counts.checking,
            checked: counts.checked,
            timeout: counts.timeout,
            total: counts.total,
            progress,
        }
    }
}

struct CacheEntry {
    snapshot: StatsSnapshot,
    computed_at: Instant,
    ttl: Duration,
}

#[derive(Default)]
struct Inner {
    cached: Option<CacheEntry>,
    computing: bool,
}

/// `T <= 10_000`: no caching. Else `min(60, floor(T / 1_000_000))` minutes.
fn ttl_for_total(total: i64) -> Duration {
    if total <= 10_000 {
        Duration::ZERO
    } else {
        let minutes = (total / 1_000_000).clamp(0, 60);
        Duration::from_secs(minutes as u64 * 60)
    }
}

pub struct StatsCache {
    inner: Mutex<Inner>,
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Returns a fresh-enough snapshot. At most one recomputation is ever in
    /// flight; a reader that arrives while another is recomputing gets the
    /// previous snapshot if one exists, otherwise `StatsUpdating`.
    pub async fn get(&self, store: &CandidateStore) -> Result<StatsSnapshot, CoordinatorError> {
        {
            let guard = self.inner.lock().await;
            if let Some(entry) = &guard.cached
                && entry.computed_at.elapsed() < entry.ttl
            {
                return Ok(entry.snapshot.clone());
            }
        }

        let mut guard = self.inner.lock().await;
        // Re-check under the lock: another task may have just refreshed it.
        if let Some(entry) = &guard.cached
            && entry.computed_at.elapsed() < entry.ttl
        {
            return Ok(entry.snapshot.clone());
        }
        if guard.computing {
            return match &guard.cached {
                Some(entry) => Ok(entry.snapshot.clone()),
                None => Err(CoordinatorError::StatsUpdating),
            };
        }
        guard.computing = true;
        drop(guard);

        let result = store.count_by_status().await;

        let mut guard = self.inner.lock().await;
        guard.computing = false;
        match result {
            Ok(counts) => {
                let snapshot = StatsSnapshot::from_counts(counts);
                guard.cached = Some(CacheEntry {
                    snapshot: snapshot.clone(),
                    computed_at: Instant::now(),
                    ttl: ttl_for_total(counts.total),
                });
                Ok(snapshot)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_boundaries_match_spec_examples() {
        assert_eq!(ttl_for_total(10_000), Duration::ZERO);
        assert_eq!(ttl_for_total(2_500_000), Duration::from_secs(120));
        assert_eq!(ttl_for_total(120_000_000), Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn get_recomputes_when_store_is_small() {
        let store = CandidateStore::open(":memory:").await.unwrap();
        store.insert_batch(&["aa".into()]).await.unwrap();
        let cache = StatsCache::new();
        let first = cache.get(&store).await.unwrap();
        assert_eq!(first.total, 1);
        store.insert_batch(&["bb".into()]).await.unwrap();
        // Below the 10_000 row threshold the cache never serves stale data.
        let second = cache.get(&store).await.unwrap();
        assert_eq!(second.total, 2);
    }
}
