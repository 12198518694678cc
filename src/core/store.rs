// src/core/store.rs

//! The candidate store: a durable table of `(id, passphrase, status, updated_at)`
//! rows backed by sqlite, exposing the batched reservation and terminal update
//! primitives described in §4.1.

use crate::core::errors::CoordinatorError;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{FromRow, QueryBuilder, Row, SqlitePool};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

pub const STATUS_UNCHECKED: i64 = 0;
pub const STATUS_CHECKING: i64 = 1;
pub const STATUS_CHECKED: i64 = 2;

/// A candidate's CHECKING lease is reclaimed once it has sat unreported for
/// this many seconds (§4.2, §5).
pub const STALE_LEASE_SECONDS: i64 = 3600;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CandidateRow {
    pub id: i64,
    pub pwd: String,
    pub status: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusCounts {
    pub uncheck: i64,
    pub checking: i64,
    pub checked: i64,
    pub timeout: i64,
    pub total: i64,
}

fn now_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs() as i64
}

/// `n = max(100, cpu_count * 100)`; non-positive `cpu_count` is treated as 1 (§4.1).
pub fn batch_size_for(cpu_count: i64) -> i64 {
    let cpu_count = if cpu_count <= 0 { 1 } else { cpu_count };
    std::cmp::max(100, cpu_count * 100)
}

#[derive(Clone)]
pub struct CandidateStore {
    pool: SqlitePool,
}

impl CandidateStore {
    /// Opens (creating if absent) the sqlite file at `path` and runs the
    /// schema migration. Mirrors the WAL + busy-timeout connection tuning a
    /// long-lived embedded store needs under concurrent writers.
    pub async fn open(path: &str) -> Result<Self, CoordinatorError> {
        let dsn = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{path}")
        };
        let options = SqliteConnectOptions::from_str(&dsn)
            .map_err(|e| CoordinatorError::Internal(format!("invalid store path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        // A shared in-memory database only stays coherent across a single
        // connection; real deployments always pass a file path, so this only
        // matters for the in-process test suite.
        let max_connections = if path == ":memory:" { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), CoordinatorError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pwd TEXT UNIQUE NOT NULL,
                status INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_status_id ON records(status, id)")
            .execute(&self.pool)
            .await?;

        info!("candidate store schema ready");
        Ok(())
    }

    /// Idempotent insertion of passphrases in a single atomic transaction.
    /// Duplicates are silently ignored via the `pwd` UNIQUE constraint.
    pub async fn insert_batch(&self, passphrases: &[String]) -> Result<u64, CoordinatorError> {
        let now = now_seconds();
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;
        for pwd in passphrases {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO records (pwd, status, updated_at) VALUES (?, 0, ?)",
            )
            .bind(pwd)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Selects up to `n` UNCHECKED rows ordered by ascending id and flips them
    /// to CHECKING in the same statement, so two concurrent reservations can
    /// never observe (let alone claim) the same row — sqlite's single-writer
    /// semantics make this `UPDATE ... RETURNING` linearizable (§5, ordering
    /// guarantee a).
    pub async fn reserve_batch(&self, n: i64) -> Result<Vec<CandidateRow>, CoordinatorError> {
        let now = now_seconds();
        let rows = sqlx::query_as::<_, CandidateRow>(
            "UPDATE records SET status = ?, updated_at = ?
             WHERE id IN (SELECT id FROM records WHERE status = ? ORDER BY id ASC LIMIT ?)
             RETURNING id, pwd, status, updated_at",
        )
        .bind(STATUS_CHECKING)
        .bind(now)
        .bind(STATUS_UNCHECKED)
        .bind(n)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Flips rows whose passphrase is in `passphrases` to CHECKED. Unknown
    /// passphrases are no-ops; an already-CHECKED row is left untouched so a
    /// duplicate report is idempotent (§8, round-trip property).
    pub async fn mark_checked_by_passphrase(
        &self,
        passphrases: &[String],
    ) -> Result<u64, CoordinatorError> {
        if passphrases.is_empty() {
            return Ok(0);
        }
        let now = now_seconds();
        let mut builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("UPDATE records SET status = ");
        builder.push_bind(STATUS_CHECKED);
        builder.push(", updated_at = ");
        builder.push_bind(now);
        builder.push(" WHERE status != ");
        builder.push_bind(STATUS_CHECKED);
        builder.push(" AND pwd IN (");
        let mut separated = builder.separated(", ");
        for pwd in passphrases {
            separated.push_bind(pwd);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Flips all CHECKING rows older than `age_seconds` back to UNCHECKED,
    /// returning the number reclaimed.
    pub async fn reclaim_stale(&self, age_seconds: i64) -> Result<u64, CoordinatorError> {
        let now = now_seconds();
        let cutoff = now - age_seconds;
        let result = sqlx::query(
            "UPDATE records SET status = ?, updated_at = ? WHERE status = ? AND updated_at < ?",
        )
        .bind(STATUS_UNCHECKED)
        .bind(now)
        .bind(STATUS_CHECKING)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Flips every row back to UNCHECKED. Guarded by policy at the caller
    /// (only reachable on a designated sample store, §4.5).
    pub async fn reset_all(&self) -> Result<u64, CoordinatorError> {
        let now = now_seconds();
        let result = sqlx::query("UPDATE records SET status = ?, updated_at = ?")
            .bind(STATUS_UNCHECKED)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Single-scan aggregation producing every §3 snapshot field except the
    /// liveness list and uptime, which are never cached (§4.4).
    pub async fn count_by_status(&self) -> Result<StatusCounts, CoordinatorError> {
        let timeout_cutoff = now_seconds() - STALE_LEASE_SECONDS;
        let row = sqlx::query(
            "SELECT
                SUM(CASE WHEN status = ? THEN 1 ELSE 0 END) AS uncheck,
                SUM(CASE WHEN status = ? THEN 1 ELSE 0 END) AS checking,
                SUM(CASE WHEN status = ? THEN 1 ELSE 0 END) AS checked,
                SUM(CASE WHEN status = ? AND updated_at < ? THEN 1 ELSE 0 END) AS timeout,
                COUNT(*) AS total
             FROM records",
        )
        .bind(STATUS_UNCHECKED)
        .bind(STATUS_CHECKING)
        .bind(STATUS_CHECKED)
        .bind(STATUS_CHECKING)
        .bind(timeout_cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(StatusCounts {
            uncheck: row.try_get::<Option<i64>, _>("uncheck")?.unwrap_or(0),
            checking: row.try_get::<Option<i64>, _>("checking")?.unwrap_or(0),
            checked: row.try_get::<Option<i64>, _>("checked")?.unwrap_or(0),
            timeout: row.try_get::<Option<i64>, _>("timeout")?.unwrap_or(0),
            total: row.try_get("total")?,
        })
    }

    /// A cheap row count for `/count`, independent of the stats cache's TTL.
    pub async fn count_all(&self) -> Result<i64, CoordinatorError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<CandidateRow>, CoordinatorError> {
        let row = sqlx::query_as::<_, CandidateRow>(
            "SELECT id, pwd, status, updated_at FROM records WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_by_passphrase(
        &self,
        pwd: &str,
    ) -> Result<Option<CandidateRow>, CoordinatorError> {
        let row = sqlx::query_as::<_, CandidateRow>(
            "SELECT id, pwd, status, updated_at FROM records WHERE pwd = ?",
        )
        .bind(pwd)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_random(&self) -> Result<Option<CandidateRow>, CoordinatorError> {
        let row = sqlx::query_as::<_, CandidateRow>(
            "SELECT id, pwd, status, updated_at FROM records ORDER BY RANDOM() LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> CandidateStore {
        CandidateStore::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn insert_is_idempotent() {
        let store = temp_store().await;
        let batch = vec!["aa".to_string(), "bb".to_string()];
        let first = store.insert_batch(&batch).await.unwrap();
        let second = store.insert_batch(&batch).await.unwrap();
        assert_eq!(first, 2);
        assert_eq!(second, 0);
        let counts = store.count_by_status().await.unwrap();
        assert_eq!(counts.total, 2);
    }

    #[tokio::test]
    async fn reserve_batch_flips_status_and_respects_limit() {
        let store = temp_store().await;
        store
            .insert_batch(&["aa".into(), "bb".into(), "cc".into()])
            .await
            .unwrap();
        let reserved = store.reserve_batch(2).await.unwrap();
        assert_eq!(reserved.len(), 2);
        assert!(reserved.iter().all(|r| r.status == STATUS_CHECKING));
        let counts = store.count_by_status().await.unwrap();
        assert_eq!(counts.checking, 2);
        assert_eq!(counts.uncheck, 1);
    }

    #[tokio::test]
    async fn mark_checked_is_idempotent() {
        let store = temp_store().await;
        store.insert_batch(&["aa".into()]).await.unwrap();
        store.reserve_batch(10).await.unwrap();
        let first = store
            .mark_checked_by_passphrase(&["aa".into()])
            .await
            .unwrap();
        let second = store
            .mark_checked_by_passphrase(&["aa".into()])
            .await
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn reclaim_stale_requires_age_threshold() {
        let store = temp_store().await;
        store.insert_batch(&["aa".into()]).await.unwrap();
        store.reserve_batch(10).await.unwrap();
        let reclaimed_immediately = store.reclaim_stale(STALE_LEASE_SECONDS).await.unwrap();
        assert_eq!(reclaimed_immediately, 0);
        let reclaimed_with_zero_age = store.reclaim_stale(0).await.unwrap();
        assert_eq!(reclaimed_with_zero_age, 1);
    }

    #[test]
    fn batch_size_follows_clamp_rules() {
        assert_eq!(batch_size_for(0), 100);
        assert_eq!(batch_size_for(-5), 100);
        assert_eq!(batch_size_for(1), 100);
        assert_eq!(batch_size_for(8), 800);
    }
}
