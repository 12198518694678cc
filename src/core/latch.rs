// src/core/latch.rs

//! The terminal "password found" latch: a durable one-shot flag backed by an
//! append-only marker file, consulted before every lease and re-asserted on
//! every result submission (§4.3).

use crate::core::errors::CoordinatorError;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub struct TerminalLatch {
    path: PathBuf,
    found: AtomicBool,
    /// Serializes appends so two concurrent confirmations don't interleave
    /// partial lines in the marker file.
    write_lock: Mutex<()>,
}

impl TerminalLatch {
    /// Loads the latch state from whether the marker file exists. Presence
    /// means "found"; absence means the search is still open.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let found = path.exists();
        Self {
            path,
            found: AtomicBool::new(found),
            write_lock: Mutex::new(()),
        }
    }

    /// Cheap, uncontended read used on the lease hot path.
    pub fn is_found(&self) -> bool {
        self.found.load(Ordering::SeqCst)
    }

    /// Sets the in-memory bit and appends an audit stanza to the marker file.
    /// Idempotent: calling this after the bit is already set still appends
    /// (intentional — see the double-reporting design note), it just never
    /// clears anything.
    pub async fn confirm(
        &self,
        passphrase: &str,
        worker_id: &str,
    ) -> Result<(), CoordinatorError> {
        self.found.store(true, Ordering::SeqCst);

        let _guard = self.write_lock.lock().await;
        let stanza = format!(
            "[{}] password found: \"{}\" reported by worker \"{}\"\n",
            Utc::now().to_rfc3339(),
            passphrase,
            worker_id
        );
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(stanza.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Resets the latch, backing up the prior marker content with a
    /// timestamped copy for audit before removing it (§4.3). Only reachable
    /// from `/work/reset-found` on a sample store.
    pub async fn reset(&self) -> Result<(), CoordinatorError> {
        let _guard = self.write_lock.lock().await;
        if self.path.exists() {
            let backup = backup_path(&self.path);
            tokio::fs::rename(&self.path, &backup).await?;
        }
        self.found.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn backup_path(original: &Path) -> PathBuf {
    let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let file_name = original
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("marker");
    original.with_file_name(format!("{file_name}.{timestamp}.bak"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_unset_when_marker_absent() {
        let dir = tempfile::tempdir().unwrap();
        let latch = TerminalLatch::load(dir.path().join("marker.txt"));
        assert!(!latch.is_found());
    }

    #[tokio::test]
    async fn confirm_sets_bit_and_appends_each_time() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker.txt");
        let latch = TerminalLatch::load(&marker);
        latch.confirm("target", "worker-1").await.unwrap();
        latch.confirm("target", "worker-1").await.unwrap();
        assert!(latch.is_found());
        let contents = tokio::fs::read_to_string(&marker).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn reset_clears_bit_and_backs_up_marker() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker.txt");
        let latch = TerminalLatch::load(&marker);
        latch.confirm("target", "worker-1").await.unwrap();
        latch.reset().await.unwrap();
        assert!(!latch.is_found());
        assert!(!marker.exists());
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut saw_backup = false;
        while let Some(entry) = entries.next_entry().await.unwrap() {
            if entry.file_name().to_string_lossy().ends_with(".bak") {
                saw_backup = true;
            }
        }
        assert!(saw_backup);
    }
}
