// src/worker/config.rs

//! Loads and validates the worker's configuration from the process
//! environment: `SERVER_URL`, `API_TOKEN`, `MAX_WORKERS`, `CPU_USAGE_RATIO`,
//! `LOG_LEVEL` (§6). `WORKER_ID` is an implementation detail this crate adds
//! so a worker keeps the same self-assigned opaque id (§1) across restarts.

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default = "default_server_url")]
    server_url: String,
    #[serde(default)]
    api_token: Option<String>,
    #[serde(default)]
    max_workers: Option<usize>,
    #[serde(default = "default_cpu_usage_ratio")]
    cpu_usage_ratio: f64,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    worker_id: Option<String>,
}

fn default_server_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_cpu_usage_ratio() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub server_url: String,
    pub api_token: Option<String>,
    pub max_workers: Option<usize>,
    pub cpu_usage_ratio: f64,
    pub log_level: String,
    pub worker_id: String,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to assemble worker configuration from the environment")?
            .try_deserialize()
            .context("failed to parse worker configuration values")?;

        let worker_id = match raw.worker_id {
            Some(id) if !id.is_empty() => id,
            _ => load_or_create_worker_id()?,
        };

        let config = Self {
            server_url: raw.server_url,
            api_token: raw.api_token.filter(|t| !t.is_empty()),
            max_workers: raw.max_workers.filter(|n| *n > 0),
            cpu_usage_ratio: raw.cpu_usage_ratio,
            log_level: raw.log_level,
            worker_id,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(anyhow!("SERVER_URL must not be empty"));
        }
        if !(self.cpu_usage_ratio > 0.0 && self.cpu_usage_ratio <= 1.0) {
            return Err(anyhow!("CPU_USAGE_RATIO must be within (0, 1]"));
        }
        Ok(())
    }

    /// The number of execution units this worker hosts: `W = min(cpu_count,
    /// configured_max)`, where the locally discovered `cpu_count` is first
    /// scaled by the advisory `cpu_usage_ratio` (§4.6).
    pub fn local_parallelism(&self) -> usize {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let scaled = ((available as f64) * self.cpu_usage_ratio).floor() as usize;
        let scaled = scaled.max(1);
        match self.max_workers {
            Some(max) => scaled.min(max),
            None => scaled,
        }
    }

    /// The `cpuCount` this worker advertises on `/work/request`, which the
    /// coordinator uses to size the batch it leases back (§4.1).
    pub fn cpu_count(&self) -> i64 {
        self.local_parallelism() as i64
    }
}

fn worker_id_path() -> PathBuf {
    PathBuf::from(".worker_id")
}

/// Reads the persisted worker id if present; otherwise generates one and
/// writes it so subsequent restarts of this same process reuse it.
fn load_or_create_worker_id() -> Result<String> {
    let path = worker_id_path();
    if let Ok(existing) = std::fs::read_to_string(&path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    let id = format!("worker-{}", uuid::Uuid::new_v4());
    std::fs::write(&path, &id).context("failed to persist generated worker id")?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> WorkerConfig {
        WorkerConfig {
            server_url: "http://127.0.0.1:8080".into(),
            api_token: None,
            max_workers: None,
            cpu_usage_ratio: 1.0,
            log_level: "info".into(),
            worker_id: "worker-test".into(),
        }
    }

    #[test]
    fn validate_rejects_out_of_range_ratio() {
        let mut cfg = base_config();
        cfg.cpu_usage_ratio = 0.0;
        assert!(cfg.validate().is_err());
        cfg.cpu_usage_ratio = 1.5;
        assert!(cfg.validate().is_err());
        cfg.cpu_usage_ratio = 1.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn local_parallelism_is_clamped_by_max_workers() {
        let mut cfg = base_config();
        cfg.max_workers = Some(1);
        assert_eq!(cfg.local_parallelism(), 1);
    }

    #[test]
    fn local_parallelism_is_never_zero() {
        let mut cfg = base_config();
        cfg.cpu_usage_ratio = 0.01;
        assert!(cfg.local_parallelism() >= 1);
    }
}
