// src/config.rs

//! Loads and validates the coordinator's configuration from the process environment.

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

/// The designated name fragment that marks a store file as a disposable "sample"
/// store. Only stores whose `db_name` contains this fragment permit the
/// destructive reset endpoints (`/work/reset-timeout` is unguarded; `/work/reset-found`
/// is guarded — see §4.5 of the request surface).
const SAMPLE_STORE_MARKER: &str = "sample";

/// Raw, directly-deserializable view of the environment. Every field has a
/// permissive default so that `Config::from_env` never fails on a merely
/// incomplete environment; `Config::validate` is where hard requirements live.
#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_db_name")]
    db_name: String,
    #[serde(default)]
    api_token: Option<String>,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_wallet_file")]
    wallet_file: String,
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_db_name() -> String {
    "lucky.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_wallet_file() -> String {
    "wallet.json".to_string()
}

/// The coordinator's fully validated configuration, built from the environment
/// variables enumerated for the request surface: `PORT`, `HOST`, `DB_NAME`,
/// `API_TOKEN`, `LOG_LEVEL`. `WALLET_FILE` is an implementation detail of this
/// crate (the spec leaves the wallet descriptor's loading source unspecified)
/// that points at the JSON file produced by the (out of scope) candidate
/// generator tool.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub db_name: String,
    pub api_token: Option<String>,
    pub log_level: String,
    pub wallet_file: String,
}

impl Config {
    /// Reads every relevant environment variable and validates the result.
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to assemble configuration from the environment")?
            .try_deserialize()
            .context("failed to parse configuration values")?;

        let config = Self {
            port: raw.port,
            host: raw.host,
            db_name: raw.db_name,
            api_token: raw.api_token.filter(|t| !t.is_empty()),
            log_level: raw.log_level,
            wallet_file: raw.wallet_file,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(anyhow!("HOST must not be empty"));
        }
        if self.db_name.is_empty() {
            return Err(anyhow!("DB_NAME must not be empty"));
        }
        Ok(())
    }

    /// Whether `self.db_name` names a disposable sample store, which is the sole
    /// gate on `/work/reset-found` (§4.5).
    pub fn reset_allowed(&self) -> bool {
        self.db_name.contains(SAMPLE_STORE_MARKER)
    }

    /// A path derived from `db_name` for the sqlite file itself.
    pub fn db_path(&self) -> &str {
        &self.db_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_allowed_matches_sample_marker() {
        let mut cfg = Config {
            port: 8080,
            host: "0.0.0.0".into(),
            db_name: "lucky.db".into(),
            api_token: None,
            log_level: "info".into(),
            wallet_file: "wallet.json".into(),
        };
        assert!(!cfg.reset_allowed());
        cfg.db_name = "lucky-sample.db".into();
        assert!(cfg.reset_allowed());
    }

    #[test]
    fn validate_rejects_empty_host() {
        let cfg = Config {
            port: 8080,
            host: String::new(),
            db_name: "lucky.db".into(),
            api_token: None,
            log_level: "info".into(),
            wallet_file: "wallet.json".into(),
        };
        assert!(cfg.validate().is_err());
    }
}
