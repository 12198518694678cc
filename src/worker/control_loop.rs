// src/worker/control_loop.rs

//! The worker's outer lease -> verify -> report cycle (§4.6), with backoff
//! on empty leases and network errors, shutdown on the latch signal, and a
//! bounded found-confirm retry sequence once a match is reported.

use super::client::CoordinatorClient;
use super::config::WorkerConfig;
use super::runtime;
use anyhow::{Context, Result, anyhow};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

const EMPTY_LEASE_BACKOFF: Duration = Duration::from_secs(10);
const NETWORK_ERROR_BACKOFF: Duration = Duration::from_secs(10);
const CONFIRM_BACKOFF: Duration = Duration::from_secs(5);
const CONFIRM_ATTEMPTS: u32 = 5;
const CONFIRM_FALLBACK_BACKOFF: Duration = Duration::from_secs(10);
const CONFIRM_FALLBACK_ATTEMPTS: u32 = 3;

/// Runs the worker until the coordinator's latch signals the password has
/// been found, or an unrecoverable found-confirm failure occurs.
pub async fn run(config: WorkerConfig) -> Result<()> {
    let client = CoordinatorClient::new(&config.server_url, config.api_token.clone())?;
    let unit_count = config.local_parallelism();
    let pool = std::sync::Arc::new(
        runtime::build_pool(unit_count).context("failed to start worker execution pool")?,
    );
    info!(
        worker_id = %config.worker_id,
        units = unit_count,
        server = %config.server_url,
        "worker control loop starting"
    );

    loop {
        let lease = match client.lease(config.cpu_count(), &config.worker_id).await {
            Ok(lease) => lease,
            Err(e) => {
                warn!("lease request failed: {e}, retrying in {NETWORK_ERROR_BACKOFF:?}");
                sleep(NETWORK_ERROR_BACKOFF).await;
                continue;
            }
        };

        if lease.password_found == Some(true) {
            info!("coordinator reports the password is already found, shutting down");
            return Ok(());
        }

        if lease.passwords.is_empty() {
            sleep(EMPTY_LEASE_BACKOFF).await;
            continue;
        }

        let Some(wallet) = lease.encrypt.clone() else {
            warn!("lease response carried no wallet descriptor, retrying in {EMPTY_LEASE_BACKOFF:?}");
            sleep(EMPTY_LEASE_BACKOFF).await;
            continue;
        };
        let batch_id = lease.batch_id.clone().unwrap_or_default();
        let passwords = lease.passwords.clone();

        info!(batch_id = %batch_id, count = passwords.len(), "leased batch, verifying");

        let verify_wallet = wallet.clone();
        let verify_passwords = passwords.clone();
        let pool = pool.clone();
        let found = tokio::task::spawn_blocking(move || {
            runtime::run_batch(&pool, &verify_passwords, &verify_wallet)
        })
        .await
        .context("verification task panicked")?;

        match found {
            Some(passphrase) => {
                info!(passphrase = %passphrase, "match found, reporting and confirming");
                report_and_confirm(&client, &config, &batch_id, &passphrase, &passwords).await?;
                return Ok(());
            }
            None => {
                if let Err(e) = client
                    .report_result(&batch_id, &config.worker_id, false, None, &passwords)
                    .await
                {
                    warn!("failure report for batch {batch_id} failed: {e}, will retry on next lease cycle");
                }
            }
        }
    }
}

/// Submits the success report, then invokes confirm-found up to
/// [`CONFIRM_ATTEMPTS`] times with a short backoff; if still failing, falls
/// back to a longer-period retry for [`CONFIRM_FALLBACK_ATTEMPTS`] more
/// attempts before giving up (§4.6 step 4).
async fn report_and_confirm(
    client: &CoordinatorClient,
    config: &WorkerConfig,
    batch_id: &str,
    passphrase: &str,
    passwords: &[String],
) -> Result<()> {
    if let Err(e) = client
        .report_result(batch_id, &config.worker_id, true, Some(passphrase), passwords)
        .await
    {
        warn!("success report for batch {batch_id} failed: {e}");
    }

    for attempt in 1..=CONFIRM_ATTEMPTS {
        match client.confirm_found(&config.worker_id, passphrase).await {
            Ok(_) => {
                info!("found-confirm acknowledged by coordinator");
                return Ok(());
            }
            Err(e) => {
                warn!("confirm-found attempt {attempt}/{CONFIRM_ATTEMPTS} failed: {e}");
                sleep(CONFIRM_BACKOFF).await;
            }
        }
    }

    for attempt in 1..=CONFIRM_FALLBACK_ATTEMPTS {
        match client.confirm_found(&config.worker_id, passphrase).await {
            Ok(_) => {
                info!("found-confirm acknowledged on fallback retry");
                return Ok(());
            }
            Err(e) => {
                warn!("fallback confirm-found attempt {attempt}/{CONFIRM_FALLBACK_ATTEMPTS} failed: {e}");
                sleep(CONFIRM_FALLBACK_BACKOFF).await;
            }
        }
    }

    error!("unable to confirm the found password after all retries, exiting");
    Err(anyhow!("exhausted found-confirm retries for passphrase match"))
}
