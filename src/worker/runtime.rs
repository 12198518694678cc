// src/worker/runtime.rs

//! The worker's parallel fan-out (§4.6): a leased batch is partitioned into
//! `W` contiguous chunks, one per execution unit, each of which runs the
//! verification pipeline strictly CPU-bound and checks a shared cancellation
//! flag between trials so peers stop starting new trials once any unit
//! matches.

use crate::core::wallet::WalletDescriptor;
use crate::verify::verify_candidate;
use anyhow::{Context, Result};
use rayon::ThreadPool;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Trials between each advisory progress log line (§4.7).
const PROGRESS_LOG_INTERVAL: usize = 1_000;

/// Builds the dedicated execution pool a worker runs every batch through.
/// Built once at startup so a transient failure surfaces before the worker
/// starts leasing batches, rather than aborting a blocking task mid-batch.
pub fn build_pool(unit_count: usize) -> Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(unit_count.max(1))
        .build()
        .context("failed to build worker execution pool")
}

/// Runs the verification pipeline over every passphrase in `passphrases`,
/// fanned out across `pool`'s execution units. Returns the first matching
/// passphrase, if any; `None` once the whole batch has been tried without a
/// match.
pub fn run_batch(pool: &ThreadPool, passphrases: &[String], wallet: &WalletDescriptor) -> Option<String> {
    if passphrases.is_empty() {
        return None;
    }
    let chunk_size = passphrases.len().div_ceil(pool.current_num_threads()).max(1);
    let chunks: Vec<&[String]> = passphrases.chunks(chunk_size).collect();
    let found = Arc::new(AtomicBool::new(false));

    pool.install(|| {
        chunks
            .par_iter()
            .find_map_any(|chunk| search_chunk(chunk, wallet, &found))
    })
}

/// Tries every passphrase in `chunk` in order. Checks `found` before each
/// trial (not mid-trial): a peer that already matched stops this unit from
/// starting a new one, but never aborts a trial already in flight.
fn search_chunk(chunk: &[String], wallet: &WalletDescriptor, found: &AtomicBool) -> Option<String> {
    for (index, passphrase) in chunk.iter().enumerate() {
        if found.load(Ordering::Relaxed) {
            return None;
        }
        if verify_candidate(passphrase, wallet) {
            found.store(true, Ordering::Relaxed);
            return Some(passphrase.clone());
        }
        if (index + 1) % PROGRESS_LOG_INTERVAL == 0 {
            debug!(tried = index + 1, chunk_len = chunk.len(), "verification progress");
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::Aes256;
    use cbc::cipher::block_padding::NoPadding;
    use cbc::cipher::{BlockEncryptMut, KeyIvInit};
    use libsecp256k1::{PublicKey, SecretKey};
    use sha2::{Digest, Sha256, Sha512};

    type Aes256CbcEnc = cbc::Encryptor<Aes256>;

    fn encrypt_no_padding(key: &[u8; 32], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
        let mut buf = plaintext.to_vec();
        Aes256CbcEnc::new(key.into(), iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, plaintext.len())
            .unwrap()
            .to_vec()
    }

    fn wallet_for_passphrase(passphrase: &str) -> WalletDescriptor {
        let salt = vec![0x11u8; 8];
        let derivation_iterations = 2;

        let mut buf = passphrase.as_bytes().to_vec();
        buf.extend_from_slice(&salt);
        for _ in 0..derivation_iterations {
            buf = Sha512::digest(&buf).to_vec();
        }
        let derived_key: [u8; 32] = buf[0..32].try_into().unwrap();
        let outer_iv: [u8; 16] = buf[32..48].try_into().unwrap();

        let secret_key = SecretKey::parse_slice(&[0x5Bu8; 32]).unwrap();
        let public_key = PublicKey::from_secret_key(&secret_key);
        let uncompressed_public_key = public_key.serialize().to_vec();

        let master_key = [0x33u8; 32];
        let encrypted_master_key = encrypt_no_padding(&derived_key, &outer_iv, &master_key);

        let inner_iv_full = Sha256::digest(Sha256::digest(&uncompressed_public_key));
        let inner_iv: [u8; 16] = inner_iv_full[0..16].try_into().unwrap();
        let encrypted_private_key = encrypt_no_padding(&master_key, &inner_iv, &[0x5Bu8; 32]);

        WalletDescriptor {
            salt,
            derivation_iterations,
            encrypted_master_key,
            encrypted_private_key,
            uncompressed_public_key,
        }
    }

    #[test]
    fn finds_the_matching_passphrase_across_chunks() {
        let wallet = wallet_for_passphrase("target");
        let passphrases: Vec<String> = vec!["aa", "bb", "target", "cc", "dd", "ee"]
            .into_iter()
            .map(String::from)
            .collect();
        let pool = build_pool(3).unwrap();
        let found = run_batch(&pool, &passphrases, &wallet);
        assert_eq!(found.as_deref(), Some("target"));
    }

    #[test]
    fn returns_none_when_no_candidate_matches() {
        let wallet = wallet_for_passphrase("target");
        let passphrases: Vec<String> = vec!["aa", "bb", "cc"].into_iter().map(String::from).collect();
        let pool = build_pool(2).unwrap();
        assert!(run_batch(&pool, &passphrases, &wallet).is_none());
    }

    #[test]
    fn empty_batch_returns_none() {
        let wallet = wallet_for_passphrase("target");
        let pool = build_pool(4).unwrap();
        assert!(run_batch(&pool, &[], &wallet).is_none());
    }

    #[test]
    fn build_pool_never_uses_zero_threads() {
        assert!(build_pool(0).is_ok());
    }
}
