// src/verify.rs

//! The verification pipeline (§4.7): the fixed cryptographic chain realizing
//! a single candidate trial. Shared between the coordinator (which only
//! needs the wallet descriptor's shape) and the worker (which runs this in
//! its hot loop).

use crate::core::wallet::WalletDescriptor;
use aes::Aes256;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use libsecp256k1::{PublicKey, SecretKey};
use sha2::{Digest, Sha256, Sha512};

type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Runs the full five-step chain for a single candidate passphrase. Any
/// arithmetic or cipher failure along the way is folded into `false` — never
/// propagated — per §4.7's "non-match, never a fatal error" rule.
pub fn verify_candidate(passphrase: &str, wallet: &WalletDescriptor) -> bool {
    try_verify(passphrase, wallet).unwrap_or(false)
}

fn try_verify(passphrase: &str, wallet: &WalletDescriptor) -> Option<bool> {
    // Step 1: derive the key/IV material by iterated SHA-512.
    let mut buf = Vec::with_capacity(passphrase.len() + wallet.salt.len());
    buf.extend_from_slice(passphrase.as_bytes());
    buf.extend_from_slice(&wallet.salt);
    for _ in 0..wallet.derivation_iterations {
        buf = Sha512::digest(&buf).to_vec();
    }
    if buf.len() < 48 {
        return Some(false);
    }
    let derived_key = &buf[0..32];
    let outer_iv = &buf[32..48];

    // Step 2: decrypt the master key.
    let master_key_buf = decrypt_cbc_no_padding(derived_key, outer_iv, &wallet.encrypted_master_key)?;
    if master_key_buf.len() < 32 {
        return Some(false);
    }
    let master_key = &master_key_buf[0..32];

    // Step 3: derive the inner IV from the double SHA-256 of the public key.
    let inner_iv_full = Sha256::digest(Sha256::digest(&wallet.uncompressed_public_key));
    let inner_iv = &inner_iv_full[0..16];

    // Step 4: decrypt the private key.
    let priv_key_buf =
        decrypt_cbc_no_padding(master_key, inner_iv, &wallet.encrypted_private_key)?;
    if priv_key_buf.len() < 32 {
        return Some(false);
    }
    let priv_key_bytes = &priv_key_buf[0..32];

    // Step 5: validate the scalar and compare derived public keys byte-exactly.
    let secret_key = SecretKey::parse_slice(priv_key_bytes).ok()?;
    let public_key = PublicKey::from_secret_key(&secret_key);
    let computed = public_key.serialize();

    Some(computed.as_slice() == wallet.uncompressed_public_key.as_slice())
}

/// AES-256-CBC with padding disabled. Must succeed on any 16-byte-aligned
/// ciphertext regardless of content; anything else (misaligned length, bad
/// key/iv size) is treated as "no plaintext", which the caller folds into a
/// non-match.
fn decrypt_cbc_no_padding(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Option<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return None;
    }
    let key: [u8; 32] = key.try_into().ok()?;
    let iv: [u8; 16] = iv.try_into().ok()?;

    let mut buf = ciphertext.to_vec();
    let plaintext = Aes256CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .ok()?;
    Some(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc::cipher::BlockEncryptMut;

    type Aes256CbcEnc = cbc::Encryptor<Aes256>;

    fn encrypt_no_padding(key: &[u8; 32], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
        let mut buf = plaintext.to_vec();
        Aes256CbcEnc::new(key.into(), iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, plaintext.len())
            .unwrap()
            .to_vec()
    }

    /// Builds a wallet descriptor whose correct passphrase is known, by
    /// running the forward direction of the same chain the pipeline reverses.
    fn wallet_for_passphrase(passphrase: &str) -> WalletDescriptor {
        let salt = vec![0x11u8; 8];
        let derivation_iterations = 4;

        let mut buf = passphrase.as_bytes().to_vec();
        buf.extend_from_slice(&salt);
        for _ in 0..derivation_iterations {
            buf = Sha512::digest(&buf).to_vec();
        }
        let derived_key: [u8; 32] = buf[0..32].try_into().unwrap();
        let outer_iv: [u8; 16] = buf[32..48].try_into().unwrap();

        let secret_key = SecretKey::parse_slice(&[0x7Au8; 32]).unwrap();
        let public_key = PublicKey::from_secret_key(&secret_key);
        let uncompressed_public_key = public_key.serialize().to_vec();

        let master_key = [0x22u8; 32];
        let encrypted_master_key = encrypt_no_padding(&derived_key, &outer_iv, &master_key);

        let inner_iv_full = Sha256::digest(Sha256::digest(&uncompressed_public_key));
        let inner_iv: [u8; 16] = inner_iv_full[0..16].try_into().unwrap();
        let encrypted_private_key = encrypt_no_padding(&master_key, &inner_iv, &[0x7Au8; 32]);

        WalletDescriptor {
            salt,
            derivation_iterations,
            encrypted_master_key,
            encrypted_private_key,
            uncompressed_public_key,
        }
    }

    #[test]
    fn matching_passphrase_validates() {
        let wallet = wallet_for_passphrase("target");
        assert!(verify_candidate("target", &wallet));
    }

    #[test]
    fn wrong_passphrase_does_not_match() {
        let wallet = wallet_for_passphrase("target");
        assert!(!verify_candidate("not-target", &wallet));
    }

    #[test]
    fn misaligned_ciphertext_is_a_non_match_not_a_panic() {
        let mut wallet = wallet_for_passphrase("target");
        wallet.encrypted_master_key.pop();
        assert!(!verify_candidate("target", &wallet));
    }
}
