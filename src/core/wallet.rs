// src/core/wallet.rs

//! The read-only wallet descriptor: the static bundle a candidate passphrase
//! is tested against. Loaded once at startup and handed out verbatim to
//! every worker inside a lease response.

use crate::core::errors::CoordinatorError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The 65-byte uncompressed secp256k1 public key prefix mandated by the format.
const UNCOMPRESSED_PUBKEY_PREFIX: u8 = 0x04;
const UNCOMPRESSED_PUBKEY_LEN: usize = 65;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletDescriptor {
    #[serde(with = "hex_bytes")]
    pub salt: Vec<u8>,
    pub derivation_iterations: u32,
    #[serde(with = "hex_bytes")]
    pub encrypted_master_key: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub encrypted_private_key: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub uncompressed_public_key: Vec<u8>,
}

impl WalletDescriptor {
    /// Loads the descriptor from the JSON file produced by the (out of scope)
    /// candidate generator tool, then validates the invariants §3 places on it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoordinatorError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CoordinatorError::Validation(format!("cannot read wallet file: {e}")))?;
        let descriptor: WalletDescriptor = serde_json::from_str(&raw)
            .map_err(|e| CoordinatorError::Validation(format!("malformed wallet file: {e}")))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    fn validate(&self) -> Result<(), CoordinatorError> {
        if self.derivation_iterations == 0 {
            return Err(CoordinatorError::Validation(
                "derivation_iterations must be positive".into(),
            ));
        }
        if self.encrypted_master_key.is_empty() || self.encrypted_master_key.len() % 16 != 0 {
            return Err(CoordinatorError::Validation(
                "encrypted_master_key must be a non-empty multiple of 16 bytes".into(),
            ));
        }
        if self.encrypted_private_key.is_empty() || self.encrypted_private_key.len() % 16 != 0 {
            return Err(CoordinatorError::Validation(
                "encrypted_private_key must be a non-empty multiple of 16 bytes".into(),
            ));
        }
        if self.uncompressed_public_key.len() != UNCOMPRESSED_PUBKEY_LEN
            || self.uncompressed_public_key[0] != UNCOMPRESSED_PUBKEY_PREFIX
        {
            return Err(CoordinatorError::Validation(format!(
                "uncompressed_public_key must be {UNCOMPRESSED_PUBKEY_LEN} bytes prefixed with 0x{UNCOMPRESSED_PUBKEY_PREFIX:02x}"
            )));
        }
        Ok(())
    }
}

/// Hex-string (de)serialization for the binary fields, so the descriptor
/// round-trips through JSON the same way every other wire payload in this
/// system does.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        let salt = hex::encode([0xAAu8; 8]);
        let master = hex::encode([0u8; 32]);
        let priv_key = hex::encode([0u8; 32]);
        let mut pubkey = vec![0x04u8];
        pubkey.extend_from_slice(&[1u8; 64]);
        let pubkey_hex = hex::encode(pubkey);
        format!(
            r#"{{"salt":"{salt}","derivation_iterations":1000,"encrypted_master_key":"{master}","encrypted_private_key":"{priv_key}","uncompressed_public_key":"{pubkey_hex}"}}"#
        )
    }

    #[test]
    fn parses_and_validates_well_formed_descriptor() {
        let descriptor: WalletDescriptor = serde_json::from_str(&sample_json()).unwrap();
        assert!(descriptor.validate().is_ok());
        assert_eq!(descriptor.uncompressed_public_key.len(), 65);
    }

    #[test]
    fn rejects_misaligned_ciphertext() {
        let mut descriptor: WalletDescriptor = serde_json::from_str(&sample_json()).unwrap();
        descriptor.encrypted_master_key.pop();
        assert!(descriptor.validate().is_err());
    }

    #[test]
    fn rejects_wrong_pubkey_prefix() {
        let mut descriptor: WalletDescriptor = serde_json::from_str(&sample_json()).unwrap();
        descriptor.uncompressed_public_key[0] = 0x02;
        assert!(descriptor.validate().is_err());
    }
}
