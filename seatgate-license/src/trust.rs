//! Trusted public keys that license signatures are checked against.
//!
//! Keys are configured as a JSON list:
//!
//! ```json
//! [{"id": "2024-primary", "algorithm": "ed25519", "key": "<base64 DER>"}]
//! ```
//!
//! `key` is the base64 of a DER-encoded SubjectPublicKeyInfo. The set is
//! loaded once at start-up and never modified afterwards; it is passed to
//! [`crate::LicenseValidator`] explicitly so alternate sets can be used.

use crate::error::{LicenseError, LicenseResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::VerifyingKey;
use ed25519_dalek::pkcs8::EncodePublicKey;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Signature algorithms a trust key or license signature can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    /// Pre-hashed Ed25519 (RFC 8032 Ed25519ph over SHA-512).
    Ed25519,
    /// Any algorithm name this build does not know. Never verifies.
    #[serde(other)]
    Unsupported,
}

/// A public key licenses may be signed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustKey {
    id: String,
    algorithm: KeyAlgorithm,
    public_key: Vec<u8>,
}

impl TrustKey {
    /// Creates a trust key from DER-encoded public key bytes.
    ///
    /// The bytes are not validated here; a malformed key simply never
    /// verifies a signature.
    pub fn new(id: impl Into<String>, algorithm: KeyAlgorithm, public_key: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            algorithm,
            public_key,
        }
    }

    /// Creates an Ed25519 trust key from a verifying key.
    pub fn ed25519(id: impl Into<String>, key: &VerifyingKey) -> LicenseResult<Self> {
        let der = key
            .to_public_key_der()
            .map_err(|e| LicenseError::InvalidTrustKey(format!("DER encoding failed: {e}")))?;
        Ok(Self::new(id, KeyAlgorithm::Ed25519, der.as_bytes().to_vec()))
    }

    /// Returns the key id signatures refer to.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the declared algorithm.
    #[must_use]
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Returns the DER-encoded public key.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

/// Configuration shape of a single trust key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustKeyConfig {
    pub id: String,
    pub algorithm: KeyAlgorithm,
    /// Base64 of the DER-encoded public key.
    pub key: String,
}

impl TryFrom<TrustKeyConfig> for TrustKey {
    type Error = LicenseError;

    fn try_from(config: TrustKeyConfig) -> LicenseResult<Self> {
        let public_key = BASE64.decode(config.key.trim()).map_err(|e| {
            LicenseError::InvalidTrustKey(format!("key {}: invalid base64: {e}", config.id))
        })?;
        Ok(Self::new(config.id, config.algorithm, public_key))
    }
}

/// The immutable set of keys the validator accepts signatures from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustKeySet {
    keys: Vec<TrustKey>,
}

impl TrustKeySet {
    /// Creates a set from already constructed keys.
    pub fn new(keys: Vec<TrustKey>) -> Self {
        Self { keys }
    }

    /// Parses the JSON configuration format.
    pub fn from_json(json: &str) -> LicenseResult<Self> {
        let configs: Vec<TrustKeyConfig> = serde_json::from_str(json)?;
        let keys = configs
            .into_iter()
            .map(TrustKey::try_from)
            .collect::<LicenseResult<Vec<_>>>()?;
        Ok(Self { keys })
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_file(path: &Path) -> LicenseResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Iterates over keys with the given id.
    pub fn with_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a TrustKey> + 'a {
        self.keys.iter().filter(move |k| k.id == id)
    }

    /// Iterates over all keys.
    pub fn iter(&self) -> impl Iterator<Item = &TrustKey> {
        self.keys.iter()
    }

    /// Returns the number of configured keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no key is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
