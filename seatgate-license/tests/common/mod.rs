//! Shared test helpers for license tests.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::NaiveDate;
use ed25519_dalek::SigningKey;
use seatgate_license::{KeyAlgorithm, LicenseEnvelope, LicenseSignature, TrustKey, TrustKeySet};
use sha2::{Digest, Sha512};

/// Returns a deterministic Ed25519 signing key and its trust key.
pub fn test_keypair(id: &str, seed: u8) -> (SigningKey, TrustKey) {
    let signing_key = SigningKey::from_bytes(&[seed; 32]);
    let trust_key = TrustKey::ed25519(id, &signing_key.verifying_key()).unwrap();
    (signing_key, trust_key)
}

/// Signs `data` with Ed25519ph over SHA-512, as the issuer does.
pub fn sign_data(data: &str, key_id: &str, signing_key: &SigningKey) -> LicenseSignature {
    let mut digest = Sha512::new();
    digest.update(data.as_bytes());
    let signature = signing_key.sign_prehashed(digest, None).unwrap();
    LicenseSignature {
        key_id: key_id.to_string(),
        algorithm: KeyAlgorithm::Ed25519,
        signature: BASE64.encode(signature.to_bytes()),
    }
}

/// Assembles a license string from `data` signed by every given key.
pub fn sign_license(data: &str, keys: &[(&SigningKey, &TrustKey)]) -> String {
    let envelope = LicenseEnvelope {
        data: data.to_string(),
        signatures: keys
            .iter()
            .map(|(sk, tk)| sign_data(data, tk.id(), sk))
            .collect(),
    };
    seatgate_license::encode(&envelope).unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// The evaluation date used throughout the tests.
pub fn today() -> NaiveDate {
    date("2025-06-15")
}

/// License terms valid around [`today`] with the given overrides applied.
pub fn license_data(overrides: serde_json::Value) -> String {
    let mut data = serde_json::json!({
        "users": 10,
        "valid_from": "2025-05-16",
        "valid_until": "2025-07-15",
    });
    if let (Some(base), Some(extra)) = (data.as_object_mut(), overrides.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    data.to_string()
}

/// A license signed by `(signing_key, trust_key)`.
pub fn signed_license(
    signing_key: &SigningKey,
    trust_key: &TrustKey,
    overrides: serde_json::Value,
) -> String {
    sign_license(&license_data(overrides), &[(signing_key, trust_key)])
}

pub fn trust_set(keys: &[&TrustKey]) -> TrustKeySet {
    TrustKeySet::new(keys.iter().map(|k| (*k).clone()).collect())
}
