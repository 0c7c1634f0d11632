//! Detached signature verification.
//!
//! Licenses are signed with Ed25519ph (RFC 8032): the signer hashes the
//! exact payload string with SHA-512 and signs the digest with an empty
//! context. Verification here mirrors that and never fails loudly: every
//! problem (wrong algorithm, bad key, bad encoding, bad signature)
//! collapses to `false`.

use crate::envelope::LicenseSignature;
use crate::trust::{KeyAlgorithm, TrustKey};
use ed25519_dalek::pkcs8::DecodePublicKey;
use ed25519_dalek::{Signature, VerifyingKey};
use sha2::{Digest, Sha512};

/// Verifies one signature over `payload` with one candidate key.
#[must_use]
pub fn verify_signature(payload: &[u8], signature: &LicenseSignature, key: &TrustKey) -> bool {
    if signature.algorithm != key.algorithm() {
        return false;
    }
    match key.algorithm() {
        KeyAlgorithm::Ed25519 => verify_ed25519ph(payload, signature, key.public_key()),
        KeyAlgorithm::Unsupported => false,
    }
}

fn verify_ed25519ph(payload: &[u8], signature: &LicenseSignature, public_key_der: &[u8]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_public_key_der(public_key_der) else {
        return false;
    };
    let Some(sig_bytes) = signature.signature_bytes() else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(&sig_bytes) else {
        return false;
    };

    let mut digest = Sha512::new();
    digest.update(payload);
    verifying_key.verify_prehashed(digest, None, &sig).is_ok()
}
