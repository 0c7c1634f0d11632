//! License string decoding.
//!
//! A license string is `base64(json(envelope))` where the envelope is:
//!
//! ```json
//! {
//!   "data": "{\"users\": 10, \"valid_from\": \"2024-01-01\", \"valid_until\": \"2025-01-01\"}",
//!   "signatures": [{"key_id": "...", "algorithm": "ed25519", "signature": "<base64>"}]
//! }
//! ```
//!
//! `data` is kept as the exact string that was signed. It is only parsed
//! into a [`LicenseRecord`] after a signature over those bytes verified.

use crate::error::{LicenseError, LicenseResult};
use crate::trust::KeyAlgorithm;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outer signed container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseEnvelope {
    /// The signed payload, byte-for-byte as issued.
    pub data: String,
    /// Detached signatures over `data`. May be empty.
    pub signatures: Vec<LicenseSignature>,
}

/// A detached signature embedded in an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseSignature {
    pub key_id: String,
    pub algorithm: KeyAlgorithm,
    /// Base64 of the raw signature bytes.
    pub signature: String,
}

impl LicenseSignature {
    /// Decodes the signature bytes, or `None` if they are not valid base64.
    #[must_use]
    pub fn signature_bytes(&self) -> Option<Vec<u8>> {
        BASE64.decode(self.signature.trim()).ok()
    }
}

/// The signed license terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// Number of licensed seats. Not range checked when parsing.
    #[serde(rename = "users")]
    pub seat_count: i64,
    /// First day the license is valid.
    pub valid_from: NaiveDate,
    /// Last day the license is valid.
    pub valid_until: NaiveDate,
    /// Fields this version does not interpret.
    #[serde(flatten)]
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

/// Decodes a configured license string into its envelope.
///
/// Returns `Ok(None)` when no license is configured (absent, empty or
/// whitespace only); that is not an error.
pub fn decode(raw: Option<&str>) -> LicenseResult<Option<LicenseEnvelope>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let bytes = BASE64
        .decode(raw)
        .map_err(|e| LicenseError::Load(format!("invalid base64: {e}")))?;
    let envelope: LicenseEnvelope = serde_json::from_slice(&bytes)
        .map_err(|e| LicenseError::Load(format!("invalid envelope: {e}")))?;

    Ok(Some(envelope))
}

/// Parses the signed payload into license terms.
pub fn parse(payload: &str) -> LicenseResult<LicenseRecord> {
    serde_json::from_str(payload).map_err(|e| LicenseError::InvalidData(e.to_string()))
}

/// Encodes an envelope into a license string.
///
/// The inverse of [`decode`]; used by tooling and tests that assemble
/// licenses from already signed parts.
pub fn encode(envelope: &LicenseEnvelope) -> LicenseResult<String> {
    let json = serde_json::to_vec(envelope)?;
    Ok(BASE64.encode(json))
}
