//! Persisted activation records.
//!
//! A record is appended whenever the fingerprint of the configured license
//! string changes. Records are never edited afterwards, except that the
//! activation service's reply is attached once it arrives.

use crate::notify::ActivationReply;
use chrono::{DateTime, Utc};
use seatgate_license::{LicenseDecision, LicenseTier};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an activation record.
/// Uses UUID v7 which embeds a timestamp for natural ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationId(Uuid);

impl ActivationId {
    /// Creates a new activation ID with the current timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ActivationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActivationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Content fingerprint of a configured license string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseFingerprint(String);

impl LicenseFingerprint {
    /// Fingerprint of "no license configured". Never a valid hex digest.
    pub const NONE: &'static str = "none";

    /// Fingerprints a raw license string; absent or blank maps to [`Self::NONE`].
    #[must_use]
    pub fn of(raw: Option<&str>) -> Self {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Self(Self::NONE.to_string()),
            Some(raw) => {
                let mut hasher = Sha256::new();
                hasher.update(raw.as_bytes());
                Self(hex::encode(hasher.finalize()))
            }
        }
    }

    /// Wraps a stored fingerprint.
    pub(crate) fn from_stored(s: String) -> Self {
        Self(s)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the no-license sentinel.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.0 == Self::NONE
    }
}

impl fmt::Display for LicenseFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What was active when a record was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSnapshot {
    #[serde(rename = "type")]
    pub tier: LicenseTier,
    #[serde(rename = "users")]
    pub seat_count: Option<u32>,
    pub fingerprint: LicenseFingerprint,
}

impl DecisionSnapshot {
    /// Snapshots `decision` for the license string `raw`.
    #[must_use]
    pub fn new(raw: Option<&str>, decision: &LicenseDecision) -> Self {
        Self {
            tier: decision.tier,
            seat_count: decision.seat_count,
            fingerprint: LicenseFingerprint::of(raw),
        }
    }
}

/// One recorded license transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub id: ActivationId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: DecisionSnapshot,
    /// Reply of the activation service; absent if the call failed or was skipped.
    pub activation_reply: Option<ActivationReply>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_license_uses_sentinel() {
        assert!(LicenseFingerprint::of(None).is_none());
        assert!(LicenseFingerprint::of(Some("")).is_none());
        assert!(LicenseFingerprint::of(Some("   ")).is_none());
        assert!(!LicenseFingerprint::of(Some("abc")).is_none());
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        let fp = LicenseFingerprint::of(Some("abc"));
        assert_eq!(
            fp.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(fp, LicenseFingerprint::of(Some(" abc\n")));
    }

    #[test]
    fn activation_id_parse_roundtrip() {
        let id = ActivationId::new();
        let parsed: ActivationId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
