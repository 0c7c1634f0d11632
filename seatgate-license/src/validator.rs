//! License validation and tier decisions.

use crate::envelope::{self, LicenseEnvelope, LicenseRecord};
use crate::error::{LicenseError, LicenseResult};
use crate::signature::verify_signature;
use crate::trust::TrustKeySet;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The feature tier a license unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseTier {
    /// Free tier; no valid license.
    Community,
    /// Paid tier; features unlocked up to the licensed seat count.
    Professional,
}

impl std::fmt::Display for LicenseTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Community => f.write_str("community"),
            Self::Professional => f.write_str("professional"),
        }
    }
}

/// The outcome of evaluating the configured license.
///
/// Derived fresh on every evaluation and never persisted. A populated
/// `error` always comes with [`LicenseTier::Community`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseDecision {
    #[serde(rename = "type")]
    pub tier: LicenseTier,
    /// Licensed seats, present for professional decisions.
    #[serde(rename = "users")]
    pub seat_count: Option<u32>,
    /// Operator-facing reason the license was rejected.
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<NaiveDate>,
}

impl LicenseDecision {
    /// The decision when no license is configured.
    #[must_use]
    pub fn community() -> Self {
        Self {
            tier: LicenseTier::Community,
            seat_count: None,
            error: None,
            valid_from: None,
            valid_until: None,
        }
    }

    /// A community decision carrying the reason a license was rejected.
    #[must_use]
    pub fn rejected(error: &LicenseError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::community()
        }
    }

    fn professional(record: &LicenseRecord, seat_count: u32) -> Self {
        Self {
            tier: LicenseTier::Professional,
            seat_count: Some(seat_count),
            error: None,
            valid_from: Some(record.valid_from),
            valid_until: Some(record.valid_until),
        }
    }

    /// Returns true for a professional decision.
    #[must_use]
    pub fn is_professional(&self) -> bool {
        self.tier == LicenseTier::Professional
    }

    /// Gate for privileged actions.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::LicenseRequired`] unless the decision is
    /// professional.
    pub fn require_professional(&self) -> LicenseResult<()> {
        if self.is_professional() {
            Ok(())
        } else {
            Err(LicenseError::LicenseRequired)
        }
    }
}

/// Validates license strings against an injected set of trust keys.
#[derive(Debug, Clone)]
pub struct LicenseValidator {
    trust_keys: TrustKeySet,
}

impl LicenseValidator {
    /// Creates a validator accepting signatures from `trust_keys`.
    pub fn new(trust_keys: TrustKeySet) -> Self {
        Self { trust_keys }
    }

    /// Returns the configured trust keys.
    #[must_use]
    pub fn trust_keys(&self) -> &TrustKeySet {
        &self.trust_keys
    }

    /// Evaluates `raw` as of `today` given the number of seats in use.
    ///
    /// Never fails: every rejection becomes a community decision whose
    /// `error` names the first check that failed.
    #[must_use]
    pub fn evaluate(
        &self,
        raw: Option<&str>,
        current_seat_usage: u32,
        today: NaiveDate,
    ) -> LicenseDecision {
        match self.check(raw, current_seat_usage, today) {
            Ok(None) => {
                debug!("no license configured");
                LicenseDecision::community()
            }
            Ok(Some((record, seats))) => LicenseDecision::professional(&record, seats),
            Err(e) => {
                warn!("license rejected: {e}");
                LicenseDecision::rejected(&e)
            }
        }
    }

    /// Evaluates `raw` as of the current UTC date.
    #[must_use]
    pub fn evaluate_now(&self, raw: Option<&str>, current_seat_usage: u32) -> LicenseDecision {
        self.evaluate(raw, current_seat_usage, chrono::Utc::now().date_naive())
    }

    /// Runs every check in order and returns the verified terms with the
    /// validated seat count, `None` if no license is configured.
    pub fn check(
        &self,
        raw: Option<&str>,
        current_seat_usage: u32,
        today: NaiveDate,
    ) -> LicenseResult<Option<(LicenseRecord, u32)>> {
        let Some(envelope) = envelope::decode(raw)? else {
            return Ok(None);
        };

        if !self.has_valid_signature(&envelope) {
            return Err(LicenseError::NoValidSignature);
        }

        let record = envelope::parse(&envelope.data)?;

        if today < record.valid_from {
            return Err(LicenseError::NotYetValid(record.valid_from));
        }
        if today > record.valid_until {
            return Err(LicenseError::Expired(record.valid_until));
        }

        if record.seat_count <= 0 {
            return Err(LicenseError::InvalidUserCount(record.seat_count));
        }
        let seats = u32::try_from(record.seat_count).unwrap_or(u32::MAX);
        if current_seat_usage > seats {
            return Err(LicenseError::UserLimitExceeded {
                limit: seats,
                in_use: current_seat_usage,
            });
        }

        Ok(Some((record, seats)))
    }

    /// True if any signature verifies with a trust key of the same id.
    fn has_valid_signature(&self, envelope: &LicenseEnvelope) -> bool {
        let payload = envelope.data.as_bytes();
        envelope.signatures.iter().any(|sig| {
            self.trust_keys
                .with_id(&sig.key_id)
                .any(|key| verify_signature(payload, sig, key))
        })
    }
}
