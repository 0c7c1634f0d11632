//! Error types for license decoding, validation and enforcement.

use thiserror::Error;

/// Licensing-specific errors.
///
/// Display strings contain stable lower-case keywords ("load",
/// "no valid signature", "not yet valid", "expired", "user count",
/// "limit exceeded") that operators and callers match on.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The license string is not base64 of a well-formed envelope.
    #[error("failed to load license: {0}")]
    Load(String),

    /// No signature verified against a configured trust key.
    #[error("no valid signature")]
    NoValidSignature,

    /// Signed payload is malformed or missing required fields.
    #[error("invalid license data: {0}")]
    InvalidData(String),

    /// The license validity window has not started yet.
    #[error("license not yet valid (valid from {0})")]
    NotYetValid(chrono::NaiveDate),

    /// The license validity window has ended.
    #[error("license expired on {0}")]
    Expired(chrono::NaiveDate),

    /// The licensed seat count is zero or negative.
    #[error("invalid user count: {0}")]
    InvalidUserCount(i64),

    /// More seats are in use (or requested) than the license allows.
    #[error("user limit exceeded: {in_use} in use, {limit} licensed")]
    UserLimitExceeded { limit: u32, in_use: u32 },

    /// A privileged action was attempted without a professional license.
    #[error("license required")]
    LicenseRequired,

    /// A configured trust key could not be loaded.
    #[error("invalid trust key: {0}")]
    InvalidTrustKey(String),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LicenseError {
    /// Returns true if this error blocks a privileged action because of the
    /// license (tier or seat cap), as opposed to a configuration problem.
    #[must_use]
    pub fn is_enforcement(&self) -> bool {
        matches!(
            self,
            Self::LicenseRequired | Self::UserLimitExceeded { .. }
        )
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
