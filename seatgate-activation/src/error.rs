//! Error types for activation tracking and seat enforcement.

use seatgate_license::LicenseError;
use thiserror::Error;

/// Result type for activation operations.
pub type ActivationResult<T> = Result<T, ActivationError>;

/// Errors that can occur while tracking activations or granting seats.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// SQLite error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The activation service rejected or garbled the request.
    #[error("activation notify failed: {0}")]
    Notify(String),

    /// The activation service did not answer in time.
    #[error("activation notify timed out")]
    Timeout,

    /// HTTP error talking to the activation service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// License enforcement rejected the operation.
    #[error(transparent)]
    License(#[from] LicenseError),
}

impl From<rusqlite::Error> for ActivationError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl ActivationError {
    /// Returns true if the operation was blocked by the license.
    pub fn is_license_error(&self) -> bool {
        matches!(self, Self::License(e) if e.is_enforcement())
    }
}
