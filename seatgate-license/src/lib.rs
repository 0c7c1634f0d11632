//! Offline license verification for seatgate.
//!
//! This crate handles:
//! - Decoding the configured license string (base64 JSON envelope)
//! - Ed25519ph signature verification against configured trust keys
//! - Validity window and seat count checks
//! - Deriving a [`LicenseDecision`] (community or professional)
//!
//! # Design Principles
//!
//! - **Fail closed**: anything malformed or unverifiable yields a community
//!   decision, never a panic or an error past [`LicenseValidator::evaluate`]
//! - **Exact payload**: signatures cover the `data` string as received
//! - **Injected trust**: keys are passed in, nothing is read from globals
//!
//! # License Format
//!
//! `base64({"data": "<json>", "signatures": [{"key_id", "algorithm", "signature"}]})`
//! where `data` holds at least `users`, `valid_from` and `valid_until`.

mod envelope;
mod error;
mod signature;
mod trust;
mod validator;

pub use envelope::{decode, encode, parse, LicenseEnvelope, LicenseRecord, LicenseSignature};
pub use error::{LicenseError, LicenseResult};
pub use signature::verify_signature;
pub use trust::{KeyAlgorithm, TrustKey, TrustKeyConfig, TrustKeySet};
pub use validator::{LicenseDecision, LicenseTier, LicenseValidator};
