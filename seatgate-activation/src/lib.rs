//! Activation tracking and seat enforcement for seatgate.
//!
//! This crate handles:
//! - Recording each distinct license (by fingerprint) once, append-only
//! - Best-effort reporting of transitions to an activation service
//! - Enforcing the licensed seat count when seats are claimed
//!
//! # Consistency
//!
//! - A transition is committed before the activation service is called;
//!   a missed notification is acceptable, a missed or duplicated record
//!   is not
//! - Concurrent trackers and seat claims are serialized through SQLite
//!   immediate transactions

mod error;
mod notify;
mod record;
mod seats;
mod store;
mod tracker;

pub use error::{ActivationError, ActivationResult};
pub use notify::{
    ActivatedLicenseInfo, ActivationNotifier, ActivationReply, ActivationRequest,
    HttpActivationNotifier,
};
pub use record::{ActivationId, ActivationRecord, DecisionSnapshot, LicenseFingerprint};
pub use seats::SeatLedger;
pub use store::ActivationStore;
pub use tracker::{ActivationTracker, DEFAULT_NOTIFY_TIMEOUT};
