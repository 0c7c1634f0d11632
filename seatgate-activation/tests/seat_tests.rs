mod common;

use common::Licenses;
use seatgate_activation::{ActivationError, SeatLedger};
use seatgate_license::{LicenseDecision, LicenseError};
use std::sync::Arc;

fn professional(licenses: &Licenses, users: i64) -> LicenseDecision {
    let raw = licenses.signed(users, "2025-01-01", "2025-12-31");
    let decision = licenses.decide(Some(&raw));
    assert!(decision.is_professional());
    decision
}

#[test]
fn claims_up_to_seat_count() {
    let licenses = Licenses::new();
    let decision = professional(&licenses, 2);
    let ledger = SeatLedger::open_in_memory().unwrap();

    assert!(ledger.claim("alice", &decision).unwrap());
    assert!(ledger.claim("bob", &decision).unwrap());
    let err = ledger.claim("carol", &decision).unwrap_err();
    assert!(err.is_license_error());
    assert!(err.to_string().contains("limit exceeded"));
    assert!(matches!(
        err,
        ActivationError::License(LicenseError::UserLimitExceeded { limit: 2, in_use: 3 })
    ));

    assert_eq!(ledger.active_count().unwrap(), 2);
    assert_eq!(ledger.holders().unwrap(), vec!["alice", "bob"]);
}

#[test]
fn reclaim_is_noop() {
    let licenses = Licenses::new();
    let decision = professional(&licenses, 1);
    let ledger = SeatLedger::open_in_memory().unwrap();

    assert!(ledger.claim("alice", &decision).unwrap());
    assert!(!ledger.claim("alice", &decision).unwrap());
    assert_eq!(ledger.active_count().unwrap(), 1);
}

#[test]
fn release_frees_a_seat() {
    let licenses = Licenses::new();
    let decision = professional(&licenses, 1);
    let ledger = SeatLedger::open_in_memory().unwrap();

    ledger.claim("alice", &decision).unwrap();
    assert!(ledger.claim("bob", &decision).is_err());
    assert!(ledger.release("alice").unwrap());
    assert!(!ledger.release("alice").unwrap());
    assert!(ledger.claim("bob", &decision).unwrap());
}

#[test]
fn community_cannot_claim() {
    let ledger = SeatLedger::open_in_memory().unwrap();
    let err = ledger.claim("alice", &LicenseDecision::community()).unwrap_err();
    assert!(matches!(err, ActivationError::License(LicenseError::LicenseRequired)));
    assert!(err.is_license_error());
    assert_eq!(ledger.active_count().unwrap(), 0);
}

#[test]
fn rejected_license_cannot_claim() {
    let licenses = Licenses::new();
    let decision = licenses.decide(Some(&licenses.expired()));
    let ledger = SeatLedger::open_in_memory().unwrap();
    assert!(ledger.claim("alice", &decision).unwrap_err().is_license_error());
}

#[test]
fn usage_feeds_back_into_evaluation() {
    let licenses = Licenses::new();
    let raw = licenses.signed(1, "2025-01-01", "2025-12-31");
    let ledger = SeatLedger::open_in_memory().unwrap();
    ledger.claim("alice", &licenses.decide(Some(&raw))).unwrap();

    // A seat granted under a larger license now exceeds the smaller one.
    ledger.claim("bob", &professional(&licenses, 5)).unwrap();
    let usage = ledger.active_count().unwrap();
    let decision = licenses.validator.evaluate(Some(&raw), usage, common::today());
    assert!(decision.error.unwrap().contains("limit exceeded"));
}

#[test]
fn concurrent_claims_never_exceed_cap() {
    let licenses = Licenses::new();
    let decision = Arc::new(professional(&licenses, 3));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seats.db");
    SeatLedger::open(&path).unwrap();

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let path = path.clone();
            let decision = decision.clone();
            std::thread::spawn(move || {
                let ledger = SeatLedger::open(&path).unwrap();
                ledger.claim(&format!("user-{i}"), &decision).is_ok()
            })
        })
        .collect();

    let granted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|&ok| ok)
        .count();
    assert_eq!(granted, 3);
    assert_eq!(SeatLedger::open(&path).unwrap().active_count().unwrap(), 3);
}
