use chrono::NaiveDate;
use seatgate_license::LicenseError;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

#[test]
fn error_display_keywords() {
    let cases: Vec<(LicenseError, &str)> = vec![
        (LicenseError::Load("bad base64".into()), "load"),
        (LicenseError::NoValidSignature, "no valid signature"),
        (LicenseError::InvalidData("missing field".into()), "invalid license data"),
        (LicenseError::NotYetValid(day()), "not yet valid"),
        (LicenseError::Expired(day()), "expired"),
        (LicenseError::InvalidUserCount(0), "user count"),
        (LicenseError::UserLimitExceeded { limit: 1, in_use: 2 }, "limit exceeded"),
        (LicenseError::LicenseRequired, "license required"),
        (LicenseError::InvalidTrustKey("k".into()), "trust key"),
    ];
    for (err, keyword) in cases {
        let msg = err.to_string().to_lowercase();
        assert!(msg.contains(keyword), "{msg:?} lacks {keyword:?}");
    }
}

#[test]
fn error_display_includes_details() {
    let msg = LicenseError::Expired(day()).to_string();
    assert!(msg.contains("2025-01-01"));

    let msg = LicenseError::UserLimitExceeded { limit: 3, in_use: 4 }.to_string();
    assert!(msg.contains('3'));
    assert!(msg.contains('4'));
}

#[test]
fn enforcement_errors() {
    assert!(LicenseError::LicenseRequired.is_enforcement());
    assert!(LicenseError::UserLimitExceeded { limit: 1, in_use: 1 }.is_enforcement());
    assert!(!LicenseError::NoValidSignature.is_enforcement());
    assert!(!LicenseError::Load("x".into()).is_enforcement());
}

#[test]
fn error_from_serde_json() {
    let serde_err: Result<serde_json::Value, _> = serde_json::from_str("not json");
    let license_err: LicenseError = serde_err.unwrap_err().into();
    assert!(format!("{license_err}").contains("serialization"));
}

#[test]
fn error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let license_err: LicenseError = io.into();
    assert!(format!("{license_err}").contains("IO error"));
}
