//! Shared test helpers for activation tests.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{NaiveDate, Utc};
use ed25519_dalek::SigningKey;
use seatgate_activation::{
    ActivatedLicenseInfo, ActivationError, ActivationNotifier, ActivationReply, ActivationRequest,
    ActivationResult,
};
use seatgate_license::{
    KeyAlgorithm, LicenseDecision, LicenseEnvelope, LicenseSignature, LicenseValidator, TrustKey,
    TrustKeySet,
};
use sha2::{Digest, Sha512};
use std::sync::Mutex;
use std::time::Duration;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

/// A validator trusting one deterministic key, plus that key for signing.
pub struct Licenses {
    signing_key: SigningKey,
    pub validator: LicenseValidator,
}

impl Licenses {
    pub fn new() -> Self {
        let signing_key = SigningKey::from_bytes(&[42u8; 32]);
        let trust_key = TrustKey::ed25519("test", &signing_key.verifying_key()).unwrap();
        Self {
            signing_key,
            validator: LicenseValidator::new(TrustKeySet::new(vec![trust_key])),
        }
    }

    pub fn signed(&self, users: i64, valid_from: &str, valid_until: &str) -> String {
        let data = serde_json::json!({
            "users": users,
            "valid_from": valid_from,
            "valid_until": valid_until,
        })
        .to_string();
        let mut digest = Sha512::new();
        digest.update(data.as_bytes());
        let signature = self.signing_key.sign_prehashed(digest, None).unwrap();
        seatgate_license::encode(&LicenseEnvelope {
            data,
            signatures: vec![LicenseSignature {
                key_id: "test".to_string(),
                algorithm: KeyAlgorithm::Ed25519,
                signature: BASE64.encode(signature.to_bytes()),
            }],
        })
        .unwrap()
    }

    pub fn professional(&self) -> String {
        self.signed(10, "2025-01-01", "2025-12-31")
    }

    pub fn professional_more_seats(&self) -> String {
        self.signed(20, "2025-01-01", "2025-12-31")
    }

    pub fn expired(&self) -> String {
        self.signed(10, "2024-01-01", "2025-06-14")
    }

    pub fn decide(&self, raw: Option<&str>) -> LicenseDecision {
        self.validator.evaluate(raw, 0, today())
    }
}

pub fn ok_reply() -> ActivationReply {
    ActivationReply {
        status: "ok".to_string(),
        license_info: ActivatedLicenseInfo {
            last_activation_time: Utc::now(),
            extra: serde_json::Map::new(),
        },
        extra: serde_json::Map::new(),
    }
}

/// Notifier that records requests and answers with a fixed outcome.
pub struct RecordingNotifier {
    pub requests: Mutex<Vec<ActivationRequest>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn succeeding() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ActivationNotifier for RecordingNotifier {
    async fn notify(&self, request: &ActivationRequest) -> ActivationResult<ActivationReply> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            Err(ActivationError::Notify("service unavailable".to_string()))
        } else {
            Ok(ok_reply())
        }
    }
}

/// Notifier that never answers within any reasonable timeout.
pub struct HangingNotifier;

#[async_trait]
impl ActivationNotifier for HangingNotifier {
    async fn notify(&self, _request: &ActivationRequest) -> ActivationResult<ActivationReply> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ok_reply())
    }
}
