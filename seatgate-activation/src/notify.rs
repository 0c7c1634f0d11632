//! Reporting license transitions to the external activation service.

use crate::error::{ActivationError, ActivationResult};
use crate::record::{ActivationRecord, ActivationId, LicenseFingerprint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use seatgate_license::LicenseTier;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Body sent to the activation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationRequest {
    /// The configured license string, if any.
    pub license: Option<String>,
    #[serde(rename = "type")]
    pub tier: LicenseTier,
    #[serde(rename = "users")]
    pub seat_count: Option<u32>,
    pub fingerprint: LicenseFingerprint,
    pub activation_id: ActivationId,
}

impl ActivationRequest {
    /// Builds the request announcing `record`.
    #[must_use]
    pub fn new(raw_license: Option<&str>, record: &ActivationRecord) -> Self {
        Self {
            license: raw_license
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            tier: record.snapshot.tier,
            seat_count: record.snapshot.seat_count,
            fingerprint: record.snapshot.fingerprint.clone(),
            activation_id: record.id,
        }
    }
}

/// Reply of the activation service. Fields beyond the ones read here are
/// kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationReply {
    pub status: String,
    pub license_info: ActivatedLicenseInfo,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// License details as the activation service sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivatedLicenseInfo {
    pub last_activation_time: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ActivationReply {
    /// Returns true if the service acknowledged the activation.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Outbound activation call. Failures are reported but never fatal to
/// the caller; see [`crate::ActivationTracker`].
#[async_trait]
pub trait ActivationNotifier: Send + Sync {
    /// Informs the activation service about a new license state.
    async fn notify(&self, request: &ActivationRequest) -> ActivationResult<ActivationReply>;
}

/// Notifier that POSTs JSON to a configured URL.
pub struct HttpActivationNotifier {
    url: String,
    client: Client,
}

impl HttpActivationNotifier {
    /// Creates a notifier for `url` whose requests give up after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> ActivationResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Returns the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ActivationNotifier for HttpActivationNotifier {
    async fn notify(&self, request: &ActivationRequest) -> ActivationResult<ActivationReply> {
        debug!(url = %self.url, activation = %request.activation_id, "sending activation");

        let reply: ActivationReply = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !reply.is_ok() {
            return Err(ActivationError::Notify(format!(
                "activation service answered status {:?}",
                reply.status
            )));
        }
        Ok(reply)
    }
}
