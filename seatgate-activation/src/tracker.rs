//! Detects license transitions and records them once.

use crate::error::{ActivationError, ActivationResult};
use crate::notify::{ActivationNotifier, ActivationReply, ActivationRequest};
use crate::record::{ActivationRecord, DecisionSnapshot};
use crate::store::ActivationStore;
use seatgate_license::LicenseDecision;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on a single activation call.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Records license transitions and reports them best-effort.
///
/// Safe to call on every request or scheduler tick: when the configured
/// license has not changed, [`track`](Self::track) only reads the newest
/// record.
#[derive(Clone)]
pub struct ActivationTracker {
    store: ActivationStore,
    notifier: Option<Arc<dyn ActivationNotifier>>,
    notify_timeout: Duration,
}

impl ActivationTracker {
    /// Creates a tracker. Without a notifier, transitions are recorded but
    /// not reported.
    pub fn new(store: ActivationStore, notifier: Option<Arc<dyn ActivationNotifier>>) -> Self {
        Self {
            store,
            notifier,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    /// Sets the bound on a single activation call.
    #[must_use]
    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &ActivationStore {
        &self.store
    }

    /// Records a transition if `raw_license` differs from the newest record.
    ///
    /// The record is committed before the activation service is called, so
    /// a failed, slow or cancelled call never loses the transition. Returns
    /// the new record, or `None` if nothing changed.
    ///
    /// # Errors
    ///
    /// Only storage failures are returned; notification failures are logged.
    pub async fn track(
        &self,
        raw_license: Option<&str>,
        decision: &LicenseDecision,
    ) -> ActivationResult<Option<ActivationRecord>> {
        let snapshot = DecisionSnapshot::new(raw_license, decision);
        let store = self.store.clone();
        let pending = snapshot.clone();
        let appended =
            tokio::task::spawn_blocking(move || store.append_if_changed(&pending)).await??;
        let Some(mut record) = appended else {
            debug!(fingerprint = %snapshot.fingerprint, "license unchanged");
            return Ok(None);
        };
        info!(
            activation = %record.id,
            tier = %record.snapshot.tier,
            seats = ?record.snapshot.seat_count,
            "license transition recorded"
        );

        let Some(notifier) = &self.notifier else {
            debug!("no activation endpoint configured, skipping notify");
            return Ok(Some(record));
        };

        let request = ActivationRequest::new(raw_license, &record);
        match self.notify(notifier.as_ref(), &request).await {
            Ok(reply) => match self.attach_reply(&record, &reply).await {
                Ok(true) => record.activation_reply = Some(reply),
                Ok(false) => debug!(activation = %record.id, "reply already attached"),
                Err(e) => warn!(activation = %record.id, "failed to store activation reply: {e}"),
            },
            Err(e) => warn!(activation = %record.id, "license activation failed: {e}"),
        }

        Ok(Some(record))
    }

    async fn attach_reply(
        &self,
        record: &ActivationRecord,
        reply: &ActivationReply,
    ) -> ActivationResult<bool> {
        let store = self.store.clone();
        let id = record.id;
        let reply = reply.clone();
        tokio::task::spawn_blocking(move || store.attach_reply(&id, &reply)).await?
    }

    async fn notify(
        &self,
        notifier: &dyn ActivationNotifier,
        request: &ActivationRequest,
    ) -> ActivationResult<ActivationReply> {
        tokio::time::timeout(self.notify_timeout, notifier.notify(request))
            .await
            .map_err(|_| ActivationError::Timeout)?
    }
}
