//! License service state and HTTP API for seatgate.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use seatgate_activation::{
    ActivationError, ActivationRecord, ActivationResult, ActivationTracker, SeatLedger,
};
use seatgate_license::{LicenseDecision, LicenseValidator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Number of activation records returned when no `limit` is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// The configured license together with the stores that depend on it.
#[derive(Clone)]
pub struct LicenseService {
    validator: Arc<LicenseValidator>,
    license: Option<Arc<str>>,
    seats: SeatLedger,
    tracker: ActivationTracker,
}

impl LicenseService {
    pub fn new(
        validator: LicenseValidator,
        license: Option<String>,
        seats: SeatLedger,
        tracker: ActivationTracker,
    ) -> Self {
        Self {
            validator: Arc::new(validator),
            license: license.map(Arc::from),
            seats,
            tracker,
        }
    }

    fn license(&self) -> Option<&str> {
        self.license.as_deref()
    }

    /// Evaluates the configured license against current seat usage.
    pub async fn decision(&self) -> ActivationResult<LicenseDecision> {
        let usage = self.seats_in_use().await?;
        Ok(self.validator.evaluate_now(self.license(), usage))
    }

    /// One tracker tick: evaluate, then record the state if it changed.
    pub async fn run_check(&self) -> ActivationResult<Option<ActivationRecord>> {
        let decision = self.decision().await?;
        self.tracker.track(self.license(), &decision).await
    }

    /// Claims a seat for `holder`. Returns false if it was already held.
    pub async fn claim_seat(&self, holder: &str) -> ActivationResult<bool> {
        let decision = self.decision().await?;
        let seats = self.seats.clone();
        let holder = holder.to_string();
        tokio::task::spawn_blocking(move || seats.claim(&holder, &decision)).await?
    }

    pub async fn release_seat(&self, holder: &str) -> ActivationResult<bool> {
        let seats = self.seats.clone();
        let holder = holder.to_string();
        tokio::task::spawn_blocking(move || seats.release(&holder)).await?
    }

    pub async fn seats_in_use(&self) -> ActivationResult<u32> {
        let seats = self.seats.clone();
        tokio::task::spawn_blocking(move || seats.active_count()).await?
    }

    /// Up to `limit` activation records, newest first.
    pub async fn activations(&self, limit: usize) -> ActivationResult<Vec<ActivationRecord>> {
        let store = self.tracker.store().clone();
        tokio::task::spawn_blocking(move || store.history(limit)).await?
    }

    pub fn seats(&self) -> &SeatLedger {
        &self.seats
    }

    pub fn tracker(&self) -> &ActivationTracker {
        &self.tracker
    }
}

/// Error body returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub detail: String,
}

struct ApiError(ActivationError);

impl From<ActivationError> for ApiError {
    fn from(err: ActivationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = if self.0.is_license_error() {
            (StatusCode::FORBIDDEN, "license")
        } else {
            warn!(error = %self.0, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        };
        let body = ErrorResponse {
            code: code.to_string(),
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result of a seat claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatResponse {
    pub holder: String,
    pub in_use: u32,
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn license_handler(
    State(service): State<LicenseService>,
) -> Result<Json<LicenseDecision>, ApiError> {
    Ok(Json(service.decision().await?))
}

async fn activations_handler(
    State(service): State<LicenseService>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ActivationRecord>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(service.activations(limit).await?))
}

async fn claim_handler(
    State(service): State<LicenseService>,
    Path(holder): Path<String>,
) -> Result<(StatusCode, Json<SeatResponse>), ApiError> {
    let created = service.claim_seat(&holder).await?;
    let in_use = service.seats_in_use().await?;
    if !created {
        debug!(%holder, "seat already held");
    }
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(SeatResponse { holder, in_use })))
}

async fn release_handler(
    State(service): State<LicenseService>,
    Path(holder): Path<String>,
) -> Result<StatusCode, ApiError> {
    if service.release_seat(&holder).await? {
        info!(%holder, "seat released");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

/// Build the HTTP API router over the given service.
pub fn build_router(service: LicenseService) -> Router {
    Router::new()
        .route("/api/v1/license", get(license_handler))
        .route("/api/v1/license/activations", get(activations_handler))
        .route("/api/v1/seats/{holder}", post(claim_handler).delete(release_handler))
        .with_state(service)
}
