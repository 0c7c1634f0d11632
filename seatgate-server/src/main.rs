//! seatgate license service
//!
//! Validates the configured license, enforces its seat count and reports
//! each license change to the activation service.
//!
//! Usage:
//!   seatgate --trust-keys trust-keys.json --license "$LICENSE"

use anyhow::{Context, Result};
use clap::Parser;
use seatgate_activation::{
    ActivationNotifier, ActivationStore, ActivationTracker, HttpActivationNotifier, SeatLedger,
};
use seatgate_license::{LicenseValidator, TrustKeySet};
use seatgate_server::{LicenseService, build_router};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "seatgate")]
#[command(about = "Signed license validation and activation tracking")]
struct Args {
    /// License string (base64 envelope)
    #[arg(long, env = "SEATGATE_LICENSE")]
    license: Option<String>,

    /// Path to the trust key JSON file
    #[arg(long, env = "SEATGATE_TRUST_KEYS")]
    trust_keys: PathBuf,

    /// Path to the SQLite database
    #[arg(long, env = "SEATGATE_DATABASE", default_value = "seatgate.db")]
    database: PathBuf,

    /// Activation service endpoint; transitions are only recorded locally when unset
    #[arg(long, env = "SEATGATE_ACTIVATION_URL")]
    activation_url: Option<String>,

    /// Activation request timeout in seconds
    #[arg(long, default_value = "10")]
    activation_timeout_secs: u64,

    /// Seconds between license checks
    #[arg(long, default_value = "3600")]
    check_interval_secs: u64,

    /// HTTP API port
    #[arg(long, default_value = "8080")]
    http_port: u16,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("seatgate starting...");
    let trust_keys = TrustKeySet::from_file(&args.trust_keys)
        .with_context(|| format!("Failed to load trust keys from {:?}", args.trust_keys))?;
    info!("Loaded {} trust key(s)", trust_keys.len());
    if trust_keys.is_empty() {
        warn!("No trust keys configured; every license will be rejected");
    }

    let store = ActivationStore::open(&args.database).context("Failed to open activation store")?;
    let seats = SeatLedger::open(&args.database).context("Failed to open seat ledger")?;

    let timeout = Duration::from_secs(args.activation_timeout_secs);
    let notifier: Option<Arc<dyn ActivationNotifier>> = match &args.activation_url {
        Some(url) => {
            info!("Reporting activations to {}", url);
            let notifier = HttpActivationNotifier::new(url.clone(), timeout)
                .context("Failed to build activation client")?;
            Some(Arc::new(notifier))
        }
        None => {
            info!("No activation URL configured; recording transitions locally");
            None
        }
    };
    let tracker = ActivationTracker::new(store, notifier).with_notify_timeout(timeout);

    let service = LicenseService::new(
        LicenseValidator::new(trust_keys),
        args.license.clone(),
        seats,
        tracker,
    );

    let decision = service.decision().await.context("Failed to evaluate license")?;
    match &decision.error {
        Some(err) => warn!("License rejected: {}", err),
        None => info!("License tier: {}", decision.tier),
    }

    let checker = service.clone();
    let interval = Duration::from_secs(args.check_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match checker.run_check().await {
                Ok(Some(record)) => info!("Recorded license transition {}", record.id),
                Ok(None) => debug!("License unchanged"),
                Err(e) => warn!("License check failed: {}", e),
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.http_port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", args.http_port))?;
    info!("HTTP API listening on port {}", args.http_port);
    axum::serve(listener, build_router(service))
        .await
        .context("HTTP server failed")?;
    Ok(())
}
