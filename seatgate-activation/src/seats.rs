//! Seat ledger: who holds one of the licensed privileged seats.
//!
//! The licensed seat count is enforced when a seat is claimed, not only
//! when the license is evaluated. Count, compare and insert run inside one
//! immediate transaction so concurrent claims cannot jointly exceed the cap.

use crate::error::{ActivationError, ActivationResult};
use crate::store::{format_timestamp, open_connection};
use chrono::Utc;
use rusqlite::{params, Connection, TransactionBehavior};
use seatgate_license::{LicenseDecision, LicenseError};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Persistent set of seat holders.
#[derive(Clone)]
pub struct SeatLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SeatLedger {
    /// Opens (or creates) a seat ledger at the given path.
    pub fn open(path: impl AsRef<Path>) -> ActivationResult<Self> {
        Self::with_connection(open_connection(Some(path.as_ref()))?)
    }

    /// Opens an in-memory seat ledger (for testing).
    pub fn open_in_memory() -> ActivationResult<Self> {
        Self::with_connection(open_connection(None)?)
    }

    fn with_connection(conn: Connection) -> ActivationResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS seats (
                holder TEXT PRIMARY KEY,
                claimed_at TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| ActivationError::Storage(format!("failed to init seat schema: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> ActivationResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ActivationError::Storage("seat ledger lock poisoned".to_string()))
    }

    /// Claims a seat for `holder` under `decision`.
    ///
    /// Returns false if `holder` already holds a seat.
    ///
    /// # Errors
    ///
    /// [`LicenseError::LicenseRequired`] for a non-professional decision,
    /// [`LicenseError::UserLimitExceeded`] if every licensed seat is taken.
    pub fn claim(&self, holder: &str, decision: &LicenseDecision) -> ActivationResult<bool> {
        decision.require_professional()?;
        let limit = decision.seat_count.unwrap_or(0);

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let held: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM seats WHERE holder = ?1)",
            params![holder],
            |row| row.get(0),
        )?;
        if held {
            return Ok(false);
        }

        let in_use: i64 = tx.query_row("SELECT COUNT(*) FROM seats", [], |row| row.get(0))?;
        let in_use = u32::try_from(in_use).unwrap_or(u32::MAX);
        if in_use >= limit {
            return Err(LicenseError::UserLimitExceeded {
                limit,
                in_use: in_use.saturating_add(1),
            }
            .into());
        }

        tx.execute(
            "INSERT INTO seats (holder, claimed_at) VALUES (?1, ?2)",
            params![holder, format_timestamp(&Utc::now())],
        )?;
        tx.commit()?;

        info!(holder, seats_in_use = in_use + 1, limit, "seat claimed");
        Ok(true)
    }

    /// Releases `holder`'s seat. Returns false if it held none.
    pub fn release(&self, holder: &str) -> ActivationResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM seats WHERE holder = ?1", params![holder])?;
        Ok(removed > 0)
    }

    /// Number of seats currently held.
    pub fn active_count(&self) -> ActivationResult<u32> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM seats", [], |row| row.get(0))?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Current seat holders, in claim order.
    pub fn holders(&self) -> ActivationResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT holder FROM seats ORDER BY claimed_at, rowid")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut holders = Vec::new();
        for row in rows {
            holders.push(row?);
        }
        Ok(holders)
    }
}
