//! Persistent activation history backed by SQLite.
//!
//! The history is append-only. Each row names the record it supersedes
//! under a `UNIQUE` constraint, so two writers that observed the same head
//! can never both append a successor to it.

use crate::error::{ActivationError, ActivationResult};
use crate::notify::ActivationReply;
use crate::record::{ActivationId, ActivationRecord, DecisionSnapshot, LicenseFingerprint};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use seatgate_license::LicenseTier;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str =
    "SELECT id, created_at, tier, seat_count, fingerprint, activation_reply FROM activations";

type RawRecord = (String, String, String, Option<i64>, String, Option<String>);

/// Opens a SQLite connection configured for concurrent writers.
pub(crate) fn open_connection(path: Option<&Path>) -> ActivationResult<Connection> {
    let conn = match path {
        Some(path) => Connection::open(path),
        None => Connection::open_in_memory(),
    }
    .map_err(|e| ActivationError::Storage(format!("failed to open database: {e}")))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Append-only store of [`ActivationRecord`]s.
#[derive(Clone)]
pub struct ActivationStore {
    conn: Arc<Mutex<Connection>>,
}

impl ActivationStore {
    /// Opens (or creates) an activation store at the given path.
    pub fn open(path: impl AsRef<Path>) -> ActivationResult<Self> {
        Self::with_connection(open_connection(Some(path.as_ref()))?)
    }

    /// Opens an in-memory activation store (for testing).
    pub fn open_in_memory() -> ActivationResult<Self> {
        Self::with_connection(open_connection(None)?)
    }

    fn with_connection(conn: Connection) -> ActivationResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> ActivationResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS activations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                supersedes TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                tier TEXT NOT NULL,
                seat_count INTEGER,
                fingerprint TEXT NOT NULL,
                activation_reply TEXT
            );
            ",
        )
        .map_err(|e| ActivationError::Storage(format!("failed to init activation schema: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> ActivationResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ActivationError::Storage("activation store lock poisoned".to_string()))
    }

    /// Appends a record for `snapshot` unless the newest record already has
    /// the same fingerprint.
    ///
    /// Read, compare and insert run in one immediate transaction. The head
    /// is the last inserted row, and a new record is never dated before it,
    /// so a wall clock stepping back cannot reorder the history. Returns the
    /// new record, or `None` if nothing changed (or a concurrent writer
    /// recorded the same transition first).
    pub fn append_if_changed(
        &self,
        snapshot: &DecisionSnapshot,
    ) -> ActivationResult<Option<ActivationRecord>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let head: Option<(String, String, String)> = tx
            .query_row(
                "SELECT id, fingerprint, created_at FROM activations ORDER BY seq DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let mut created_at = Utc::now().trunc_subsecs(6);
        let supersedes = match head {
            Some((_, fingerprint, _)) if fingerprint == snapshot.fingerprint.as_str() => {
                return Ok(None);
            }
            Some((id, _, head_created_at)) => {
                created_at = created_at.max(parse_timestamp(&head_created_at)?);
                id
            }
            None => String::new(),
        };

        let record = ActivationRecord {
            id: ActivationId::new(),
            created_at,
            snapshot: snapshot.clone(),
            activation_reply: None,
        };

        let inserted = tx.execute(
            "INSERT INTO activations \
                (id, supersedes, created_at, tier, seat_count, fingerprint) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                supersedes,
                format_timestamp(&record.created_at),
                record.snapshot.tier.to_string(),
                record.snapshot.seat_count.map(i64::from),
                record.snapshot.fingerprint.as_str(),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        tx.commit()?;
        Ok(Some(record))
    }

    /// Attaches the activation service's reply to a record.
    ///
    /// A reply is written at most once; returns false if the record is
    /// unknown or already has one.
    pub fn attach_reply(
        &self,
        id: &ActivationId,
        reply: &ActivationReply,
    ) -> ActivationResult<bool> {
        let json = serde_json::to_string(reply)?;
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE activations SET activation_reply = ?1 \
             WHERE id = ?2 AND activation_reply IS NULL",
            params![json, id.to_string()],
        )?;
        Ok(changed > 0)
    }

    /// Returns the newest record.
    pub fn current(&self) -> ActivationResult<Option<ActivationRecord>> {
        Ok(self.history(1)?.into_iter().next())
    }

    /// Returns up to `limit` records, newest first.
    pub fn history(&self, limit: usize) -> ActivationResult<Vec<ActivationRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} ORDER BY seq DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
            let raw: RawRecord = (
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            );
            Ok(raw)
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(into_record(row?)?);
        }
        Ok(result)
    }

    /// Returns the number of stored records.
    pub fn count(&self) -> ActivationResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM activations", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn into_record(raw: RawRecord) -> ActivationResult<ActivationRecord> {
    let (id, created_at, tier, seat_count, fingerprint, reply) = raw;

    let id: ActivationId = id
        .parse()
        .map_err(|e| ActivationError::Storage(format!("invalid activation id {id:?}: {e}")))?;
    let created_at = parse_timestamp(&created_at)?;
    let seat_count = seat_count
        .map(u32::try_from)
        .transpose()
        .map_err(|e| ActivationError::Storage(format!("invalid seat count: {e}")))?;
    let activation_reply = reply.map(|json| serde_json::from_str(&json)).transpose()?;

    Ok(ActivationRecord {
        id,
        created_at,
        snapshot: DecisionSnapshot {
            tier: parse_tier(&tier)?,
            seat_count,
            fingerprint: LicenseFingerprint::from_stored(fingerprint),
        },
        activation_reply,
    })
}

fn parse_tier(s: &str) -> ActivationResult<LicenseTier> {
    match s {
        "community" => Ok(LicenseTier::Community),
        "professional" => Ok(LicenseTier::Professional),
        other => Err(ActivationError::Storage(format!("unknown tier {other:?}"))),
    }
}

/// Fixed-width RFC 3339 so timestamps sort lexically.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> ActivationResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| ActivationError::Storage(format!("invalid created_at {raw:?}: {e}")))
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}
