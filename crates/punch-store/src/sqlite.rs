//! SQLite-based store implementation

use chrono::{DateTime, Local};
use punch_util::{OriginContext, UserId};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::{AuditEvent, NewShift, Store, StoreResult, StoredShift, StoredTime};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            PRAGMA synchronous = FULL;

            -- Open shifts; seq keeps insertion order for listings
            CREATE TABLE IF NOT EXISTS open_shifts (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL UNIQUE,
                clock_in_at TEXT NOT NULL,
                origin_context TEXT,
                display_name TEXT
            );

            -- Most recent clock-out per user
            CREATE TABLE IF NOT EXISTS last_clock_out (
                user_id TEXT PRIMARY KEY,
                at TEXT NOT NULL
            );

            -- Users opted out of tracking
            CREATE TABLE IF NOT EXISTS excluded_users (
                user_id TEXT PRIMARY KEY
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn insert_shift(&self, shift: &NewShift) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let inserted = conn.execute(
            r#"
            INSERT INTO open_shifts (user_id, clock_in_at, origin_context, display_name)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
            params![
                shift.user_id.as_str(),
                punch_util::to_storage_string(&shift.clock_in_at),
                shift.origin_context.as_ref().map(|o| o.as_str()),
                shift.display_name.as_deref(),
            ],
        )?;

        debug!(user_id = %shift.user_id, inserted = inserted == 1, "Shift insert");
        Ok(inserted == 1)
    }

    fn close_shift(&self, user_id: &UserId, at: DateTime<Local>) -> StoreResult<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let deleted = tx.execute(
            "DELETE FROM open_shifts WHERE user_id = ?",
            [user_id.as_str()],
        )?;

        // Offsets may differ between rows, so compare instants rather than text
        let previous: Option<String> = tx
            .query_row(
                "SELECT at FROM last_clock_out WHERE user_id = ?",
                [user_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let advance = match previous.map(StoredTime::parse) {
            Some(StoredTime::Valid(prev)) => at > prev,
            _ => true,
        };

        if advance {
            tx.execute(
                r#"
                INSERT INTO last_clock_out (user_id, at)
                VALUES (?, ?)
                ON CONFLICT(user_id)
                DO UPDATE SET at = excluded.at
                "#,
                params![user_id.as_str(), punch_util::to_storage_string(&at)],
            )?;
        }

        tx.commit()?;

        debug!(user_id = %user_id, had_shift = deleted == 1, at = %at, advance, "Shift closed");
        Ok(deleted == 1)
    }

    fn load_shifts(&self) -> StoreResult<Vec<StoredShift>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT user_id, clock_in_at, origin_context, display_name
             FROM open_shifts ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            let user_id: String = row.get(0)?;
            let clock_in_at: String = row.get(1)?;
            let origin_context: Option<String> = row.get(2)?;
            let display_name: Option<String> = row.get(3)?;
            Ok((user_id, clock_in_at, origin_context, display_name))
        })?;

        let mut shifts = Vec::new();
        for row in rows {
            let (user_id, clock_in_at, origin_context, display_name) = row?;
            shifts.push(StoredShift {
                user_id: UserId::new(user_id),
                clock_in_at: StoredTime::parse(clock_in_at),
                origin_context: origin_context.map(OriginContext::new),
                display_name,
            });
        }

        Ok(shifts)
    }

    fn load_last_clock_outs(&self) -> StoreResult<Vec<(UserId, StoredTime)>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare("SELECT user_id, at FROM last_clock_out")?;
        let rows = stmt.query_map([], |row| {
            let user_id: String = row.get(0)?;
            let at: String = row.get(1)?;
            Ok((user_id, at))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (user_id, at) = row?;
            result.push((UserId::new(user_id), StoredTime::parse(at)));
        }

        Ok(result)
    }

    fn exclude_user(&self, user_id: &UserId) -> StoreResult<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO excluded_users (user_id) VALUES (?) ON CONFLICT(user_id) DO NOTHING",
            [user_id.as_str()],
        )?;
        let deleted = tx.execute(
            "DELETE FROM open_shifts WHERE user_id = ?",
            [user_id.as_str()],
        )?;

        tx.commit()?;

        debug!(user_id = %user_id, discarded_shift = deleted == 1, "User excluded");
        Ok(deleted == 1)
    }

    fn include_user(&self, user_id: &UserId) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM excluded_users WHERE user_id = ?",
            [user_id.as_str()],
        )?;

        debug!(user_id = %user_id, was_excluded = removed == 1, "User included");
        Ok(removed == 1)
    }

    fn load_excluded(&self) -> StoreResult<Vec<UserId>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare("SELECT user_id FROM excluded_users ORDER BY user_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut users = Vec::new();
        for row in rows {
            users.push(UserId::new(row?));
        }

        Ok(users)
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = punch_util::parse_storage_string(&timestamp_str)
                .unwrap_or_else(|_| punch_util::now());
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
