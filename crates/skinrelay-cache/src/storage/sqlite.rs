//! SQLite storage backend.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use skinrelay_common::{SkinIntent, SkinSource};
use tracing::debug;
use uuid::Uuid;

use super::{StorageBackend, StorageRecord};
use crate::error::{SkinError, SkinResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS skin_records (
    uuid        TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    value       TEXT NOT NULL,
    signature   TEXT NOT NULL,
    source      TEXT NOT NULL,
    intent      TEXT NOT NULL,
    fetched_at  TEXT NOT NULL,
    ttl_secs    INTEGER,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_skin_records_name ON skin_records(name);
"#;

const COLUMNS: &str = "uuid, name, value, signature, source, intent, fetched_at, ttl_secs, updated_at";

/// Readers on a file database each take their own connection.
const FILE_POOL_SIZE: usize = 4;

/// SQLite-backed skin storage.
///
/// File databases run in WAL mode with a small pool of connections so reads
/// for different players do not queue behind each other.
#[derive(Debug)]
pub struct SqliteStorage {
    pool: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl SqliteStorage {
    /// Open a file-backed store, creating parent directories.
    pub fn open(path: &Path) -> SkinResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SkinError::Storage {
                message: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }

        let mut pool = Vec::with_capacity(FILE_POOL_SIZE);
        for _ in 0..FILE_POOL_SIZE {
            let conn = Connection::open(path)?;
            Self::init_connection(&conn)?;
            pool.push(Mutex::new(conn));
        }
        debug!(path = %path.display(), "opened sqlite skin storage");

        Ok(Self {
            pool,
            next: AtomicUsize::new(0),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn memory() -> SkinResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(&conn)?;
        Ok(Self {
            pool: vec![Mutex::new(conn)],
            next: AtomicUsize::new(0),
        })
    }

    fn init_connection(conn: &Connection) -> SkinResult<()> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        // WAL mode for file-backed DBs (no-op for in-memory)
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> SkinResult<MutexGuard<'_, Connection>> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        self.pool[index].lock().map_err(|_| SkinError::Storage {
            message: "sqlite connection lock poisoned".to_string(),
        })
    }

    fn write(&self, record: &StorageRecord, conditional: bool) -> SkinResult<bool> {
        let intent = encode_intent(&record.intent)?;
        let guard = if conditional {
            "WHERE skin_records.intent = excluded.intent"
        } else {
            ""
        };
        let sql = format!(
            r#"
            INSERT INTO skin_records ({COLUMNS})
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(uuid) DO UPDATE SET
                name = excluded.name,
                value = excluded.value,
                signature = excluded.signature,
                source = excluded.source,
                intent = excluded.intent,
                fetched_at = excluded.fetched_at,
                ttl_secs = excluded.ttl_secs,
                updated_at = excluded.updated_at
            {guard}
            "#
        );

        let conn = self.conn()?;
        let changed = conn.execute(
            &sql,
            params![
                record.uuid.to_string(),
                record.name,
                record.value,
                record.signature,
                record.source.as_str(),
                intent,
                record.fetched_at.to_rfc3339(),
                record.ttl_secs,
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }
}

impl StorageBackend for SqliteStorage {
    fn load(&self, uuid: Uuid) -> SkinResult<Option<StorageRecord>> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM skin_records WHERE uuid = ?1"),
                [uuid.to_string()],
                RawRecord::from_row,
            )
            .optional()?;

        raw.map(RawRecord::into_record).transpose()
    }

    fn store(&self, record: &StorageRecord) -> SkinResult<()> {
        self.write(record, false).map(|_| ())
    }

    fn store_refresh(&self, record: &StorageRecord) -> SkinResult<bool> {
        self.write(record, true)
    }

    fn delete(&self, uuid: Uuid) -> SkinResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM skin_records WHERE uuid = ?1",
            [uuid.to_string()],
        )?;
        Ok(removed > 0)
    }

    fn list(&self) -> SkinResult<Vec<StorageRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM skin_records ORDER BY name, uuid"
        ))?;
        let rows = stmt.query_map([], RawRecord::from_row)?;

        let mut records = Vec::new();
        for raw in rows {
            records.push(raw?.into_record()?);
        }
        Ok(records)
    }

    fn clear(&self) -> SkinResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM skin_records", [])?)
    }
}

/// Row as stored, before text columns are parsed.
struct RawRecord {
    uuid: String,
    name: String,
    value: String,
    signature: String,
    source: String,
    intent: String,
    fetched_at: String,
    ttl_secs: Option<i64>,
    updated_at: String,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uuid: row.get(0)?,
            name: row.get(1)?,
            value: row.get(2)?,
            signature: row.get(3)?,
            source: row.get(4)?,
            intent: row.get(5)?,
            fetched_at: row.get(6)?,
            ttl_secs: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_record(self) -> SkinResult<StorageRecord> {
        let uuid = Uuid::parse_str(&self.uuid).map_err(|e| corrupt(&self.uuid, e))?;
        let source = SkinSource::parse(&self.source)
            .ok_or_else(|| corrupt(&self.uuid, format!("unknown source {:?}", self.source)))?;
        let intent: SkinIntent =
            serde_json::from_str(&self.intent).map_err(|e| corrupt(&self.uuid, e))?;

        Ok(StorageRecord {
            uuid,
            name: self.name,
            value: self.value,
            signature: self.signature,
            source,
            intent,
            fetched_at: parse_time(&self.uuid, &self.fetched_at)?,
            ttl_secs: self.ttl_secs,
            updated_at: parse_time(&self.uuid, &self.updated_at)?,
        })
    }
}

fn encode_intent(intent: &SkinIntent) -> SkinResult<String> {
    serde_json::to_string(intent).map_err(|e| SkinError::Storage {
        message: format!("failed to encode intent: {}", e),
    })
}

fn parse_time(uuid: &str, value: &str) -> SkinResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(uuid, e))
}

fn corrupt(uuid: &str, detail: impl std::fmt::Display) -> SkinError {
    SkinError::Storage {
        message: format!("corrupt skin record {}: {}", uuid, detail),
    }
}
