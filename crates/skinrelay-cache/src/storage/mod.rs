//! Persistent tier.
//!
//! Backends are synchronous; the cache store calls them from blocking tasks.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use skinrelay_common::{PlayerIdentity, SkinIntent, SkinProperty, SkinSource};
use uuid::Uuid;

use crate::config::{StorageConfig, StorageKind};
use crate::entry::CacheEntry;
use crate::error::{SkinError, SkinResult};

mod file;
mod sqlite;

pub use file::FileStorage;
pub use sqlite::SqliteStorage;

/// One persisted skin per player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub uuid: Uuid,
    pub name: String,
    pub value: String,
    pub signature: String,
    pub source: SkinSource,
    pub intent: SkinIntent,
    pub fetched_at: DateTime<Utc>,
    /// `None` never expires.
    #[serde(default)]
    pub ttl_secs: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl StorageRecord {
    pub fn from_entry(identity: &PlayerIdentity, entry: &CacheEntry, now: DateTime<Utc>) -> Self {
        Self {
            uuid: identity.uuid(),
            name: identity.name().to_string(),
            value: entry.property.value().to_string(),
            signature: entry.property.signature().to_string(),
            source: entry.property.source(),
            intent: entry.intent.clone(),
            fetched_at: entry.fetched_at,
            ttl_secs: entry.ttl.map(|ttl| ttl.num_seconds()),
            updated_at: now,
        }
    }

    pub fn to_entry(&self) -> CacheEntry {
        CacheEntry::new(
            SkinProperty::new(self.value.clone(), self.signature.clone(), self.source),
            self.intent.clone(),
            self.fetched_at,
            self.ttl_secs.map(Duration::seconds),
        )
    }

    pub fn identity(&self) -> PlayerIdentity {
        PlayerIdentity::new(self.uuid, self.name.clone())
    }
}

/// Durable skin records keyed by player uuid.
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    fn load(&self, uuid: Uuid) -> SkinResult<Option<StorageRecord>>;

    /// Unconditional write (explicit sets).
    fn store(&self, record: &StorageRecord) -> SkinResult<()>;

    /// Write a refreshed record unless a record produced by a different
    /// intent is already stored. Returns whether the record was written.
    fn store_refresh(&self, record: &StorageRecord) -> SkinResult<bool>;

    /// Returns whether a record existed.
    fn delete(&self, uuid: Uuid) -> SkinResult<bool>;

    fn list(&self) -> SkinResult<Vec<StorageRecord>>;

    /// Remove every record; returns how many were removed.
    fn clear(&self) -> SkinResult<usize>;
}

/// Open the configured backend, creating its location if needed.
pub fn open_backend(config: &StorageConfig) -> SkinResult<Arc<dyn StorageBackend>> {
    let path = match &config.path {
        Some(path) => path.clone(),
        None => default_location(config.backend)?,
    };

    match config.backend {
        StorageKind::Sqlite => Ok(Arc::new(SqliteStorage::open(&path)?)),
        StorageKind::File => Ok(Arc::new(FileStorage::open(path)?)),
    }
}

fn default_location(kind: StorageKind) -> SkinResult<PathBuf> {
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| SkinError::Config {
            message: "could not determine data directory".to_string(),
        })?
        .join("skinrelay");

    Ok(match kind {
        StorageKind::Sqlite => base.join("skins.db"),
        StorageKind::File => base.join("skins"),
    })
}
