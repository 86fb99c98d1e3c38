//! In-process tier.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;
use uuid::Uuid;

use crate::entry::CacheEntry;

/// Bounded in-memory cache of resolved entries.
///
/// Freshness is decided by the cache store against its clock. Moka only
/// drops entries once they can no longer be served, even stale: after the
/// longer of `ttl` and `stale_ceiling`, both counted from the fetch. Entries
/// without a ttl stay until evicted for capacity.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Cache<Uuid, Arc<CacheEntry>>,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

struct Retention {
    stale_ceiling: Option<Duration>,
}

impl Retention {
    fn keep_for(&self, entry: &CacheEntry) -> Option<Duration> {
        let ttl = entry.ttl?.to_std().unwrap_or_default();
        self.stale_ceiling.map(|ceiling| ttl.max(ceiling))
    }
}

impl Expiry<Uuid, Arc<CacheEntry>> for Retention {
    fn expire_after_create(
        &self,
        _key: &Uuid,
        value: &Arc<CacheEntry>,
        _created_at: Instant,
    ) -> Option<Duration> {
        self.keep_for(value)
    }

    fn expire_after_update(
        &self,
        _key: &Uuid,
        value: &Arc<CacheEntry>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        self.keep_for(value)
    }
}

impl MemoryCache {
    pub fn new(capacity: u64, stale_ceiling: Option<Duration>) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .expire_after(Retention { stale_ceiling })
            .build();
        Self { entries }
    }

    pub fn get(&self, uuid: Uuid) -> Option<Arc<CacheEntry>> {
        self.entries.get(&uuid)
    }

    pub fn insert(&self, uuid: Uuid, entry: CacheEntry) -> Arc<CacheEntry> {
        let entry = Arc::new(entry);
        self.entries.insert(uuid, Arc::clone(&entry));
        entry
    }

    pub fn invalidate(&self, uuid: Uuid) {
        self.entries.invalidate(&uuid);
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Approximate entry count (pending evictions may not be applied yet).
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
