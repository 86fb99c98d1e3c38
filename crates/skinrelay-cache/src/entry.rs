//! Cached skin entry and freshness rules.

use chrono::{DateTime, Duration, Utc};
use skinrelay_common::{SkinIntent, SkinProperty};

/// A resolved property together with the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub property: SkinProperty,
    pub intent: SkinIntent,
    pub fetched_at: DateTime<Utc>,
    /// `None` never expires (custom and literal default skins).
    pub ttl: Option<Duration>,
}

impl CacheEntry {
    pub fn new(
        property: SkinProperty,
        intent: SkinIntent,
        fetched_at: DateTime<Utc>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            property,
            intent,
            fetched_at,
            ttl,
        }
    }

    /// Fresh while `now < fetched_at + ttl`; at exactly the boundary the entry is stale.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.ttl {
            None => true,
            Some(ttl) => now - self.fetched_at < ttl,
        }
    }

    /// Whether a stale entry may still be served when its refresh fails.
    pub fn within_stale_ceiling(&self, now: DateTime<Utc>, ceiling: Option<Duration>) -> bool {
        match ceiling {
            None => true,
            Some(ceiling) => now - self.fetched_at < ceiling,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.ttl.map(|ttl| self.fetched_at + ttl)
    }
}
