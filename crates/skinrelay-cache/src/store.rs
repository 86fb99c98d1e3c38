//! Two-tier skin cache: memory in front of storage, upstream behind both.
//!
//! Write ordering per player is kept with striped locks, each holding one
//! generation counter shared by the players hashed to it. Explicit writes
//! (`put`, `invalidate`, `purge`) bump the stripe's generation; a refresh
//! that started before the bump never overwrites the newer value. A bump for
//! a neighbour in the same stripe only costs that refresh its cache write.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use skinrelay_common::{PlayerIdentity, SkinIntent, SkinProperty, SkinSource};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::SkinFetcher;
use crate::clock::{Clock, SystemClock};
use crate::config::{CacheConfig, DefaultSkin};
use crate::entry::CacheEntry;
use crate::error::{SkinError, SkinResult};
use crate::flight::SingleFlight;
use crate::memory::MemoryCache;
use crate::metrics::{CacheMetrics, LookupOutcome, NoopMetrics};
use crate::storage::{StorageBackend, StorageRecord};
use crate::verify::SignatureVerifier;

const LOCK_STRIPES: usize = 256;

/// Freshness policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Lifetime of upstream (original) skins.
    pub original_ttl: Duration,
    /// Oldest age from fetch at which a stale entry may be served on refresh failure.
    pub stale_ceiling: Option<Duration>,
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            original_ttl: Duration::seconds(config.original_ttl_secs as i64),
            stale_ceiling: config
                .stale_ceiling_secs
                .map(|secs| Duration::seconds(secs as i64)),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

/// Which tier answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOrigin {
    Memory,
    Storage,
    Upstream,
    /// Refresh failed; an expired entry was served instead.
    Stale,
}

impl ResolutionOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Storage => "storage",
            Self::Upstream => "upstream",
            Self::Stale => "stale",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub entry: Arc<CacheEntry>,
    pub origin: ResolutionOrigin,
}

impl Resolution {
    pub fn property(&self) -> &SkinProperty {
        &self.entry.property
    }

    pub fn is_stale(&self) -> bool {
        self.origin == ResolutionOrigin::Stale
    }
}

#[derive(Debug, Clone)]
pub struct PutOutcome {
    pub entry: Arc<CacheEntry>,
    /// False when storage failed and the value lives in memory only.
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FlightKey {
    uuid: Uuid,
    intent: SkinIntent,
}

/// (purge epoch, stripe generation)
type Generation = (u64, u64);

struct KeyLocks {
    stripes: Vec<Mutex<u64>>,
    epoch: AtomicU64,
}

impl KeyLocks {
    fn new() -> Self {
        Self {
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(0)).collect(),
            epoch: AtomicU64::new(0),
        }
    }

    fn stripe_of(&self, uuid: Uuid) -> usize {
        (uuid.as_u128() % self.stripes.len() as u128) as usize
    }

    async fn lock(&self, uuid: Uuid) -> MutexGuard<'_, u64> {
        self.stripes[self.stripe_of(uuid)].lock().await
    }

    fn read(&self, slot: &u64) -> Generation {
        (self.epoch.load(Ordering::SeqCst), *slot)
    }

    fn bump(slot: &mut u64) {
        *slot = slot.wrapping_add(1);
    }

    async fn snapshot(&self, uuid: Uuid) -> Generation {
        let slot = self.lock(uuid).await;
        self.read(&slot)
    }

    /// Stripes are always taken in index order.
    async fn lock_all(&self) -> Vec<MutexGuard<'_, u64>> {
        let mut guards = Vec::with_capacity(self.stripes.len());
        for stripe in &self.stripes {
            guards.push(stripe.lock().await);
        }
        guards
    }
}

/// Resolves skins through memory, storage and upstream, in that order.
pub struct CacheStore {
    memory: MemoryCache,
    /// Refreshed entries the stored record does not answer, such as the
    /// original skin of a player who chose a custom one.
    shadowed: MemoryCache,
    storage: Arc<dyn StorageBackend>,
    fetcher: Arc<dyn SkinFetcher>,
    verifier: SignatureVerifier,
    default_skin: DefaultSkin,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn CacheMetrics>,
    refreshes: SingleFlight<FlightKey, SkinResult<Arc<CacheEntry>>>,
    derivations: SingleFlight<FlightKey, SkinResult<SkinProperty>>,
    locks: KeyLocks,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("memory", &self.memory)
            .field("storage", &self.storage)
            .field("policy", &self.policy)
            .field("default_skin", &self.default_skin)
            .finish_non_exhaustive()
    }
}

pub struct CacheStoreBuilder {
    fetcher: Arc<dyn SkinFetcher>,
    storage: Arc<dyn StorageBackend>,
    policy: CachePolicy,
    memory_capacity: u64,
    verifier: SignatureVerifier,
    default_skin: DefaultSkin,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn CacheMetrics>,
}

impl CacheStoreBuilder {
    pub fn config(mut self, config: &CacheConfig) -> Self {
        self.policy = CachePolicy::from(config);
        self.memory_capacity = config.memory_capacity;
        self
    }

    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn verifier(mut self, verifier: SignatureVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn default_skin(mut self, default_skin: DefaultSkin) -> Self {
        self.default_skin = default_skin;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn build(self) -> CacheStore {
        let retention = self
            .policy
            .stale_ceiling
            .map(|ceiling| ceiling.to_std().unwrap_or_default());

        CacheStore {
            memory: MemoryCache::new(self.memory_capacity, retention),
            shadowed: MemoryCache::new(self.memory_capacity, retention),
            storage: self.storage,
            fetcher: self.fetcher,
            verifier: self.verifier,
            default_skin: self.default_skin,
            policy: self.policy,
            clock: self.clock,
            metrics: self.metrics,
            refreshes: SingleFlight::new(),
            derivations: SingleFlight::new(),
            locks: KeyLocks::new(),
        }
    }
}

impl CacheStore {
    pub fn builder(
        fetcher: Arc<dyn SkinFetcher>,
        storage: Arc<dyn StorageBackend>,
    ) -> CacheStoreBuilder {
        CacheStoreBuilder {
            fetcher,
            storage,
            policy: CachePolicy::default(),
            memory_capacity: CacheConfig::default().memory_capacity,
            verifier: SignatureVerifier::default(),
            default_skin: DefaultSkin::None,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Resolve `intent` for a player: a fresh memory entry, else a fresh
    /// stored record, else one coalesced upstream derivation.
    ///
    /// When the derivation fails with a transient error, an expired entry
    /// within the stale ceiling is served instead.
    pub async fn get(
        &self,
        identity: &PlayerIdentity,
        intent: &SkinIntent,
    ) -> SkinResult<Resolution> {
        let uuid = identity.uuid();
        let now = self.clock.now();
        let generation = self.locks.snapshot(uuid).await;
        let mut stale: Option<Arc<CacheEntry>> = None;

        if let Some(entry) = self.memory.get(uuid) {
            if intent.is_answered_by(&entry.intent) {
                if entry.is_fresh(now) {
                    self.metrics.record_lookup(LookupOutcome::MemoryHit);
                    debug!(uuid = %uuid, intent = %intent, "memory hit");
                    return Ok(Resolution {
                        entry,
                        origin: ResolutionOrigin::Memory,
                    });
                }
                stale = Some(entry);
            }
        }

        if stale.is_none() && !matches!(intent, SkinIntent::Stored) {
            if let Some(entry) = self.shadowed.get(uuid) {
                if entry.intent == *intent {
                    if entry.is_fresh(now) {
                        self.metrics.record_lookup(LookupOutcome::MemoryHit);
                        debug!(uuid = %uuid, intent = %intent, "memory hit beside stored choice");
                        return Ok(Resolution {
                            entry,
                            origin: ResolutionOrigin::Memory,
                        });
                    }
                    stale = Some(entry);
                }
            }
        }

        match self.load(uuid).await {
            Ok(Some(record)) => {
                let entry = record.to_entry();
                if intent.is_answered_by(&entry.intent) {
                    if entry.is_fresh(now) {
                        let entry = self.fill_memory(uuid, entry, generation).await;
                        self.metrics.record_lookup(LookupOutcome::StorageHit);
                        debug!(uuid = %uuid, intent = %intent, "storage hit");
                        return Ok(Resolution {
                            entry,
                            origin: ResolutionOrigin::Storage,
                        });
                    }
                    if stale
                        .as_ref()
                        .map_or(true, |s| s.fetched_at < entry.fetched_at)
                    {
                        stale = Some(Arc::new(entry));
                    }
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(uuid = %uuid, error = %err, "storage read failed, treating as miss");
                self.metrics.record_error(err.kind());
            }
        }

        let effective = match intent {
            SkinIntent::Stored => stale
                .as_ref()
                .map(|entry| entry.intent.clone())
                .unwrap_or(SkinIntent::Original),
            other => other.clone(),
        };

        self.metrics.record_lookup(LookupOutcome::Miss);
        let key = FlightKey {
            uuid,
            intent: effective.clone(),
        };
        let result = self
            .refreshes
            .run(key, || self.refresh(identity, &effective, generation))
            .await;

        match result {
            Ok(entry) => Ok(Resolution {
                entry,
                origin: ResolutionOrigin::Upstream,
            }),
            Err(err) => self.serve_stale(uuid, stale, err, now),
        }
    }

    /// Record an explicit choice. Replaces whatever intent was stored.
    ///
    /// A storage failure leaves the value in memory and reports
    /// `persisted: false`.
    pub async fn put(
        &self,
        identity: &PlayerIdentity,
        property: SkinProperty,
        intent: SkinIntent,
    ) -> SkinResult<PutOutcome> {
        if !intent.is_explicit() {
            return Err(SkinError::InvalidIntent {
                reason: "cannot store a skin for the stored intent".to_string(),
            });
        }

        let uuid = identity.uuid();
        let now = self.clock.now();
        let ttl = self.ttl_for(&intent);
        let entry = CacheEntry::new(property, intent, now, ttl);

        let mut slot = self.locks.lock(uuid).await;
        KeyLocks::bump(&mut slot);
        self.memory.invalidate(uuid);

        let record = StorageRecord::from_entry(identity, &entry, now);
        let persisted = match self.blocking(move |storage| storage.store(&record)).await {
            Ok(()) => true,
            Err(err) => {
                warn!(uuid = %uuid, error = %err, "failed to persist skin, keeping it in memory only");
                self.metrics.record_error(err.kind());
                false
            }
        };

        let entry = self.memory.insert(uuid, entry);
        drop(slot);

        info!(
            uuid = %uuid,
            intent = %entry.intent,
            hash = entry.property.hash(),
            persisted,
            "stored skin"
        );
        Ok(PutOutcome { entry, persisted })
    }

    /// Drop a player's entry from both tiers. Returns whether a stored record existed.
    pub async fn invalidate(&self, uuid: Uuid) -> SkinResult<bool> {
        let mut slot = self.locks.lock(uuid).await;
        KeyLocks::bump(&mut slot);
        self.memory.invalidate(uuid);
        self.shadowed.invalidate(uuid);
        let removed = self.blocking(move |storage| storage.delete(uuid)).await?;
        drop(slot);

        debug!(uuid = %uuid, removed, "invalidated skin");
        Ok(removed)
    }

    /// Drop every entry from both tiers. Returns the number of stored records removed.
    pub async fn purge(&self) -> SkinResult<usize> {
        let guards = self.locks.lock_all().await;
        self.locks.epoch.fetch_add(1, Ordering::SeqCst);
        self.memory.clear();
        self.shadowed.clear();
        let removed = self.blocking(|storage| storage.clear()).await?;
        drop(guards);

        info!(removed, "purged skin cache");
        Ok(removed)
    }

    /// Derive the property for an explicit intent without caching it.
    ///
    /// Concurrent calls for the same player and intent share one upstream call.
    pub async fn fetch_for(
        &self,
        identity: &PlayerIdentity,
        intent: &SkinIntent,
    ) -> SkinResult<SkinProperty> {
        let key = FlightKey {
            uuid: identity.uuid(),
            intent: intent.clone(),
        };
        self.derivations
            .run(key, || self.derive(identity, intent))
            .await
    }

    /// Memory entry, without touching storage or upstream.
    pub fn peek(&self, uuid: Uuid) -> Option<Arc<CacheEntry>> {
        self.memory.get(uuid)
    }

    /// Stored record, without touching memory or upstream.
    pub async fn record(&self, uuid: Uuid) -> SkinResult<Option<StorageRecord>> {
        self.load(uuid).await
    }

    pub async fn records(&self) -> SkinResult<Vec<StorageRecord>> {
        self.blocking(|storage| storage.list()).await
    }

    fn ttl_for(&self, intent: &SkinIntent) -> Option<Duration> {
        match intent {
            SkinIntent::Stored | SkinIntent::Original | SkinIntent::Player { .. } => {
                Some(self.policy.original_ttl)
            }
            SkinIntent::Default => match self.default_skin {
                DefaultSkin::Player(_) => Some(self.policy.original_ttl),
                DefaultSkin::Property(_) | DefaultSkin::None => None,
            },
            SkinIntent::Url { .. } | SkinIntent::Upload { .. } => None,
        }
    }

    async fn refresh(
        &self,
        identity: &PlayerIdentity,
        intent: &SkinIntent,
        generation: Generation,
    ) -> SkinResult<Arc<CacheEntry>> {
        let uuid = identity.uuid();

        // A flight that finished between our reads and this one may already have the answer.
        if let Some(entry) = self.memory.get(uuid) {
            if intent.is_answered_by(&entry.intent) && entry.is_fresh(self.clock.now()) {
                return Ok(entry);
            }
        }

        let property = self.fetch_for(identity, intent).await?;
        let entry = CacheEntry::new(
            property,
            intent.clone(),
            self.clock.now(),
            self.ttl_for(intent),
        );
        self.commit_refresh(identity, entry, generation).await
    }

    async fn commit_refresh(
        &self,
        identity: &PlayerIdentity,
        entry: CacheEntry,
        generation: Generation,
    ) -> SkinResult<Arc<CacheEntry>> {
        let uuid = identity.uuid();
        let slot = self.locks.lock(uuid).await;

        if self.locks.read(&slot) != generation {
            debug!(uuid = %uuid, "skin changed during refresh, not caching fetched value");
            return Ok(Arc::new(entry));
        }

        let record = StorageRecord::from_entry(identity, &entry, self.clock.now());
        match self
            .blocking(move |storage| storage.store_refresh(&record))
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(uuid = %uuid, "stored record has another intent, not overwriting it");
                // memory claiming the refreshed intent disagrees with storage
                if self
                    .memory
                    .get(uuid)
                    .is_some_and(|cached| cached.intent == entry.intent)
                {
                    self.memory.invalidate(uuid);
                }
                return Ok(self.shadowed.insert(uuid, entry));
            }
            Err(err) => {
                warn!(uuid = %uuid, error = %err, "failed to persist refreshed skin, keeping it in memory only");
                self.metrics.record_error(err.kind());
            }
        }

        let entry = self.memory.insert(uuid, entry);
        drop(slot);
        Ok(entry)
    }

    async fn fill_memory(
        &self,
        uuid: Uuid,
        entry: CacheEntry,
        generation: Generation,
    ) -> Arc<CacheEntry> {
        let slot = self.locks.lock(uuid).await;
        if self.locks.read(&slot) == generation {
            self.memory.insert(uuid, entry)
        } else {
            Arc::new(entry)
        }
    }

    async fn derive(
        &self,
        identity: &PlayerIdentity,
        intent: &SkinIntent,
    ) -> SkinResult<SkinProperty> {
        let started = std::time::Instant::now();

        let (result, upstream) = match intent {
            SkinIntent::Stored | SkinIntent::Original => {
                (self.fetcher.fetch(identity).await, true)
            }
            SkinIntent::Player { name } => (self.fetch_by_name(name).await, true),
            SkinIntent::Url { url, variant } => {
                (self.fetcher.generate(url, *variant).await, true)
            }
            SkinIntent::Upload { value, signature } => (
                self.verifier.verify(value, signature).map(|_| {
                    SkinProperty::new(value.clone(), signature.clone(), SkinSource::CustomUpload)
                }),
                false,
            ),
            SkinIntent::Default => match &self.default_skin {
                DefaultSkin::Property(property) => (Ok(property.clone()), false),
                DefaultSkin::Player(name) => (self.fetch_by_name(name).await, true),
                DefaultSkin::None => (
                    Err(SkinError::NotFound {
                        subject: "server default skin".to_string(),
                    }),
                    false,
                ),
            },
        };

        if upstream {
            self.metrics
                .record_upstream(started.elapsed(), result.as_ref().err().map(SkinError::kind));
        }

        match &result {
            Ok(property) => debug!(
                player = %identity,
                intent = %intent,
                hash = property.hash(),
                "derived skin"
            ),
            Err(err) => debug!(player = %identity, intent = %intent, error = %err, "derivation failed"),
        }

        result.map(|property| property.with_source(intent.source()))
    }

    async fn fetch_by_name(&self, name: &str) -> SkinResult<SkinProperty> {
        let target = self.fetcher.lookup(name).await?;
        self.fetcher.fetch(&target).await
    }

    fn serve_stale(
        &self,
        uuid: Uuid,
        stale: Option<Arc<CacheEntry>>,
        err: SkinError,
        now: DateTime<Utc>,
    ) -> SkinResult<Resolution> {
        if err.allows_stale() {
            if let Some(entry) =
                stale.filter(|entry| entry.within_stale_ceiling(now, self.policy.stale_ceiling))
            {
                warn!(
                    uuid = %uuid,
                    error = %err,
                    kind = err.kind(),
                    fetched_at = %entry.fetched_at,
                    "refresh failed, serving stale skin"
                );
                self.metrics.record_lookup(LookupOutcome::StaleServed);
                return Ok(Resolution {
                    entry,
                    origin: ResolutionOrigin::Stale,
                });
            }
        }
        Err(err)
    }

    async fn load(&self, uuid: Uuid) -> SkinResult<Option<StorageRecord>> {
        self.blocking(move |storage| storage.load(uuid)).await
    }

    async fn blocking<T, F>(&self, op: F) -> SkinResult<T>
    where
        F: FnOnce(&dyn StorageBackend) -> SkinResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || op(storage.as_ref()))
            .await
            .map_err(|e| SkinError::Storage {
                message: format!("storage task failed: {}", e),
            })?
    }
}
