//! Cache and upstream counters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

/// How a lookup was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    MemoryHit,
    StorageHit,
    Miss,
    StaleServed,
}

/// Sink for cache observations.
pub trait CacheMetrics: Send + Sync {
    fn record_lookup(&self, outcome: LookupOutcome);

    /// One upstream derivation finished; `error` is the error kind on failure.
    fn record_upstream(&self, latency: Duration, error: Option<&'static str>);

    /// A non-upstream failure (storage).
    fn record_error(&self, kind: &'static str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    fn record_lookup(&self, _outcome: LookupOutcome) {}
    fn record_upstream(&self, _latency: Duration, _error: Option<&'static str>) {}
    fn record_error(&self, _kind: &'static str) {}
}

/// In-process counters.
#[derive(Debug, Default)]
pub struct CounterMetrics {
    memory_hits: AtomicU64,
    storage_hits: AtomicU64,
    misses: AtomicU64,
    stale_served: AtomicU64,
    upstream_calls: AtomicU64,
    upstream_latency_ms: AtomicU64,
    errors: Mutex<BTreeMap<&'static str, u64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub memory_hits: u64,
    pub storage_hits: u64,
    pub misses: u64,
    pub stale_served: u64,
    pub upstream_calls: u64,
    pub upstream_latency_ms: u64,
    pub errors: BTreeMap<String, u64>,
}

impl CounterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let errors = self
            .errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect();

        MetricsSnapshot {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            storage_hits: self.storage_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
            upstream_calls: self.upstream_calls.load(Ordering::Relaxed),
            upstream_latency_ms: self.upstream_latency_ms.load(Ordering::Relaxed),
            errors,
        }
    }

    fn bump_error(&self, kind: &'static str) {
        *self
            .errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(kind)
            .or_insert(0) += 1;
    }
}

impl CacheMetrics for CounterMetrics {
    fn record_lookup(&self, outcome: LookupOutcome) {
        let counter = match outcome {
            LookupOutcome::MemoryHit => &self.memory_hits,
            LookupOutcome::StorageHit => &self.storage_hits,
            LookupOutcome::Miss => &self.misses,
            LookupOutcome::StaleServed => &self.stale_served,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_upstream(&self, latency: Duration, error: Option<&'static str>) {
        self.upstream_calls.fetch_add(1, Ordering::Relaxed);
        self.upstream_latency_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
        if let Some(kind) = error {
            self.bump_error(kind);
        }
    }

    fn record_error(&self, kind: &'static str) {
        self.bump_error(kind);
    }
}
