//! Upstream skin client and two-tier skin cache.
//!
//! # Overview
//!
//! - [`UpstreamClient`] talks to the session, profile and skin generation
//!   services behind a shared request budget, retrying transient failures.
//! - [`CacheStore`] answers lookups from a bounded [`MemoryCache`], then a
//!   [`StorageBackend`], then one coalesced upstream call per player and intent,
//!   serving stale entries when a refresh fails transiently.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SKINRELAY_SESSION_URL` | Session service base URL | `https://sessionserver.mojang.com` |
//! | `SKINRELAY_API_URL` | Profile API base URL | `https://api.mojang.com` |
//! | `SKINRELAY_MINESKIN_URL` | Skin generation service base URL | `https://api.mineskin.org` |
//! | `SKINRELAY_MINESKIN_KEY` | Generation service API key | None |
//! | `SKINRELAY_TIMEOUT` | Request timeout in seconds | `30` |
//! | `SKINRELAY_MAX_RETRIES` | Max retries for transient failures | `3` |
//! | `SKINRELAY_STORAGE` | `sqlite` or `file` | `sqlite` |
//! | `SKINRELAY_STORAGE_PATH` | Database file or record directory | data dir |

pub mod client;
pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
mod flight;
pub mod memory;
pub mod metrics;
pub mod storage;
pub mod store;
pub mod verify;

pub use client::{SkinFetcher, UpstreamClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CacheConfig, DefaultSkin, DefaultSkinConfig, PropertyConfig, RateLimitConfig, SignatureCheck,
    StorageConfig, StorageKind, UpstreamConfig,
};
pub use entry::CacheEntry;
pub use error::{SkinError, SkinResult};
pub use memory::MemoryCache;
pub use metrics::{CacheMetrics, CounterMetrics, LookupOutcome, MetricsSnapshot, NoopMetrics};
pub use storage::{open_backend, FileStorage, SqliteStorage, StorageBackend, StorageRecord};
pub use store::{CachePolicy, CacheStore, CacheStoreBuilder, PutOutcome, Resolution, ResolutionOrigin};
pub use verify::SignatureVerifier;
