//! Skin resolution orchestration.
//!
//! [`SkinResolver`] ties the cache to the platform layer: it resolves a
//! player's skin through [`skinrelay_cache::CacheStore`] and applies the
//! result on the region thread that owns each live representation.
//! [`SkinService`] builds one from a [`SkinConfig`].

pub mod config;
pub mod error;
pub mod resolver;
pub mod service;

pub use config::{load_config, PlatformConfig, SkinConfig, DEFAULT_CONFIG_FILE};
pub use error::{ResolveError, ResolveResult};
pub use resolver::{ApplySummary, ResolveReport, SkinResolver};
pub use service::{SkinService, SkinServiceBuilder};
