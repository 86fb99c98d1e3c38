//! `skinrelay.yaml` loading.
//!
//! ```yaml
//! upstream:
//!   api_key: "..."
//!   rate_limit: { requests: 600, window_secs: 600 }
//!   signature_public_key_path: /etc/skinrelay/yggdrasil_session_pubkey.der
//! cache:
//!   original_ttl_secs: 3600
//!   stale_ceiling_secs: 604800
//! storage:
//!   backend: sqlite
//! platform:
//!   allowlist: [spigot, paper, folia]
//! defaults:
//!   player: Steve
//! ```
//!
//! Every section and field is optional. Environment overrides are applied
//! by [`SkinConfig::with_env_overrides`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use skinrelay_cache::{CacheConfig, DefaultSkinConfig, StorageConfig, UpstreamConfig};
use skinrelay_platform::PlatformVariant;
use tracing::warn;

use crate::error::{ResolveError, ResolveResult};

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "skinrelay.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkinConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub defaults: DefaultSkinConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Variants this deployment may run as. Empty permits all.
    #[serde(default = "default_allowlist")]
    pub allowlist: Vec<PlatformVariant>,

    /// Version string to probe when running outside a server, e.g. from the CLI.
    #[serde(default = "default_server_version")]
    pub server_version: String,

    /// Marker types to report as present when running outside a server.
    #[serde(default)]
    pub markers: Vec<String>,
}

fn default_allowlist() -> Vec<PlatformVariant> {
    PlatformVariant::ALL.to_vec()
}

fn default_server_version() -> String {
    "1.20.4".to_string()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            allowlist: default_allowlist(),
            server_version: default_server_version(),
            markers: Vec::new(),
        }
    }
}

impl SkinConfig {
    pub fn from_yaml_str(raw: &str) -> ResolveResult<Self> {
        let config: SkinConfig = serde_yaml::from_str(raw)
            .map_err(|e| ResolveError::config(format!("failed to parse YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SKINRELAY_*` environment overrides on top of the file values.
    pub fn with_env_overrides(mut self) -> Self {
        self.upstream = self.upstream.with_env_overrides();
        self.storage = self.storage.with_env_overrides();
        self
    }

    pub fn validate(&self) -> ResolveResult<()> {
        let limit = &self.upstream.rate_limit;
        if limit.requests == 0 || limit.window_secs == 0 {
            return Err(ResolveError::config(
                "upstream.rate_limit needs a positive request count and window",
            ));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ResolveError::config("upstream.timeout_secs must be positive"));
        }
        if self.cache.original_ttl_secs == 0 {
            return Err(ResolveError::config("cache.original_ttl_secs must be positive"));
        }
        if self.cache.memory_capacity == 0 {
            return Err(ResolveError::config("cache.memory_capacity must be positive"));
        }
        if let Some(name) = &self.defaults.player {
            if !skinrelay_common::is_valid_player_name(name) {
                return Err(ResolveError::config(format!(
                    "defaults.player is not a valid player name: {}",
                    name
                )));
            }
            if self.defaults.property.is_some() {
                warn!("defaults.property and defaults.player are both set, using the property");
            }
        }
        Ok(())
    }
}

/// Read and validate a config file.
pub fn load_config(path: &Path) -> ResolveResult<SkinConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ResolveError::config(format!("failed to read config {}: {}", path.display(), e))
    })?;
    SkinConfig::from_yaml_str(&raw)
}
