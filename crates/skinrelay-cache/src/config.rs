//! Configuration for the upstream client and cache tiers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use skinrelay_common::{SkinProperty, SkinSource};

/// Upstream service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Session service base URL (profile + signed textures by uuid).
    #[serde(default = "default_session_url")]
    pub session_url: String,

    /// Profile API base URL (name to uuid lookups).
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Skin generation service base URL.
    #[serde(default = "default_mineskin_url")]
    pub mineskin_url: String,

    /// Bearer key for the generation service.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff, in milliseconds.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Upper bound on any single backoff, in seconds.
    #[serde(default = "default_retry_cap_secs")]
    pub retry_cap_secs: u64,

    /// Request budget shared by every call of the client.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// How textures signatures are checked.
    #[serde(default)]
    pub signature_verification: SignatureCheck,

    /// PEM (SPKI) public key used to verify textures signatures.
    #[serde(default)]
    pub signature_public_key_pem: Option<String>,

    /// File holding the public key, PEM or DER (authlib ships
    /// `yggdrasil_session_pubkey.der`). Ignored when the PEM is set inline.
    #[serde(default)]
    pub signature_public_key_path: Option<PathBuf>,
}

/// Signature checking mode.
///
/// `verify` with no key configured rejects every signed property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureCheck {
    #[default]
    Verify,
    /// Shape checks only: base64 signature, decodable textures payload.
    Structural,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_requests")]
    pub requests: u32,

    #[serde(default = "default_rate_window_secs")]
    pub window_secs: u64,
}

fn default_session_url() -> String {
    "https://sessionserver.mojang.com".to_string()
}

fn default_api_url() -> String {
    "https://api.mojang.com".to_string()
}

fn default_mineskin_url() -> String {
    "https://api.mineskin.org".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    1000
}

fn default_retry_cap_secs() -> u64 {
    30
}

fn default_rate_requests() -> u32 {
    600
}

fn default_rate_window_secs() -> u64 {
    600
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: default_rate_requests(),
            window_secs: default_rate_window_secs(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            session_url: default_session_url(),
            api_url: default_api_url(),
            mineskin_url: default_mineskin_url(),
            api_key: None,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            retry_cap_secs: default_retry_cap_secs(),
            rate_limit: RateLimitConfig::default(),
            signature_verification: SignatureCheck::default(),
            signature_public_key_pem: None,
            signature_public_key_path: None,
        }
    }
}

impl UpstreamConfig {
    /// Apply environment overrides.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `SKINRELAY_SESSION_URL` | Session service base URL |
    /// | `SKINRELAY_API_URL` | Profile API base URL |
    /// | `SKINRELAY_MINESKIN_URL` | Skin generation service base URL |
    /// | `SKINRELAY_MINESKIN_KEY` | Generation service API key |
    /// | `SKINRELAY_TIMEOUT` | Request timeout in seconds |
    /// | `SKINRELAY_MAX_RETRIES` | Max retries for transient failures |
    /// | `SKINRELAY_SIGNATURE_KEY` | Path of the signature public key |
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("SKINRELAY_SESSION_URL") {
            self.session_url = url;
        }
        if let Ok(url) = std::env::var("SKINRELAY_API_URL") {
            self.api_url = url;
        }
        if let Ok(url) = std::env::var("SKINRELAY_MINESKIN_URL") {
            self.mineskin_url = url;
        }
        if let Ok(key) = std::env::var("SKINRELAY_MINESKIN_KEY") {
            self.api_key = Some(key);
        }
        if let Some(timeout) = std::env::var("SKINRELAY_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.timeout_secs = timeout;
        }
        if let Some(retries) = std::env::var("SKINRELAY_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.max_retries = retries;
        }
        if let Ok(path) = std::env::var("SKINRELAY_SIGNATURE_KEY") {
            self.signature_public_key_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Point every service at one base URL (test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.session_url = url.clone();
        self.api_url = url.clone();
        self.mineskin_url = url;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_retry(mut self, max_retries: u32, base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_base_ms = base_ms;
        self
    }

    pub fn with_rate_limit(mut self, requests: u32, window_secs: u64) -> Self {
        self.rate_limit = RateLimitConfig {
            requests,
            window_secs,
        };
        self
    }

    pub fn with_retry_cap(mut self, cap_secs: u64) -> Self {
        self.retry_cap_secs = cap_secs;
        self
    }

    pub fn with_public_key_pem(mut self, pem: impl Into<String>) -> Self {
        self.signature_verification = SignatureCheck::Verify;
        self.signature_public_key_pem = Some(pem.into());
        self
    }

    /// Skip cryptographic verification (offline tools, tests).
    pub fn with_structural_signatures(mut self) -> Self {
        self.signature_verification = SignatureCheck::Structural;
        self
    }
}

/// Cache tier policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long an upstream (original) skin is served without refresh.
    #[serde(default = "default_original_ttl")]
    pub original_ttl_secs: u64,

    /// Oldest age, from fetch time, at which a stale entry may still be
    /// served when a refresh fails. `null` serves stale entries forever.
    #[serde(default = "default_stale_ceiling")]
    pub stale_ceiling_secs: Option<u64>,

    /// Maximum number of entries held in memory.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: u64,
}

fn default_original_ttl() -> u64 {
    60 * 60
}

fn default_stale_ceiling() -> Option<u64> {
    Some(7 * 24 * 60 * 60)
}

fn default_memory_capacity() -> u64 {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            original_ttl_secs: default_original_ttl(),
            stale_ceiling_secs: default_stale_ceiling(),
            memory_capacity: default_memory_capacity(),
        }
    }
}

/// Persistent tier selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageKind,

    /// Database file (sqlite) or directory (file). Defaults under the user data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Sqlite,
    File,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::Sqlite,
            path: None,
        }
    }
}

impl StorageConfig {
    /// Apply `SKINRELAY_STORAGE` (`sqlite`/`file`) and `SKINRELAY_STORAGE_PATH`.
    pub fn with_env_overrides(mut self) -> Self {
        match std::env::var("SKINRELAY_STORAGE").ok().as_deref() {
            Some("sqlite") => self.backend = StorageKind::Sqlite,
            Some("file") => self.backend = StorageKind::File,
            _ => {}
        }
        if let Ok(path) = std::env::var("SKINRELAY_STORAGE_PATH") {
            self.path = Some(PathBuf::from(path));
        }
        self
    }
}

/// The server default skin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultSkinConfig {
    /// A literal signed property.
    #[serde(default)]
    pub property: Option<PropertyConfig>,

    /// An account whose skin is used as the default.
    #[serde(default)]
    pub player: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyConfig {
    pub value: String,
    pub signature: String,
}

/// Resolved form of [`DefaultSkinConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DefaultSkin {
    #[default]
    None,
    Property(SkinProperty),
    Player(String),
}

impl From<&DefaultSkinConfig> for DefaultSkin {
    fn from(config: &DefaultSkinConfig) -> Self {
        if let Some(p) = &config.property {
            return Self::Property(SkinProperty::new(
                p.value.clone(),
                p.signature.clone(),
                SkinSource::Default,
            ));
        }
        match &config.player {
            Some(name) => Self::Player(name.clone()),
            None => Self::None,
        }
    }
}
