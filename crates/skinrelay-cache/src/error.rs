//! Error types for skin lookup and caching.

use std::time::Duration;

/// Skin lookup and cache errors.
///
/// Errors are `Clone` because a single in-flight upstream request hands the
/// same outcome to every caller waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SkinError {
    /// The upstream service has no skin for this subject (e.g. offline-mode account).
    #[error("no skin found for {subject}")]
    NotFound { subject: String },

    /// Rate limit budget exhausted.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// The returned property failed signature or payload validation.
    #[error("invalid signature: {reason}")]
    InvalidSignature { reason: String },

    /// Transient network failure or 5xx from upstream.
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable { message: String },

    /// Persistent tier failure.
    #[error("storage error: {message}")]
    Storage { message: String },

    /// The skin generator refused the request (bad image, no capacity).
    #[error("skin rejected: {reason}")]
    Rejected { reason: String },

    /// Upstream answered with something we could not parse.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// The caller asked for something that cannot be resolved.
    #[error("invalid intent: {reason}")]
    InvalidIntent { reason: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SkinError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidSignature { .. } => "invalid_signature",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::Storage { .. } => "storage",
            Self::Rejected { .. } => "rejected",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::InvalidIntent { .. } => "invalid_intent",
            Self::Config { .. } => "config",
        }
    }

    /// Whether the request may be retried after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::UpstreamUnavailable { .. }
        )
    }

    /// Whether a stale cached value may stand in for a failed refresh.
    ///
    /// Definitive answers (`NotFound`) and security rejections
    /// (`InvalidSignature`) are never papered over.
    pub fn allows_stale(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::UpstreamUnavailable { .. }
                | Self::InvalidResponse { .. }
                | Self::Storage { .. }
        )
    }

    /// Coarse message suitable for showing to a player.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "No skin exists for that player.",
            Self::RateLimited { .. } | Self::UpstreamUnavailable { .. } => {
                "Could not resolve skin, try again later."
            }
            Self::Rejected { .. } => "That image cannot be used as a skin.",
            Self::InvalidIntent { .. } => "That skin request is not valid.",
            Self::InvalidSignature { .. }
            | Self::Storage { .. }
            | Self::InvalidResponse { .. }
            | Self::Config { .. } => "Could not resolve skin.",
        }
    }
}

impl From<reqwest::Error> for SkinError {
    fn from(err: reqwest::Error) -> Self {
        Self::UpstreamUnavailable {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for SkinError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

/// Result type for skin operations.
pub type SkinResult<T> = Result<T, SkinError>;
