//! Errors surfaced by the resolver.

use skinrelay_cache::SkinError;
use skinrelay_platform::PlatformError;

/// Resolution errors: cache and upstream failures, platform failures, or
/// configuration problems found while composing the service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Skin(#[from] SkinError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ResolveError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Skin(e) => e.kind(),
            Self::Platform(e) => e.kind(),
            Self::Config { .. } => "config",
        }
    }

    /// Coarse message suitable for showing to a player.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Skin(e) => e.user_message(),
            Self::Platform(e) => e.user_message(),
            Self::Config { .. } => "Skins are not configured correctly.",
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;
