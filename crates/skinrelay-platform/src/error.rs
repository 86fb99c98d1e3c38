//! Error types for platform detection and skin application.

use uuid::Uuid;

/// Platform errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// No adapter or accessor table exists for this server. Fatal at startup.
    #[error("unsupported platform: {reason}")]
    UnsupportedPlatform { reason: String },

    /// The live player does not expose the member the accessor table expects.
    #[error("player {uuid} has no member `{member}`")]
    MissingMember { uuid: Uuid, member: String },

    /// The member exists but holds a different representation.
    #[error("member `{member}` is not a {expected}")]
    AccessorMismatch {
        member: String,
        expected: &'static str,
    },

    /// The region thread is gone.
    #[error("region scheduler closed: {region}")]
    SchedulerClosed { region: String },
}

impl PlatformError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedPlatform { .. } => "unsupported_platform",
            Self::MissingMember { .. } => "missing_member",
            Self::AccessorMismatch { .. } => "accessor_mismatch",
            Self::SchedulerClosed { .. } => "scheduler_closed",
        }
    }

    /// Coarse message suitable for showing to a player.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnsupportedPlatform { .. } => "Skins are not supported on this server version.",
            Self::MissingMember { .. } | Self::AccessorMismatch { .. } | Self::SchedulerClosed { .. } => {
                "Could not apply skin."
            }
        }
    }
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;
