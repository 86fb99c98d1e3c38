//! What a caller wants a player to look like.

use serde::{Deserialize, Serialize};

use crate::property::{SkinSource, SkinVariant};

/// A skin request.
///
/// Intents are persisted next to the resolved property so a restart can tell
/// which request produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkinIntent {
    /// Whatever is on record for the player, or `Original` when nothing is.
    Stored,
    /// The account's own skin.
    Original,
    /// The server default.
    Default,
    /// A skin generated from an image URL.
    Url {
        url: String,
        #[serde(default)]
        variant: Option<SkinVariant>,
    },
    /// A signed property provided by the caller.
    Upload { value: String, signature: String },
    /// Another account's skin, looked up by name.
    Player { name: String },
}

impl SkinIntent {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Original => "original",
            Self::Default => "default",
            Self::Url { .. } => "url",
            Self::Upload { .. } => "upload",
            Self::Player { .. } => "player",
        }
    }

    /// `Stored` defers to the record; every other intent names a concrete skin.
    pub fn is_explicit(&self) -> bool {
        !matches!(self, Self::Stored)
    }

    /// Source tag given to properties produced for this intent.
    pub fn source(&self) -> SkinSource {
        match self {
            Self::Stored | Self::Original | Self::Player { .. } => SkinSource::Original,
            Self::Default => SkinSource::Default,
            Self::Url { .. } => SkinSource::CustomUrl,
            Self::Upload { .. } => SkinSource::CustomUpload,
        }
    }

    /// Whether a cached record produced for `recorded` satisfies this intent.
    pub fn is_answered_by(&self, recorded: &SkinIntent) -> bool {
        matches!(self, Self::Stored) || self == recorded
    }
}

impl std::fmt::Display for SkinIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url { url, .. } => write!(f, "url:{}", url),
            Self::Player { name } => write!(f, "player:{}", name),
            other => f.write_str(other.label()),
        }
    }
}
