//! Signed skin property.

use serde::{Deserialize, Serialize};

use crate::digest::sha256_hex_bytes;
use crate::textures::{TexturesError, TexturesPayload};

/// Name of the profile property carrying the skin.
pub const TEXTURES_PROPERTY_NAME: &str = "textures";

/// Where a skin property came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinSource {
    /// The account's own skin, as served by the session service.
    Original,
    /// Generated from an image URL.
    CustomUrl,
    /// A signed property supplied directly by the caller.
    CustomUpload,
    /// The server's configured default.
    Default,
}

impl SkinSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::CustomUrl => "custom_url",
            Self::CustomUpload => "custom_upload",
            Self::Default => "default",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "original" => Some(Self::Original),
            "custom_url" => Some(Self::CustomUrl),
            "custom_upload" => Some(Self::CustomUpload),
            "default" => Some(Self::Default),
            _ => None,
        }
    }
}

impl std::fmt::Display for SkinSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player model the texture is drawn for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinVariant {
    Classic,
    Slim,
}

impl SkinVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Slim => "slim",
        }
    }
}

/// A signed textures property.
///
/// Equality only looks at payload and signature: the same signed payload is
/// the same skin no matter how it was obtained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinProperty {
    value: String,
    signature: String,
    hash: String,
    source: SkinSource,
}

impl SkinProperty {
    pub fn new(value: impl Into<String>, signature: impl Into<String>, source: SkinSource) -> Self {
        let value = value.into();
        let hash = sha256_hex_bytes(value.as_bytes());
        Self {
            value,
            signature: signature.into(),
            hash,
            source,
        }
    }

    /// Base64 textures payload.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Base64 signature over the payload.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Content hash of the payload (`sha256:<hex>`).
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn source(&self) -> SkinSource {
        self.source
    }

    pub fn with_source(mut self, source: SkinSource) -> Self {
        self.source = source;
        self
    }

    /// Decode the textures payload.
    pub fn textures(&self) -> Result<TexturesPayload, TexturesError> {
        TexturesPayload::decode(&self.value)
    }
}

impl PartialEq for SkinProperty {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.signature == other.signature
    }
}

impl Eq for SkinProperty {}
