//! Textures payload carried inside a signed property.
//!
//! The payload is base64 JSON of the form
//!
//! ```text
//! {
//!   "timestamp": 1700000000000,
//!   "profileId": "069a79f444e94726a5befca90e38aaf5",
//!   "profileName": "Notch",
//!   "textures": {
//!     "SKIN": { "url": "http://textures.minecraft.net/texture/<hash>",
//!               "metadata": { "model": "slim" } }
//!   }
//! }
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::property::SkinVariant;

#[derive(Debug, thiserror::Error)]
pub enum TexturesError {
    #[error("textures payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("textures payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TexturesPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,

    #[serde(default)]
    pub textures: Textures,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Textures {
    #[serde(rename = "SKIN", default, skip_serializing_if = "Option::is_none")]
    pub skin: Option<TextureRef>,

    #[serde(rename = "CAPE", default, skip_serializing_if = "Option::is_none")]
    pub cape: Option<TextureRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureRef {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TextureMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureMetadata {
    #[serde(default)]
    pub model: Option<String>,
}

impl TexturesPayload {
    /// Payload describing a single skin texture.
    pub fn for_skin(
        profile_id: Uuid,
        profile_name: impl Into<String>,
        skin_url: impl Into<String>,
        variant: SkinVariant,
        timestamp: i64,
    ) -> Self {
        let metadata = match variant {
            SkinVariant::Slim => Some(TextureMetadata {
                model: Some("slim".to_string()),
            }),
            SkinVariant::Classic => None,
        };

        Self {
            timestamp: Some(timestamp),
            profile_id: Some(profile_id.simple().to_string()),
            profile_name: Some(profile_name.into()),
            textures: Textures {
                skin: Some(TextureRef {
                    url: skin_url.into(),
                    metadata,
                }),
                cape: None,
            },
        }
    }

    pub fn decode(value: &str) -> Result<Self, TexturesError> {
        let bytes = BASE64.decode(value.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn encode(&self) -> String {
        // Serializing plain strings and integers cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        BASE64.encode(json)
    }

    pub fn skin_url(&self) -> Option<&str> {
        self.textures.skin.as_ref().map(|s| s.url.as_str())
    }

    /// Texture hash: the last path segment of the skin URL.
    pub fn texture_hash(&self) -> Option<&str> {
        self.skin_url()
            .and_then(|url| url.rsplit('/').next())
            .filter(|hash| !hash.is_empty())
    }

    pub fn variant(&self) -> SkinVariant {
        let slim = self
            .textures
            .skin
            .as_ref()
            .and_then(|s| s.metadata.as_ref())
            .and_then(|m| m.model.as_deref())
            .is_some_and(|model| model.eq_ignore_ascii_case("slim"));
        if slim {
            SkinVariant::Slim
        } else {
            SkinVariant::Classic
        }
    }

    pub fn profile_uuid(&self) -> Option<Uuid> {
        self.profile_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTCH: &str = "069a79f444e94726a5befca90e38aaf5";

    #[test]
    fn decodes_session_payload() {
        let json = format!(
            r#"{{"timestamp":1700000000000,"profileId":"{NOTCH}","profileName":"Notch","textures":{{"SKIN":{{"url":"http://textures.minecraft.net/texture/292009a4925b58f02c77dadc3ecef07ea4c7472f64e0fdc32ce5522489362680","metadata":{{"model":"slim"}}}}}}}}"#
        );
        let payload = TexturesPayload::decode(&BASE64.encode(json)).unwrap();

        assert_eq!(payload.profile_name.as_deref(), Some("Notch"));
        assert_eq!(
            payload.profile_uuid(),
            Some(Uuid::parse_str(NOTCH).unwrap())
        );
        assert_eq!(
            payload.texture_hash(),
            Some("292009a4925b58f02c77dadc3ecef07ea4c7472f64e0fdc32ce5522489362680")
        );
        assert_eq!(payload.variant(), SkinVariant::Slim);
    }

    #[test]
    fn missing_model_means_classic() {
        let payload = TexturesPayload::for_skin(
            Uuid::parse_str(NOTCH).unwrap(),
            "Notch",
            "http://textures.minecraft.net/texture/abc",
            SkinVariant::Classic,
            1,
        );
        let decoded = TexturesPayload::decode(&payload.encode()).unwrap();
        assert_eq!(decoded.variant(), SkinVariant::Classic);
        assert_eq!(decoded.texture_hash(), Some("abc"));
    }

    #[test]
    fn rejects_non_base64() {
        assert!(matches!(
            TexturesPayload::decode("%%%"),
            Err(TexturesError::Base64(_))
        ));
    }

    #[test]
    fn rejects_non_json() {
        let value = BASE64.encode("not json");
        assert!(matches!(
            TexturesPayload::decode(&value),
            Err(TexturesError::Json(_))
        ));
    }
}
