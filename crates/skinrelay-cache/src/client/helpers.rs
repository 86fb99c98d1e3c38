//! Pure helpers: response bodies, URL rewrites, delay parsing (no HTTP, no retry).

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::Deserialize;
use skinrelay_common::{PlayerIdentity, TEXTURES_PROPERTY_NAME};

use crate::error::{SkinError, SkinResult};

const NAMEMC_SKIN_PREFIX: &str = "https://namemc.com/skin/";
const NAMEMC_IMAGE_URL: &str = "https://s.namemc.com/i/";

/// Generator error codes that succeed when simply asked again.
const TRANSIENT_GENERATOR_CODES: &[&str] = &["failed_to_create_id", "skin_change_failed"];

/// Session service profile response.
#[derive(Debug, Deserialize)]
pub(crate) struct ProfileResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<ProfileProperty>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileProperty {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub signature: Option<String>,
}

/// Signed textures pulled from a profile response.
#[derive(Debug)]
pub(crate) struct SignedTextures {
    pub value: String,
    pub signature: String,
}

/// Name lookup response.
#[derive(Debug, Deserialize)]
struct LookupResponse {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedResponse {
    data: GeneratedData,
}

#[derive(Debug, Deserialize)]
struct GeneratedData {
    texture: GeneratedTexture,
}

#[derive(Debug, Deserialize)]
struct GeneratedTexture {
    value: String,
    signature: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratorErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    /// Seconds to wait.
    #[serde(default)]
    delay: Option<u64>,
    /// Epoch seconds of the next allowed request.
    #[serde(default)]
    next_request: Option<u64>,
}

/// Extract the signed textures property of `identity` from a profile body.
pub(crate) fn parse_profile(body: &str, identity: &PlayerIdentity) -> SkinResult<SignedTextures> {
    let profile: ProfileResponse =
        serde_json::from_str(body).map_err(|e| SkinError::InvalidResponse {
            message: format!("failed to parse profile response: {}", e),
        })?;

    let id = uuid::Uuid::parse_str(&profile.id).map_err(|e| SkinError::InvalidResponse {
        message: format!("profile id {:?} is not a uuid: {}", profile.id, e),
    })?;
    if id != identity.uuid() {
        return Err(SkinError::InvalidResponse {
            message: format!("asked for {} but received profile {}", identity.uuid(), id),
        });
    }

    let property = profile
        .properties
        .into_iter()
        .find(|p| p.name == TEXTURES_PROPERTY_NAME)
        .ok_or_else(|| SkinError::NotFound {
            subject: format!("{} ({})", profile.name, id),
        })?;

    match property.signature {
        Some(signature) if !signature.is_empty() => Ok(SignedTextures {
            value: property.value,
            signature,
        }),
        _ => Err(SkinError::InvalidSignature {
            reason: "profile textures are unsigned".to_string(),
        }),
    }
}

pub(crate) fn parse_lookup(body: &str) -> SkinResult<PlayerIdentity> {
    let lookup: LookupResponse =
        serde_json::from_str(body).map_err(|e| SkinError::InvalidResponse {
            message: format!("failed to parse name lookup response: {}", e),
        })?;

    PlayerIdentity::parse(&lookup.id, lookup.name).map_err(|e| SkinError::InvalidResponse {
        message: format!("lookup returned an invalid uuid: {}", e),
    })
}

pub(crate) fn parse_generated(body: &str) -> SkinResult<SignedTextures> {
    let generated: GeneratedResponse =
        serde_json::from_str(body).map_err(|e| SkinError::InvalidResponse {
            message: format!("failed to parse generator response: {}", e),
        })?;

    Ok(SignedTextures {
        value: generated.data.texture.value,
        signature: generated.data.texture.signature,
    })
}

/// NameMC skin pages are not images; point at the raw texture instead.
pub(crate) fn rewrite_image_url(url: &str) -> String {
    match url.strip_prefix(NAMEMC_SKIN_PREFIX) {
        Some(id) if !id.is_empty() => format!("{}{}.png", NAMEMC_IMAGE_URL, id),
        _ => url.to_string(),
    }
}

/// `Retry-After` in delta-seconds form.
pub(crate) fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Delay carried in a generator 429 body: `delay` seconds or a `nextRequest` epoch.
pub(crate) fn generator_delay(body: &str, now_epoch_secs: u64) -> Option<Duration> {
    let parsed: GeneratorErrorBody = serde_json::from_str(body).ok()?;
    if let Some(delay) = parsed.delay {
        return Some(Duration::from_secs(delay));
    }
    parsed
        .next_request
        .map(|next| Duration::from_secs(next.saturating_sub(now_epoch_secs)))
}

/// Map a generator 400/403/5xx body to an error.
pub(crate) fn classify_generator_error(status: u16, body: &str) -> SkinError {
    let parsed: GeneratorErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.error_code.as_deref().unwrap_or("");

    if status == 403 {
        if code == "invalid_api_key" {
            return SkinError::Config {
                message: format!(
                    "generator rejected the API key: {}",
                    parsed.error.as_deref().unwrap_or("no detail")
                ),
            };
        }
        return SkinError::Rejected {
            reason: format!("generator refused the request ({})", nonempty(code)),
        };
    }

    if TRANSIENT_GENERATOR_CODES.contains(&code) {
        return SkinError::UpstreamUnavailable {
            message: format!("generator asked to retry ({})", code),
        };
    }

    match code {
        "no_account_available" => SkinError::Rejected {
            reason: "generator has no account available".to_string(),
        },
        "" if status >= 500 => SkinError::UpstreamUnavailable {
            message: format!("HTTP {}: {}", status, truncate(body)),
        },
        _ => SkinError::Rejected {
            reason: format!("image cannot be used as a skin ({})", nonempty(code)),
        },
    }
}

pub(crate) fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}

fn nonempty(code: &str) -> &str {
    if code.is_empty() {
        "unknown"
    } else {
        code
    }
}
