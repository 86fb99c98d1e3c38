//! Upstream client for the session, profile and skin generation services.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use skinrelay_common::{PlayerIdentity, SkinProperty, SkinSource, SkinVariant};
use tracing::{debug, info};

use crate::config::UpstreamConfig;
use crate::error::{SkinError, SkinResult};
use crate::verify::SignatureVerifier;

mod helpers;
mod http;
mod rate_limit;

use helpers::{parse_generated, parse_lookup, parse_profile, rewrite_image_url};
use http::{HttpBackend, Request, Service};
use rate_limit::RateBudget;

const USER_AGENT_VALUE: &str = concat!("skinrelay/", env!("CARGO_PKG_VERSION"));

/// Source of signed skin properties.
///
/// Implemented by [`UpstreamClient`]; tests substitute scripted fetchers.
#[async_trait]
pub trait SkinFetcher: Send + Sync {
    /// The account's own signed textures.
    async fn fetch(&self, identity: &PlayerIdentity) -> SkinResult<SkinProperty>;

    /// Resolve an account name to its identity.
    async fn lookup(&self, name: &str) -> SkinResult<PlayerIdentity>;

    /// Have the generation service sign a skin for an image URL.
    async fn generate(&self, image_url: &str, variant: Option<SkinVariant>)
        -> SkinResult<SkinProperty>;
}

/// Client for the upstream skin services.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: HttpBackend,
    verifier: SignatureVerifier,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> SkinResult<Self> {
        let verifier = SignatureVerifier::from_config(&config)?;
        Self::with_verifier(config, verifier)
    }

    pub fn with_verifier(config: UpstreamConfig, verifier: SignatureVerifier) -> SkinResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| SkinError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        let mut config = config;
        config.session_url = config.session_url.trim_end_matches('/').to_string();
        config.api_url = config.api_url.trim_end_matches('/').to_string();
        config.mineskin_url = config.mineskin_url.trim_end_matches('/').to_string();

        let budget = RateBudget::new(&config.rate_limit);

        Ok(Self {
            http: HttpBackend {
                client,
                config,
                budget,
            },
            verifier,
        })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.http.config
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Request slots left in the current rate window.
    pub async fn remaining_budget(&self) -> u32 {
        self.http.budget.remaining().await
    }

    fn profile_url(&self, identity: &PlayerIdentity) -> String {
        format!(
            "{}/session/minecraft/profile/{}?unsigned=false",
            self.http.config.session_url,
            identity.simple_uuid()
        )
    }

    fn lookup_url(&self, name: &str) -> String {
        format!("{}/users/profiles/minecraft/{}", self.http.config.api_url, name)
    }

    fn generate_url(&self) -> String {
        format!("{}/generate/url", self.http.config.mineskin_url)
    }
}

#[async_trait]
impl SkinFetcher for UpstreamClient {
    async fn fetch(&self, identity: &PlayerIdentity) -> SkinResult<SkinProperty> {
        let url = self.profile_url(identity);
        debug!(url = %url, player = %identity, "fetching profile textures");

        let subject = identity.to_string();
        let body = self
            .http
            .request(&Request {
                method: reqwest::Method::GET,
                url: &url,
                form: None,
                service: Service::Session,
                subject: &subject,
            })
            .await?;

        let signed = parse_profile(&body, identity)?;
        self.verifier
            .verify_profile(identity.uuid(), &signed.value, &signed.signature)?;

        Ok(SkinProperty::new(
            signed.value,
            signed.signature,
            SkinSource::Original,
        ))
    }

    async fn lookup(&self, name: &str) -> SkinResult<PlayerIdentity> {
        if !skinrelay_common::is_valid_player_name(name) {
            return Err(SkinError::InvalidIntent {
                reason: format!("{:?} is not a valid player name", name),
            });
        }

        let url = self.lookup_url(name);
        debug!(url = %url, "looking up player name");

        let body = self
            .http
            .request(&Request {
                method: reqwest::Method::GET,
                url: &url,
                form: None,
                service: Service::Profiles,
                subject: name,
            })
            .await?;

        parse_lookup(&body)
    }

    async fn generate(
        &self,
        image_url: &str,
        variant: Option<SkinVariant>,
    ) -> SkinResult<SkinProperty> {
        let parsed = url::Url::parse(image_url).map_err(|e| SkinError::InvalidIntent {
            reason: format!("{:?} is not a URL: {}", image_url, e),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SkinError::InvalidIntent {
                reason: format!("unsupported URL scheme {:?}", parsed.scheme()),
            });
        }

        let image_url = rewrite_image_url(image_url);
        let mut form = vec![("url", image_url.clone())];
        if let Some(variant) = variant {
            form.push(("variant", variant.as_str().to_string()));
        }

        let url = self.generate_url();
        info!(image = %image_url, variant = ?variant, "requesting generated skin");

        let body = self
            .http
            .request(&Request {
                method: reqwest::Method::POST,
                url: &url,
                form: Some(form.as_slice()),
                service: Service::Generator,
                subject: &image_url,
            })
            .await?;

        let signed = parse_generated(&body)?;
        self.verifier.verify(&signed.value, &signed.signature)?;

        Ok(SkinProperty::new(
            signed.value,
            signed.signature,
            SkinSource::CustomUrl,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_from_trimmed_bases() {
        let client = UpstreamClient::new(
            UpstreamConfig::default().with_base_url("http://127.0.0.1:9000/"),
        )
        .unwrap();
        let notch = PlayerIdentity::parse("069a79f444e94726a5befca90e38aaf5", "Notch").unwrap();

        assert_eq!(
            client.profile_url(&notch),
            "http://127.0.0.1:9000/session/minecraft/profile/069a79f444e94726a5befca90e38aaf5?unsigned=false"
        );
        assert_eq!(
            client.lookup_url("Notch"),
            "http://127.0.0.1:9000/users/profiles/minecraft/Notch"
        );
        assert_eq!(client.generate_url(), "http://127.0.0.1:9000/generate/url");
    }

    #[tokio::test]
    async fn invalid_names_never_reach_the_network() {
        let client = UpstreamClient::new(
            UpstreamConfig::default().with_base_url("http://127.0.0.1:1"),
        )
        .unwrap();
        assert!(matches!(
            client.lookup("not a name").await,
            Err(SkinError::InvalidIntent { .. })
        ));
        assert!(matches!(
            client.generate("ftp://example.com/a.png", None).await,
            Err(SkinError::InvalidIntent { .. })
        ));
    }
}
