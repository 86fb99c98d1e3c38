//! Shared fixtures: a signing key, signed textures, and a scripted fetcher.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha1::Sha1;
use skinrelay_cache::{SkinError, SkinFetcher, SkinResult};
use skinrelay_common::{PlayerIdentity, SkinProperty, SkinSource, SkinVariant, TexturesPayload};
use uuid::Uuid;

pub fn private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
}

pub fn public_pem() -> String {
    private_key()
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .unwrap()
}

pub fn sign(value: &str) -> String {
    let signer = SigningKey::<Sha1>::new(private_key().clone());
    BASE64.encode(signer.sign(value.as_bytes()).to_bytes())
}

/// Signed textures for `identity`; `texture` becomes the texture hash.
pub fn signed_textures(identity: &PlayerIdentity, texture: &str) -> (String, String) {
    let value = TexturesPayload::for_skin(
        identity.uuid(),
        identity.name(),
        format!("http://textures.minecraft.net/texture/{}", texture),
        SkinVariant::Classic,
        1_700_000_000_000,
    )
    .encode();
    let signature = sign(&value);
    (value, signature)
}

pub fn signed_property(identity: &PlayerIdentity, texture: &str, source: SkinSource) -> SkinProperty {
    let (value, signature) = signed_textures(identity, texture);
    SkinProperty::new(value, signature, source)
}

pub fn profile_body(identity: &PlayerIdentity, value: &str, signature: &str) -> String {
    serde_json::json!({
        "id": identity.simple_uuid(),
        "name": identity.name(),
        "properties": [{ "name": "textures", "value": value, "signature": signature }]
    })
    .to_string()
}

pub fn player(name: &str) -> PlayerIdentity {
    PlayerIdentity::new(Uuid::new_v4(), name)
}

/// In-process fetcher with call counters and injectable failures.
///
/// Every successful fetch returns a new texture (`<name>-<n>`), so tests can
/// tell fetched generations apart.
#[derive(Default)]
pub struct ScriptedFetcher {
    pub fetches: AtomicUsize,
    pub lookups: AtomicUsize,
    pub generates: AtomicUsize,
    serial: AtomicI64,
    delay: Mutex<Duration>,
    failure: Mutex<Option<SkinError>>,
    names: Mutex<HashMap<String, PlayerIdentity>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn fail_with(&self, err: SkinError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn register(&self, identity: &PlayerIdentity) {
        self.names
            .lock()
            .unwrap()
            .insert(identity.name().to_lowercase(), identity.clone());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn pause(&self) -> SkinResult<()> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SkinFetcher for ScriptedFetcher {
    async fn fetch(&self, identity: &PlayerIdentity) -> SkinResult<SkinProperty> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.pause().await?;
        let n = self.serial.fetch_add(1, Ordering::SeqCst);
        Ok(signed_property(
            identity,
            &format!("{}-{}", identity.name(), n),
            SkinSource::Original,
        ))
    }

    async fn lookup(&self, name: &str) -> SkinResult<PlayerIdentity> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.pause().await?;
        self.names
            .lock()
            .unwrap()
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| SkinError::NotFound {
                subject: name.to_string(),
            })
    }

    async fn generate(
        &self,
        image_url: &str,
        variant: Option<SkinVariant>,
    ) -> SkinResult<SkinProperty> {
        self.generates.fetch_add(1, Ordering::SeqCst);
        self.pause().await?;
        let owner = PlayerIdentity::new(Uuid::nil(), "generator");
        let value = TexturesPayload::for_skin(
            owner.uuid(),
            owner.name(),
            image_url,
            variant.unwrap_or(SkinVariant::Classic),
            1_700_000_000_000,
        )
        .encode();
        let signature = sign(&value);
        Ok(SkinProperty::new(value, signature, SkinSource::CustomUrl))
    }
}
