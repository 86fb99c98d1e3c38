//! Shared fixtures: a counting fetcher and service wiring.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use skinrelay_cache::{SkinError, SkinFetcher, SkinResult, SqliteStorage, StorageBackend};
use skinrelay_common::{PlayerIdentity, SkinProperty, SkinSource, SkinVariant, TexturesPayload};
use skinrelay_core::{SkinConfig, SkinService};
use skinrelay_platform::{
    ActivePlatform, GameVersion, MappingRegistry, PlatformContext, PlatformVariant, Position,
    RegionId, SimulatedPlayer,
};
use uuid::Uuid;

/// base64 of "signature"; scripted fetchers bypass verification.
pub const SIGNATURE: &str = "c2lnbmF0dXJl";

pub fn property_for(owner: Uuid, name: &str, texture: &str, source: SkinSource) -> SkinProperty {
    let value = TexturesPayload::for_skin(
        owner,
        name,
        format!("http://textures.minecraft.net/texture/{}", texture),
        SkinVariant::Classic,
        1_700_000_000_000,
    )
    .encode();
    SkinProperty::new(value, SIGNATURE, source)
}

/// Fetcher that counts calls and hands out a new texture per fetch.
#[derive(Default)]
pub struct CountingFetcher {
    pub fetches: AtomicUsize,
    pub generates: AtomicUsize,
    delay: Mutex<Duration>,
    down: Mutex<bool>,
    skinless: Mutex<HashSet<Uuid>>,
    names: Mutex<HashMap<String, PlayerIdentity>>,
}

impl CountingFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn set_down(&self, down: bool) {
        *self.down.lock().unwrap() = down;
    }

    /// Accounts without a skin answer NotFound.
    pub fn without_skin(&self, uuid: Uuid) {
        self.skinless.lock().unwrap().insert(uuid);
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

    pub fn generate_count(&self) -> usize {
        self.generates.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> SkinResult<()> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *self.down.lock().unwrap() {
            return Err(SkinError::UpstreamUnavailable {
                message: "HTTP 503: down".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SkinFetcher for CountingFetcher {
    async fn fetch(&self, identity: &PlayerIdentity) -> SkinResult<SkinProperty> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        if self.skinless.lock().unwrap().contains(&identity.uuid()) {
            return Err(SkinError::NotFound {
                subject: identity.to_string(),
            });
        }
        Ok(property_for(
            identity.uuid(),
            identity.name(),
            &format!("{}-{}", identity.name(), n),
            SkinSource::Original,
        ))
    }

    async fn lookup(&self, name: &str) -> SkinResult<PlayerIdentity> {
        self.gate().await?;
        self.names
            .lock()
            .unwrap()
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| SkinError::NotFound {
                subject: name.to_string(),
            })
    }

    async fn generate(&self, image_url: &str, _variant: Option<SkinVariant>) -> SkinResult<SkinProperty> {
        let n = self.generates.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        Ok(property_for(
            Uuid::nil(),
            "generated",
            &format!("{}#{}", image_url, n),
            SkinSource::CustomUrl,
        ))
    }
}

pub fn platform(variant: PlatformVariant) -> ActivePlatform {
    let context = PlatformContext::new(variant, GameVersion::new(1, 20, 4));
    ActivePlatform::for_context(context, &MappingRegistry::builtin()).unwrap()
}

pub fn service_with(
    config: SkinConfig,
    fetcher: Arc<CountingFetcher>,
    storage: Arc<dyn StorageBackend>,
    variant: PlatformVariant,
) -> SkinService {
    SkinService::builder(config)
        .fetcher(fetcher)
        .storage(storage)
        .platform(platform(variant))
        .build()
        .unwrap()
}

pub fn service(fetcher: Arc<CountingFetcher>, variant: PlatformVariant) -> SkinService {
    service_with(
        SkinConfig::default(),
        fetcher,
        Arc::new(SqliteStorage::memory().unwrap()),
        variant,
    )
}

pub fn player(name: &str) -> PlayerIdentity {
    PlayerIdentity::new(Uuid::new_v4(), name)
}

/// Put a simulated player for `identity` into `region` of the service's runtime.
pub fn connect(service: &SkinService, identity: &PlayerIdentity, region: RegionId) -> skinrelay_platform::PacketLog {
    let accessors = service.platform().adapter().accessors();
    let sim = SimulatedPlayer::new(identity.uuid(), identity.name(), accessors);
    let log = sim.log();
    service
        .runtime()
        .expect("in-process runtime")
        .join(Box::new(sim), region, Position::new(0.0, 64.0, 0.0))
        .unwrap();
    log
}
