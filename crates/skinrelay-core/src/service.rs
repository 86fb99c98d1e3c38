//! Composition root.

use std::sync::Arc;

use skinrelay_cache::{
    open_backend, CacheStore, Clock, CounterMetrics, DefaultSkin, MetricsSnapshot, SignatureVerifier,
    SkinFetcher, StorageBackend, SystemClock, UpstreamClient,
};
use skinrelay_platform::{
    ActivePlatform, MappingRegistry, PlayerDirectory, RegionRuntime, RegionScheduler, RuntimeProbe,
    StaticProbe,
};
use tracing::info;

use crate::config::SkinConfig;
use crate::error::ResolveResult;
use crate::resolver::SkinResolver;

/// A wired-up resolver plus the pieces it was built from.
#[derive(Debug)]
pub struct SkinService {
    config: SkinConfig,
    platform: ActivePlatform,
    resolver: SkinResolver,
    metrics: Arc<CounterMetrics>,
    runtime: Option<RegionRuntime>,
}

impl SkinService {
    pub fn builder(config: SkinConfig) -> SkinServiceBuilder {
        SkinServiceBuilder {
            config,
            fetcher: None,
            storage: None,
            clock: Arc::new(SystemClock),
            platform: None,
            probe: None,
            host: None,
        }
    }

    pub fn config(&self) -> &SkinConfig {
        &self.config
    }

    pub fn platform(&self) -> &ActivePlatform {
        &self.platform
    }

    pub fn resolver(&self) -> &SkinResolver {
        &self.resolver
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        self.resolver.store()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// The in-process region runtime, when no host was supplied.
    pub fn runtime(&self) -> Option<&RegionRuntime> {
        self.runtime.as_ref()
    }

    /// Stop the in-process region runtime, if any.
    pub fn shutdown(&self) {
        if let Some(runtime) = &self.runtime {
            runtime.shutdown();
        }
    }
}

/// Builder for [`SkinService`]. Anything not supplied is built from the config.
pub struct SkinServiceBuilder {
    config: SkinConfig,
    fetcher: Option<Arc<dyn SkinFetcher>>,
    storage: Option<Arc<dyn StorageBackend>>,
    clock: Arc<dyn Clock>,
    platform: Option<ActivePlatform>,
    probe: Option<Box<dyn RuntimeProbe + Send>>,
    host: Option<(Arc<dyn PlayerDirectory>, Arc<dyn RegionScheduler>)>,
}

impl SkinServiceBuilder {
    /// Replace the HTTP client.
    pub fn fetcher(mut self, fetcher: Arc<dyn SkinFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use an already chosen platform instead of probing.
    pub fn platform(mut self, platform: ActivePlatform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Probe this host instead of the configured version and markers.
    pub fn probe(mut self, probe: impl RuntimeProbe + Send + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Apply through the host's players and region threads.
    pub fn host(
        mut self,
        directory: Arc<dyn PlayerDirectory>,
        scheduler: Arc<dyn RegionScheduler>,
    ) -> Self {
        self.host = Some((directory, scheduler));
        self
    }

    pub fn build(self) -> ResolveResult<SkinService> {
        let config = self.config;
        config.validate()?;

        let platform = match self.platform {
            Some(platform) => platform,
            None => {
                let probe: Box<dyn RuntimeProbe + Send> = match self.probe {
                    Some(probe) => probe,
                    None => Box::new(configured_probe(&config)),
                };
                ActivePlatform::initialize(
                    probe.as_ref(),
                    &config.platform.allowlist,
                    &MappingRegistry::builtin(),
                )?
            }
        };

        let (fetcher, verifier): (Arc<dyn SkinFetcher>, SignatureVerifier) = match self.fetcher {
            Some(fetcher) => (
                fetcher,
                SignatureVerifier::from_config(&config.upstream)?,
            ),
            None => {
                let client = UpstreamClient::new(config.upstream.clone())?;
                let verifier = client.verifier().clone();
                (Arc::new(client), verifier)
            }
        };

        let storage = match self.storage {
            Some(storage) => storage,
            None => open_backend(&config.storage)?,
        };

        let metrics = Arc::new(CounterMetrics::new());
        let store = CacheStore::builder(fetcher, storage)
            .config(&config.cache)
            .verifier(verifier)
            .default_skin(DefaultSkin::from(&config.defaults))
            .clock(self.clock)
            .metrics(metrics.clone())
            .build();

        let (directory, scheduler, runtime) = match self.host {
            Some((directory, scheduler)) => (directory, scheduler, None),
            None => {
                let runtime = RegionRuntime::new();
                let directory: Arc<dyn PlayerDirectory> = Arc::new(runtime.clone());
                let scheduler: Arc<dyn RegionScheduler> = Arc::new(runtime.clone());
                (directory, scheduler, Some(runtime))
            }
        };

        let resolver = SkinResolver::new(
            Arc::new(store),
            Arc::clone(platform.adapter()),
            directory,
            scheduler,
        );

        info!(
            platform = %platform.context(),
            storage = ?config.storage.backend,
            "skin service ready"
        );
        Ok(SkinService {
            config,
            platform,
            resolver,
            metrics,
            runtime,
        })
    }
}

fn configured_probe(config: &SkinConfig) -> StaticProbe {
    config
        .platform
        .markers
        .iter()
        .fold(StaticProbe::new(config.platform.server_version.clone()), |probe, marker| {
            probe.with_marker(marker.clone())
        })
}
