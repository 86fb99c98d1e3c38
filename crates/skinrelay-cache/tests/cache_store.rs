//! Integration tests for CacheStore: tier order, single-flight, TTL,
//! stale serving, write ordering and storage degradation.

mod common;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration};
use common::{player, public_pem, signed_property, signed_textures, ScriptedFetcher};
use skinrelay_cache::{
    CacheConfig, CacheStore, CounterMetrics, DefaultSkin, ManualClock, ResolutionOrigin,
    SignatureVerifier, SkinError, SkinResult, SqliteStorage, StorageBackend, StorageRecord,
};
use skinrelay_common::{SkinIntent, SkinSource};
use uuid::Uuid;

struct Harness {
    store: Arc<CacheStore>,
    fetcher: Arc<ScriptedFetcher>,
    storage: Arc<SqliteStorage>,
    clock: ManualClock,
    metrics: Arc<CounterMetrics>,
}

fn harness_with(fetcher: ScriptedFetcher, default_skin: DefaultSkin) -> Harness {
    let fetcher = Arc::new(fetcher);
    let storage = Arc::new(SqliteStorage::memory().unwrap());
    let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
    let metrics = Arc::new(CounterMetrics::new());

    let store = CacheStore::builder(fetcher.clone(), storage.clone())
        .config(&CacheConfig::default())
        .clock(Arc::new(clock.clone()))
        .metrics(metrics.clone())
        .verifier(SignatureVerifier::new(Some(&public_pem())).unwrap())
        .default_skin(default_skin)
        .build();

    Harness {
        store: Arc::new(store),
        fetcher,
        storage,
        clock,
        metrics,
    }
}

fn harness() -> Harness {
    harness_with(ScriptedFetcher::new(), DefaultSkin::None)
}

fn url_intent(url: &str) -> SkinIntent {
    SkinIntent::Url {
        url: url.to_string(),
        variant: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cold_gets_share_one_fetch() {
    let h = harness_with(
        ScriptedFetcher::new().with_delay(StdDuration::from_millis(100)),
        DefaultSkin::None,
    );
    let notch = player("Notch");

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let store = h.store.clone();
            let notch = notch.clone();
            tokio::spawn(async move { store.get(&notch, &SkinIntent::Original).await })
        })
        .collect();

    let results = futures::future::join_all(tasks).await;
    let first = results[0].as_ref().unwrap().as_ref().unwrap().property().clone();
    for result in results {
        let resolution = result.unwrap().unwrap();
        assert_eq!(resolution.property(), &first);
    }

    assert_eq!(h.fetcher.fetch_count(), 1);
    assert_eq!(h.metrics.snapshot().upstream_calls, 1);
}

#[tokio::test]
async fn test_tiers_are_consulted_in_order() {
    let h = harness();
    let notch = player("Notch");

    let cold = h.store.get(&notch, &SkinIntent::Original).await.unwrap();
    assert_eq!(cold.origin, ResolutionOrigin::Upstream);

    let warm = h.store.get(&notch, &SkinIntent::Original).await.unwrap();
    assert_eq!(warm.origin, ResolutionOrigin::Memory);
    assert_eq!(warm.property(), cold.property());

    // a fresh store over the same storage starts with an empty memory tier
    let restarted = CacheStore::builder(h.fetcher.clone(), h.storage.clone())
        .clock(Arc::new(h.clock.clone()))
        .build();
    let from_disk = restarted.get(&notch, &SkinIntent::Original).await.unwrap();
    assert_eq!(from_disk.origin, ResolutionOrigin::Storage);
    assert_eq!(from_disk.property(), cold.property());
    assert!(restarted.peek(notch.uuid()).is_some());

    assert_eq!(h.fetcher.fetch_count(), 1);
}

#[tokio::test]
async fn test_ttl_boundary_triggers_refresh() {
    let h = harness();
    let notch = player("Notch");

    let first = h.store.get(&notch, &SkinIntent::Original).await.unwrap();

    h.clock.advance(Duration::seconds(3599));
    let still_fresh = h.store.get(&notch, &SkinIntent::Original).await.unwrap();
    assert_eq!(still_fresh.origin, ResolutionOrigin::Memory);
    assert_eq!(h.fetcher.fetch_count(), 1);

    h.clock.advance(Duration::seconds(1));
    let refreshed = h.store.get(&notch, &SkinIntent::Original).await.unwrap();
    assert_eq!(refreshed.origin, ResolutionOrigin::Upstream);
    assert_ne!(refreshed.property(), first.property());
    assert_eq!(h.fetcher.fetch_count(), 2);

    let record = h.storage.load(notch.uuid()).unwrap().unwrap();
    assert_eq!(record.value, refreshed.property().value());
}

#[tokio::test]
async fn test_stale_entry_served_when_upstream_is_down() {
    let h = harness();
    let notch = player("Notch");

    let first = h.store.get(&notch, &SkinIntent::Original).await.unwrap();
    h.clock.advance(Duration::hours(2));
    h.fetcher.fail_with(SkinError::UpstreamUnavailable {
        message: "HTTP 503".into(),
    });

    let stale = h.store.get(&notch, &SkinIntent::Stored).await.unwrap();
    assert_eq!(stale.origin, ResolutionOrigin::Stale);
    assert!(stale.is_stale());
    assert_eq!(stale.property(), first.property());

    let snapshot = h.metrics.snapshot();
    assert_eq!(snapshot.stale_served, 1);
    assert_eq!(snapshot.errors.get("upstream_unavailable"), Some(&1));

    // once upstream recovers the entry is refreshed
    h.fetcher.recover();
    let fresh = h.store.get(&notch, &SkinIntent::Stored).await.unwrap();
    assert_eq!(fresh.origin, ResolutionOrigin::Upstream);
}

#[tokio::test]
async fn test_stale_is_not_served_past_ceiling_or_for_definitive_errors() {
    let h = harness();
    let notch = player("Notch");
    h.store.get(&notch, &SkinIntent::Original).await.unwrap();

    h.clock.advance(Duration::hours(2));
    h.fetcher.fail_with(SkinError::NotFound {
        subject: "Notch".into(),
    });
    assert!(matches!(
        h.store.get(&notch, &SkinIntent::Original).await,
        Err(SkinError::NotFound { .. })
    ));

    h.clock.advance(Duration::days(8));
    h.fetcher.fail_with(SkinError::RateLimited { retry_after: None });
    assert!(matches!(
        h.store.get(&notch, &SkinIntent::Original).await,
        Err(SkinError::RateLimited { .. })
    ));
}

#[tokio::test]
async fn test_rejected_signature_is_never_cached() {
    let h = harness();
    let notch = player("Notch");
    h.fetcher.fail_with(SkinError::InvalidSignature {
        reason: "forged".into(),
    });

    assert!(matches!(
        h.store.get(&notch, &SkinIntent::Original).await,
        Err(SkinError::InvalidSignature { .. })
    ));
    assert!(h.store.peek(notch.uuid()).is_none());
    assert!(h.storage.load(notch.uuid()).unwrap().is_none());
}

#[tokio::test]
async fn test_put_then_get_returns_written_value() {
    let h = harness();
    let notch = player("Notch");
    let intent = url_intent("https://example.com/cape.png");
    let property = signed_property(&notch, "custom", SkinSource::CustomUrl);

    let outcome = h
        .store
        .put(&notch, property.clone(), intent.clone())
        .await
        .unwrap();
    assert!(outcome.persisted);
    assert_eq!(outcome.entry.ttl, None);

    let stored = h.store.get(&notch, &SkinIntent::Stored).await.unwrap();
    assert_eq!(stored.property(), &property);
    assert_eq!(stored.entry.intent, intent);

    // custom skins never expire
    h.clock.advance(Duration::days(365));
    let later = h.store.get(&notch, &SkinIntent::Stored).await.unwrap();
    assert_eq!(later.origin, ResolutionOrigin::Memory);
    assert_eq!(h.fetcher.fetch_count(), 0);
}

#[tokio::test]
async fn test_get_original_does_not_clobber_custom_skin() {
    let h = harness();
    let notch = player("Notch");
    let custom = signed_property(&notch, "custom", SkinSource::CustomUrl);
    h.store
        .put(&notch, custom.clone(), url_intent("https://example.com/a.png"))
        .await
        .unwrap();

    let original = h.store.get(&notch, &SkinIntent::Original).await.unwrap();
    assert_ne!(original.property(), &custom);
    assert_eq!(h.store.peek(notch.uuid()).unwrap().property, custom);

    // the original is remembered beside the custom choice
    let again = h.store.get(&notch, &SkinIntent::Original).await.unwrap();
    assert_eq!(again.origin, ResolutionOrigin::Memory);
    assert_eq!(again.property(), original.property());
    assert_eq!(h.fetcher.fetch_count(), 1);

    let stored = h.store.get(&notch, &SkinIntent::Stored).await.unwrap();
    assert_eq!(stored.origin, ResolutionOrigin::Memory);
    assert_eq!(stored.property(), &custom);
    assert_eq!(
        h.storage.load(notch.uuid()).unwrap().unwrap().intent,
        url_intent("https://example.com/a.png")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_put_during_refresh_wins() {
    let h = harness_with(
        ScriptedFetcher::new().with_delay(StdDuration::from_millis(200)),
        DefaultSkin::None,
    );
    let notch = player("Notch");

    let store = h.store.clone();
    let who = notch.clone();
    let refresh = tokio::spawn(async move { store.get(&who, &SkinIntent::Stored).await });

    tokio::time::sleep(StdDuration::from_millis(50)).await;
    let custom = signed_property(&notch, "custom", SkinSource::CustomUrl);
    let intent = url_intent("https://example.com/a.png");
    h.store
        .put(&notch, custom.clone(), intent.clone())
        .await
        .unwrap();

    // the refresh still answers its own caller
    let fetched = refresh.await.unwrap().unwrap();
    assert_eq!(fetched.entry.intent, SkinIntent::Original);

    // but never overwrites the newer explicit choice
    let after = h.store.get(&notch, &SkinIntent::Stored).await.unwrap();
    assert_eq!(after.property(), &custom);
    assert_eq!(h.storage.load(notch.uuid()).unwrap().unwrap().intent, intent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_puts_for_different_players_do_not_interfere() {
    let h = harness();
    let players: Vec<_> = (0..16).map(|i| player(&format!("p{}", i))).collect();

    let tasks: Vec<_> = players
        .iter()
        .map(|p| {
            let store = h.store.clone();
            let p = p.clone();
            tokio::spawn(async move {
                let property = signed_property(&p, p.name(), SkinSource::CustomUrl);
                store
                    .put(&p, property, url_intent(&format!("https://example.com/{}.png", p.name())))
                    .await
            })
        })
        .collect();
    for task in futures::future::join_all(tasks).await {
        assert!(task.unwrap().unwrap().persisted);
    }

    for p in &players {
        let resolved = h.store.get(p, &SkinIntent::Stored).await.unwrap();
        let textures = resolved.property().textures().unwrap();
        assert_eq!(textures.texture_hash(), Some(p.name()));
    }
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let h = harness();
    let notch = player("Notch");
    h.store.get(&notch, &SkinIntent::Original).await.unwrap();

    assert!(h.store.invalidate(notch.uuid()).await.unwrap());
    assert!(!h.store.invalidate(notch.uuid()).await.unwrap());
    assert!(h.store.peek(notch.uuid()).is_none());

    let again = h.store.get(&notch, &SkinIntent::Original).await.unwrap();
    assert_eq!(again.origin, ResolutionOrigin::Upstream);
    assert_eq!(h.fetcher.fetch_count(), 2);
}

#[tokio::test]
async fn test_player_intent_looks_up_then_fetches() {
    let h = harness();
    let notch = player("Notch");
    let jeb = player("jeb_");
    h.fetcher.register(&jeb);

    let intent = SkinIntent::Player {
        name: "jeb_".into(),
    };
    let property = h.store.fetch_for(&notch, &intent).await.unwrap();
    let textures = property.textures().unwrap();
    assert_eq!(textures.profile_uuid(), Some(jeb.uuid()));
    assert_eq!(property.source(), SkinSource::Original);

    assert!(matches!(
        h.store
            .fetch_for(&notch, &SkinIntent::Player { name: "nobody".into() })
            .await,
        Err(SkinError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_upload_is_verified_locally() {
    let h = harness();
    let notch = player("Notch");
    let (value, signature) = signed_textures(&notch, "uploaded");

    let property = h
        .store
        .fetch_for(
            &notch,
            &SkinIntent::Upload {
                value: value.clone(),
                signature,
            },
        )
        .await
        .unwrap();
    assert_eq!(property.source(), SkinSource::CustomUpload);

    let forged = h
        .store
        .fetch_for(
            &notch,
            &SkinIntent::Upload {
                value,
                signature: common::sign("other"),
            },
        )
        .await;
    assert!(matches!(forged, Err(SkinError::InvalidSignature { .. })));
    assert_eq!(h.metrics.snapshot().upstream_calls, 0);
}

#[tokio::test]
async fn test_default_skin_by_player_name() {
    let steve = player("Steve");
    let fetcher = ScriptedFetcher::new();
    fetcher.register(&steve);
    let h = harness_with(fetcher, DefaultSkin::Player("Steve".into()));
    let notch = player("Notch");

    let resolved = h.store.get(&notch, &SkinIntent::Default).await.unwrap();
    assert_eq!(resolved.property().source(), SkinSource::Default);
    assert_eq!(resolved.entry.ttl, Some(Duration::hours(1)));
    assert_eq!(
        resolved.property().textures().unwrap().profile_uuid(),
        Some(steve.uuid())
    );
}

/// Storage that fails every call.
#[derive(Debug)]
struct BrokenStorage;

impl StorageBackend for BrokenStorage {
    fn load(&self, _uuid: Uuid) -> SkinResult<Option<StorageRecord>> {
        Err(broken())
    }
    fn store(&self, _record: &StorageRecord) -> SkinResult<()> {
        Err(broken())
    }
    fn store_refresh(&self, _record: &StorageRecord) -> SkinResult<bool> {
        Err(broken())
    }
    fn delete(&self, _uuid: Uuid) -> SkinResult<bool> {
        Err(broken())
    }
    fn list(&self) -> SkinResult<Vec<StorageRecord>> {
        Err(broken())
    }
    fn clear(&self) -> SkinResult<usize> {
        Err(broken())
    }
}

fn broken() -> SkinError {
    SkinError::Storage {
        message: "disk full".into(),
    }
}

#[tokio::test]
async fn test_storage_failure_degrades_to_memory() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let metrics = Arc::new(CounterMetrics::new());
    let store = CacheStore::builder(fetcher.clone(), Arc::new(BrokenStorage))
        .metrics(metrics.clone())
        .build();
    let notch = player("Notch");

    let custom = signed_property(&notch, "custom", SkinSource::CustomUrl);
    let outcome = store
        .put(&notch, custom.clone(), url_intent("https://example.com/a.png"))
        .await
        .unwrap();
    assert!(!outcome.persisted);

    let resolved = store.get(&notch, &SkinIntent::Stored).await.unwrap();
    assert_eq!(resolved.origin, ResolutionOrigin::Memory);
    assert_eq!(resolved.property(), &custom);

    // reads fall through to upstream
    let other = player("jeb_");
    let fetched = store.get(&other, &SkinIntent::Original).await.unwrap();
    assert_eq!(fetched.origin, ResolutionOrigin::Upstream);
    assert!(metrics.snapshot().errors.get("storage").copied().unwrap_or(0) >= 2);
}
