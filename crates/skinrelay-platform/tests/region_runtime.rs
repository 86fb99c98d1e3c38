//! Region threading with the reference runtime.

use std::sync::Arc;

use skinrelay_common::{SkinProperty, SkinSource};
use skinrelay_platform::{
    adapter_for, ApplyOutcome, GameVersion, MappingRegistry, PlatformAdapter, PlatformContext,
    PlatformError, PlatformVariant, PlayerDirectory, Position, RegionId, RegionRuntime,
    RegionScheduler, SimulatedPlayer,
};
use uuid::Uuid;

fn folia() -> Arc<dyn PlatformAdapter> {
    let context = PlatformContext::new(PlatformVariant::Folia, GameVersion::new(1, 20, 4));
    let accessors = MappingRegistry::builtin().resolve_accessors(&context).unwrap();
    adapter_for(PlatformVariant::Folia, accessors)
}

fn skin() -> SkinProperty {
    SkinProperty::new("value", "signature", SkinSource::CustomUrl)
}

async fn apply_on_owner(
    runtime: &RegionRuntime,
    adapter: &Arc<dyn PlatformAdapter>,
    uuid: Uuid,
) -> Option<Result<ApplyOutcome, PlatformError>> {
    let location = runtime.locate(uuid).into_iter().next()?;
    let region = adapter.owner_of(&location)?;
    let adapter = Arc::clone(adapter);
    runtime
        .run_on(region, move |ctx| {
            ctx.player_mut(uuid).map(|p| adapter.apply(p, &skin()))
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_apply_runs_on_owning_region_thread() {
    let runtime = RegionRuntime::new();
    let adapter = folia();
    let uuid = Uuid::new_v4();
    let steve = SimulatedPlayer::new(uuid, "Steve", adapter.accessors());
    let log = steve.log();

    runtime
        .join(Box::new(steve), RegionId(3), Position::new(100.0, 64.0, 100.0))
        .unwrap();

    let outcome = apply_on_owner(&runtime, &adapter, uuid).await;
    assert_eq!(outcome, Some(Ok(ApplyOutcome::Applied)));
    assert_eq!(log.threads(), vec![Some("region-3".to_string())]);

    runtime.shutdown();
}

#[tokio::test]
async fn test_player_follows_region_moves() {
    let runtime = RegionRuntime::new();
    let adapter = folia();
    let uuid = Uuid::new_v4();
    let steve = SimulatedPlayer::new(uuid, "Steve", adapter.accessors());
    let log = steve.log();

    runtime
        .join(Box::new(steve), RegionId(1), Position::new(0.0, 64.0, 0.0))
        .unwrap();
    runtime
        .move_player(uuid, RegionId(2), Position::new(2048.0, 64.0, 0.0))
        .unwrap();

    // the old region no longer holds the player
    let found = runtime
        .run_on(RegionId(1), move |ctx| ctx.player_mut(uuid).is_some())
        .await
        .unwrap();
    assert!(!found);

    // wait until region 2 has admitted the player
    let admitted = runtime
        .run_on(RegionId(2), move |ctx| ctx.player_mut(uuid).is_some())
        .await
        .unwrap();
    assert!(admitted);
    assert_eq!(runtime.locate(uuid)[0].region, Some(RegionId(2)));

    let outcome = apply_on_owner(&runtime, &adapter, uuid).await;
    assert_eq!(outcome, Some(Ok(ApplyOutcome::Applied)));
    assert_eq!(log.threads(), vec![Some("region-2".to_string())]);

    runtime.shutdown();
}

#[tokio::test]
async fn test_task_for_departed_player_finds_nobody() {
    let runtime = RegionRuntime::new();
    let adapter = folia();
    let uuid = Uuid::new_v4();
    let steve = SimulatedPlayer::new(uuid, "Steve", adapter.accessors());

    runtime
        .join(Box::new(steve), RegionId::MAIN, Position::new(0.0, 64.0, 0.0))
        .unwrap();
    runtime.leave(uuid);

    assert!(runtime.locate(uuid).is_empty());
    let found = runtime
        .run_on(RegionId::MAIN, move |ctx| ctx.player_mut(uuid).is_some())
        .await
        .unwrap();
    assert!(!found);

    runtime.shutdown();
}

#[tokio::test]
async fn test_submit_after_shutdown_fails() {
    let runtime = RegionRuntime::new();
    runtime.shutdown();

    let result = runtime.submit(RegionId::MAIN, Box::new(|_| {}));
    assert!(matches!(result, Err(PlatformError::SchedulerClosed { .. })));

    let result = runtime.run_on(RegionId(9), |ctx| ctx.region()).await;
    assert!(matches!(result, Err(PlatformError::SchedulerClosed { .. })));
}

#[tokio::test]
async fn test_panicking_task_keeps_region_alive() {
    let runtime = RegionRuntime::new();
    runtime
        .submit(RegionId::MAIN, Box::new(|_| panic!("boom")))
        .unwrap();

    let region = runtime.run_on(RegionId::MAIN, |ctx| ctx.region()).await.unwrap();
    assert_eq!(region, RegionId::MAIN);
    assert_eq!(runtime.regions(), vec![RegionId::MAIN]);

    runtime.shutdown();
}
