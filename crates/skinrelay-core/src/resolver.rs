//! Skin resolution: cache lookup, then apply on the owning region thread.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use skinrelay_cache::{CacheStore, Resolution, ResolutionOrigin, SkinError};
use skinrelay_common::{is_valid_player_name, PlayerIdentity, SkinIntent, SkinProperty, TexturesPayload};
use skinrelay_platform::{ApplyOutcome, PlatformAdapter, PlayerDirectory, RegionScheduler, RegionTask};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ResolveResult;

/// What happened to each live representation of a player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub applied: usize,
    /// Already wearing the skin; nothing sent.
    pub unchanged: usize,
    /// Moved or disconnected before the task ran.
    pub dropped: usize,
    /// No thread owned the player at submit time.
    pub skipped: usize,
    pub failed: usize,
}

impl ApplySummary {
    pub fn representations(&self) -> usize {
        self.applied + self.unchanged + self.dropped + self.skipped + self.failed
    }
}

#[derive(Debug, Clone)]
pub struct ResolveReport {
    pub property: SkinProperty,
    /// The intent the property was produced for.
    pub intent: SkinIntent,
    pub origin: ResolutionOrigin,
    /// False when the value only reached memory because storage failed.
    pub persisted: bool,
    pub apply: ApplySummary,
}

impl ResolveReport {
    fn from_resolution(resolution: Resolution, apply: ApplySummary) -> Self {
        Self {
            property: resolution.entry.property.clone(),
            intent: resolution.entry.intent.clone(),
            origin: resolution.origin,
            persisted: true,
            apply,
        }
    }
}

/// Top-level skin operations.
pub struct SkinResolver {
    store: Arc<CacheStore>,
    adapter: Arc<dyn PlatformAdapter>,
    directory: Arc<dyn PlayerDirectory>,
    scheduler: Arc<dyn RegionScheduler>,
}

impl std::fmt::Debug for SkinResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkinResolver")
            .field("store", &self.store)
            .field("adapter", &self.adapter)
            .finish()
    }
}

impl SkinResolver {
    pub fn new(
        store: Arc<CacheStore>,
        adapter: Arc<dyn PlatformAdapter>,
        directory: Arc<dyn PlayerDirectory>,
        scheduler: Arc<dyn RegionScheduler>,
    ) -> Self {
        Self {
            store,
            adapter,
            directory,
            scheduler,
        }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn adapter(&self) -> &Arc<dyn PlatformAdapter> {
        &self.adapter
    }

    /// Resolve `intent` through the cache and apply it to every connected
    /// representation of the player.
    pub async fn resolve(
        &self,
        identity: &PlayerIdentity,
        intent: &SkinIntent,
    ) -> ResolveResult<ResolveReport> {
        validate_intent(intent)?;
        let resolution = self.store.get(identity, intent).await?;
        if resolution.is_stale() {
            warn!(uuid = %identity.uuid(), intent = %intent, "applying stale skin");
        }
        let apply = self.apply(identity.uuid(), resolution.property()).await;
        debug!(
            uuid = %identity.uuid(),
            intent = %intent,
            origin = resolution.origin.as_str(),
            applied = apply.applied,
            "resolved skin"
        );
        Ok(ResolveReport::from_resolution(resolution, apply))
    }

    /// Record an explicit choice: derive it, store it, apply it.
    pub async fn set(
        &self,
        identity: &PlayerIdentity,
        intent: SkinIntent,
    ) -> ResolveResult<ResolveReport> {
        if !intent.is_explicit() {
            return Err(SkinError::InvalidIntent {
                reason: "set needs a concrete skin".to_string(),
            }
            .into());
        }
        validate_intent(&intent)?;

        let property = self.store.fetch_for(identity, &intent).await?;
        let outcome = self.store.put(identity, property, intent).await?;
        let apply = self.apply(identity.uuid(), &outcome.entry.property).await;

        info!(
            uuid = %identity.uuid(),
            intent = %outcome.entry.intent,
            persisted = outcome.persisted,
            applied = apply.applied,
            "set skin"
        );
        Ok(ResolveReport {
            property: outcome.entry.property.clone(),
            intent: outcome.entry.intent.clone(),
            origin: ResolutionOrigin::Upstream,
            persisted: outcome.persisted,
            apply,
        })
    }

    /// Forget any choice and go back to the account's own skin, or the
    /// server default when the account has none.
    pub async fn reset(&self, identity: &PlayerIdentity) -> ResolveResult<ResolveReport> {
        self.store.invalidate(identity.uuid()).await?;

        let resolution = match self.store.get(identity, &SkinIntent::Original).await {
            Ok(resolution) => resolution,
            Err(SkinError::NotFound { .. }) => {
                debug!(uuid = %identity.uuid(), "no account skin, falling back to default");
                self.store.get(identity, &SkinIntent::Default).await?
            }
            Err(err) => return Err(err.into()),
        };

        let apply = self.apply(identity.uuid(), resolution.property()).await;
        info!(uuid = %identity.uuid(), intent = %resolution.entry.intent, "reset skin");
        Ok(ResolveReport::from_resolution(resolution, apply))
    }

    /// Re-apply whatever the player last chose.
    pub async fn on_join(&self, identity: &PlayerIdentity) -> ResolveResult<ResolveReport> {
        self.resolve(identity, &SkinIntent::Stored).await
    }

    /// Apply `property` to each live representation on its owning thread.
    ///
    /// An offline player yields an empty summary.
    pub async fn apply(&self, uuid: Uuid, property: &SkinProperty) -> ApplySummary {
        let mut summary = ApplySummary::default();
        let mut pending = Vec::new();

        for location in self.directory.locate(uuid) {
            let Some(region) = self.adapter.owner_of(&location) else {
                debug!(uuid = %uuid, "player between regions, skipping apply");
                summary.skipped += 1;
                continue;
            };

            let (tx, rx) = oneshot::channel();
            let adapter = Arc::clone(&self.adapter);
            let property = property.clone();
            let task: RegionTask = Box::new(move |ctx| {
                let outcome = ctx
                    .player_mut(uuid)
                    .map(|player| adapter.apply(player, &property));
                let _ = tx.send(outcome);
            });

            match self.scheduler.submit(region, task) {
                Ok(()) => pending.push(rx),
                Err(err) => {
                    warn!(uuid = %uuid, region = %region, error = %err, "failed to schedule apply");
                    summary.failed += 1;
                }
            }
        }

        for outcome in join_all(pending).await {
            match outcome {
                Ok(Some(Ok(ApplyOutcome::Applied))) => summary.applied += 1,
                Ok(Some(Ok(ApplyOutcome::Unchanged))) => summary.unchanged += 1,
                Ok(Some(Err(err))) => {
                    warn!(uuid = %uuid, error = %err, kind = err.kind(), "failed to apply skin");
                    summary.failed += 1;
                }
                // task ran but the player had left the region
                Ok(None) => summary.dropped += 1,
                // region stopped before running the task
                Err(_) => summary.dropped += 1,
            }
        }
        summary
    }
}

/// Reject intents that can never resolve before spending upstream budget on them.
fn validate_intent(intent: &SkinIntent) -> Result<(), SkinError> {
    let invalid = |reason: &str| SkinError::InvalidIntent {
        reason: reason.to_string(),
    };
    match intent {
        SkinIntent::Url { url, .. } => {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(invalid("skin URL must be http or https"));
            }
        }
        SkinIntent::Player { name } => {
            if !is_valid_player_name(name) {
                return Err(invalid("not a valid player name"));
            }
        }
        SkinIntent::Upload { value, signature } => {
            if signature.is_empty() {
                return Err(invalid("uploaded skin is unsigned"));
            }
            TexturesPayload::decode(value)
                .map_err(|e| invalid(&format!("uploaded skin is not a textures payload: {}", e)))?;
        }
        SkinIntent::Stored | SkinIntent::Original | SkinIntent::Default => {}
    }
    Ok(())
}
