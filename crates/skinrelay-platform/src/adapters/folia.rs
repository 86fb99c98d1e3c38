//! Folia: the player's own region thread, profile re-broadcast.

use skinrelay_common::SkinProperty;
use tracing::debug;

use super::{write_if_changed, ApplyOutcome, PlatformAdapter};
use crate::context::PlatformVariant;
use crate::error::PlatformResult;
use crate::host::{HostPlayer, PlayerLocation, RegionId};
use crate::mapping::AccessorSet;

/// Folia has no main thread. A player may only be touched by the region
/// that currently ticks them; while they cross regions nobody owns them.
#[derive(Debug, Clone, Copy)]
pub struct FoliaAdapter {
    accessors: &'static AccessorSet,
}

impl FoliaAdapter {
    pub fn new(accessors: &'static AccessorSet) -> Self {
        Self { accessors }
    }
}

impl PlatformAdapter for FoliaAdapter {
    fn variant(&self) -> PlatformVariant {
        PlatformVariant::Folia
    }

    fn accessors(&self) -> &'static AccessorSet {
        self.accessors
    }

    fn owner_of(&self, location: &PlayerLocation) -> Option<RegionId> {
        location.region
    }

    fn apply(
        &self,
        player: &mut dyn HostPlayer,
        property: &SkinProperty,
    ) -> PlatformResult<ApplyOutcome> {
        if write_if_changed(self.accessors, player, property)? == ApplyOutcome::Unchanged {
            return Ok(ApplyOutcome::Unchanged);
        }
        player.refresh_profile()?;
        debug!(
            uuid = %player.uuid(),
            thread = ?std::thread::current().name(),
            hash = property.hash(),
            "applied skin on region thread"
        );
        Ok(ApplyOutcome::Applied)
    }
}
