//! Spigot: main thread, full packet cycle.

use skinrelay_common::SkinProperty;
use tracing::debug;

use super::{refresh_observers, refresh_self, write_if_changed, ApplyOutcome, PlatformAdapter};
use crate::context::PlatformVariant;
use crate::error::PlatformResult;
use crate::host::{HostPlayer, PlayerLocation, RegionId};
use crate::mapping::AccessorSet;

/// Spigot has no profile API, so the refresh is done by hand: the player
/// gets a fresh tab entry and an in-place respawn, observers get the entity
/// re-spawned.
#[derive(Debug, Clone, Copy)]
pub struct SpigotAdapter {
    accessors: &'static AccessorSet,
}

impl SpigotAdapter {
    pub fn new(accessors: &'static AccessorSet) -> Self {
        Self { accessors }
    }
}

impl PlatformAdapter for SpigotAdapter {
    fn variant(&self) -> PlatformVariant {
        PlatformVariant::Spigot
    }

    fn accessors(&self) -> &'static AccessorSet {
        self.accessors
    }

    fn owner_of(&self, _location: &PlayerLocation) -> Option<RegionId> {
        Some(RegionId::MAIN)
    }

    fn apply(
        &self,
        player: &mut dyn HostPlayer,
        property: &SkinProperty,
    ) -> PlatformResult<ApplyOutcome> {
        if write_if_changed(self.accessors, player, property)? == ApplyOutcome::Unchanged {
            return Ok(ApplyOutcome::Unchanged);
        }
        refresh_self(self.accessors, player, true)?;
        refresh_observers(self.accessors, player)?;
        debug!(uuid = %player.uuid(), hash = property.hash(), "applied skin with full refresh");
        Ok(ApplyOutcome::Applied)
    }
}
