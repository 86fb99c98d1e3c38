//! MultiPaper: several server processes share one world.

use skinrelay_common::SkinProperty;
use tracing::debug;

use super::{refresh_observers, refresh_self, write_if_changed, ApplyOutcome, PlatformAdapter};
use crate::context::PlatformVariant;
use crate::error::PlatformResult;
use crate::host::{HostPlayer, PlayerLocation, RegionId};
use crate::mapping::AccessorSet;

/// Players connected to a peer process appear here as external players.
/// Those have no connection of their own, so only local observers are
/// refreshed; locally connected players get the full Spigot cycle.
#[derive(Debug, Clone, Copy)]
pub struct MultiPaperAdapter {
    accessors: &'static AccessorSet,
}

impl MultiPaperAdapter {
    pub fn new(accessors: &'static AccessorSet) -> Self {
        Self { accessors }
    }
}

impl PlatformAdapter for MultiPaperAdapter {
    fn variant(&self) -> PlatformVariant {
        PlatformVariant::MultiPaper
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
        let external = player.is_external();
        if !external {
            refresh_self(self.accessors, player, true)?;
        }
        refresh_observers(self.accessors, player)?;
        debug!(uuid = %player.uuid(), external, hash = property.hash(), "applied skin");
        Ok(ApplyOutcome::Applied)
    }
}
