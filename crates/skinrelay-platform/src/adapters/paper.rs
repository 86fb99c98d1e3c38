//! Paper: main thread, profile re-broadcast.

use skinrelay_common::SkinProperty;
use tracing::debug;

use super::{write_if_changed, ApplyOutcome, PlatformAdapter};
use crate::context::PlatformVariant;
use crate::error::PlatformResult;
use crate::host::{HostPlayer, PlayerLocation, RegionId};
use crate::mapping::AccessorSet;

/// Paper resyncs a changed profile itself, for the player and observers alike.
#[derive(Debug, Clone, Copy)]
pub struct PaperAdapter {
    accessors: &'static AccessorSet,
}

impl PaperAdapter {
    pub fn new(accessors: &'static AccessorSet) -> Self {
        Self { accessors }
    }
}

impl PlatformAdapter for PaperAdapter {
    fn variant(&self) -> PlatformVariant {
        PlatformVariant::Paper
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
        player.refresh_profile()?;
        debug!(uuid = %player.uuid(), hash = property.hash(), "applied skin via profile resync");
        Ok(ApplyOutcome::Applied)
    }
}
