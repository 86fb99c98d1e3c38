//! Pre-1.17 servers.

use skinrelay_common::SkinProperty;
use tracing::debug;

use super::{refresh_observers, refresh_self, write_if_changed, ApplyOutcome, PlatformAdapter};
use crate::context::PlatformVariant;
use crate::error::PlatformResult;
use crate::host::{HostPlayer, PlayerLocation, RegionId};
use crate::mapping::AccessorSet;

/// Same cycle as Spigot against the multimap profile. Old respawn packets
/// carry no hashed seed.
#[derive(Debug, Clone, Copy)]
pub struct LegacyAdapter {
    accessors: &'static AccessorSet,
}

impl LegacyAdapter {
    pub fn new(accessors: &'static AccessorSet) -> Self {
        Self { accessors }
    }
}

impl PlatformAdapter for LegacyAdapter {
    fn variant(&self) -> PlatformVariant {
        PlatformVariant::Legacy
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
        refresh_self(self.accessors, player, false)?;
        refresh_observers(self.accessors, player)?;
        debug!(uuid = %player.uuid(), hash = property.hash(), "applied skin on legacy server");
        Ok(ApplyOutcome::Applied)
    }
}
