//! Per-variant skin application.
//!
//! Every adapter writes the property through the resolved [`AccessorSet`]
//! and then refreshes whoever can see the player. They differ in how they
//! refresh (a full packet cycle or the host's own profile resync) and in
//! which thread must run them.

pub mod folia;
pub mod legacy;
pub mod multipaper;
pub mod paper;
pub mod spigot;

use std::fmt;
use std::sync::Arc;

use skinrelay_common::SkinProperty;
use tracing::info;

use crate::context::{PlatformContext, PlatformVariant, RuntimeProbe};
use crate::error::PlatformResult;
use crate::host::{ClientboundPacket, HostPlayer, InfoAction, InfoEntry, PlayerLocation, ProfileProperty, RegionId};
use crate::mapping::{AccessorSet, InfoStyle, MappingRegistry};

pub use folia::FoliaAdapter;
pub use legacy::LegacyAdapter;
pub use multipaper::MultiPaperAdapter;
pub use paper::PaperAdapter;
pub use spigot::SpigotAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The player already carried the property; nothing was sent.
    Unchanged,
}

/// Applies skins to live players of one server variant.
pub trait PlatformAdapter: Send + Sync + fmt::Debug {
    fn variant(&self) -> PlatformVariant;

    fn accessors(&self) -> &'static AccessorSet;

    /// The region whose thread must run [`apply`](Self::apply) for a player
    /// at `location`, or `None` when no thread currently owns it.
    fn owner_of(&self, location: &PlayerLocation) -> Option<RegionId>;

    /// Set the player's textures and refresh observers. Must run on the
    /// thread [`owner_of`](Self::owner_of) names.
    fn apply(
        &self,
        player: &mut dyn HostPlayer,
        property: &SkinProperty,
    ) -> PlatformResult<ApplyOutcome>;
}

/// Build the adapter for `variant` over `accessors`.
pub fn adapter_for(
    variant: PlatformVariant,
    accessors: &'static AccessorSet,
) -> Arc<dyn PlatformAdapter> {
    match variant {
        PlatformVariant::Spigot => Arc::new(SpigotAdapter::new(accessors)),
        PlatformVariant::Paper => Arc::new(PaperAdapter::new(accessors)),
        PlatformVariant::MultiPaper => Arc::new(MultiPaperAdapter::new(accessors)),
        PlatformVariant::Folia => Arc::new(FoliaAdapter::new(accessors)),
        PlatformVariant::Legacy => Arc::new(LegacyAdapter::new(accessors)),
    }
}

/// The adapter chosen for this process.
#[derive(Debug, Clone)]
pub struct ActivePlatform {
    context: PlatformContext,
    adapter: Arc<dyn PlatformAdapter>,
}

impl ActivePlatform {
    /// Probe the host, filter by `allowlist`, and bind the accessor table.
    ///
    /// Fails with `UnsupportedPlatform` when either step finds nothing.
    pub fn initialize(
        probe: &dyn RuntimeProbe,
        allowlist: &[PlatformVariant],
        registry: &MappingRegistry,
    ) -> PlatformResult<Self> {
        let context = PlatformContext::detect(probe, allowlist)?;
        Self::for_context(context, registry)
    }

    pub fn for_context(context: PlatformContext, registry: &MappingRegistry) -> PlatformResult<Self> {
        let accessors = registry.resolve_accessors(&context)?;
        info!(
            platform = %context,
            accessors = accessors.id,
            member = accessors.profile_member,
            "bound platform adapter"
        );
        Ok(Self {
            context,
            adapter: adapter_for(context.variant, accessors),
        })
    }

    pub fn context(&self) -> PlatformContext {
        self.context
    }

    pub fn adapter(&self) -> &Arc<dyn PlatformAdapter> {
        &self.adapter
    }
}

/// Write the textures unless the player already carries them.
pub(crate) fn write_if_changed(
    accessors: &AccessorSet,
    player: &mut dyn HostPlayer,
    property: &SkinProperty,
) -> PlatformResult<ApplyOutcome> {
    let wanted = ProfileProperty::textures(property);
    if accessors.read_textures(player)?.as_ref() == Some(&wanted) {
        return Ok(ApplyOutcome::Unchanged);
    }
    accessors.write_textures(player, wanted)?;
    Ok(ApplyOutcome::Applied)
}

fn info_entry(accessors: &AccessorSet, player: &dyn HostPlayer) -> PlatformResult<InfoEntry> {
    let properties = accessors.read_textures(player)?.into_iter().collect();
    Ok(InfoEntry {
        uuid: player.uuid(),
        name: player.name().to_string(),
        properties,
        game_mode: player.view().game_mode,
    })
}

/// Remove-then-add player info packets in the style the client expects.
fn info_cycle(style: InfoStyle, entry: InfoEntry) -> [ClientboundPacket; 2] {
    match style {
        InfoStyle::Action => [
            ClientboundPacket::PlayerInfo {
                action: InfoAction::RemovePlayer,
                entries: vec![entry.clone()],
            },
            ClientboundPacket::PlayerInfo {
                action: InfoAction::AddPlayer,
                entries: vec![entry],
            },
        ],
        InfoStyle::Split => [
            ClientboundPacket::PlayerInfoRemove {
                uuids: vec![entry.uuid],
            },
            ClientboundPacket::PlayerInfoUpdate {
                entries: vec![entry],
            },
        ],
    }
}

/// Re-send the player's tab entry and entity to everyone who sees them.
pub(crate) fn refresh_observers(
    accessors: &AccessorSet,
    player: &mut dyn HostPlayer,
) -> PlatformResult<()> {
    let entry = info_entry(accessors, player)?;
    let uuid = entry.uuid;
    for packet in info_cycle(accessors.info_style, entry) {
        player.broadcast(packet);
    }
    player.broadcast(ClientboundPacket::HidePlayer { uuid });
    player.broadcast(ClientboundPacket::ShowPlayer { uuid });
    Ok(())
}

/// Rebuild the player's own view: info cycle, respawn in place, then
/// abilities, position and held slot so the client ends where it started.
pub(crate) fn refresh_self(
    accessors: &AccessorSet,
    player: &mut dyn HostPlayer,
    send_seed: bool,
) -> PlatformResult<()> {
    let entry = info_entry(accessors, player)?;
    for packet in info_cycle(accessors.info_style, entry) {
        player.send(packet);
    }

    let view = player.view();
    player.send(ClientboundPacket::Respawn {
        world: view.world,
        game_mode: view.game_mode,
        hashed_seed: send_seed.then_some(view.hashed_seed),
    });
    player.send(ClientboundPacket::Abilities { flying: view.flying });
    player.send(ClientboundPacket::Position(view.position));
    player.send(ClientboundPacket::HeldSlot {
        slot: view.held_slot,
    });
    Ok(())
}
