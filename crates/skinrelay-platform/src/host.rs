//! Ports into the host server runtime.
//!
//! The host owns live players and region threads; adapters only see them
//! through these traits. [`crate::runtime`] and [`crate::sim`] provide an
//! in-process implementation.

use std::any::Any;
use std::fmt;

use skinrelay_common::{SkinProperty, TEXTURES_PROPERTY_NAME};
use uuid::Uuid;

use crate::error::PlatformResult;

/// A thread that owns a slice of the world.
///
/// Non-regionised servers run everything on [`RegionId::MAIN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u32);

impl RegionId {
    pub const MAIN: RegionId = RegionId(0);
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::MAIN {
            f.write_str("main")
        } else {
            write!(f, "region-{}", self.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

/// What the client needs to rebuild its own view after a respawn.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub world: String,
    pub game_mode: GameMode,
    pub position: Position,
    pub held_slot: u8,
    pub hashed_seed: i64,
    pub flying: bool,
}

/// A game profile property, as held by the host and sent in player info packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    pub signature: Option<String>,
}

impl ProfileProperty {
    /// The `textures` property carrying `skin`.
    pub fn textures(skin: &SkinProperty) -> Self {
        Self {
            name: TEXTURES_PROPERTY_NAME.to_string(),
            value: skin.value().to_string(),
            signature: Some(skin.signature().to_string()),
        }
    }
}

/// One player's tab list entry.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoEntry {
    pub uuid: Uuid,
    pub name: String,
    pub properties: Vec<ProfileProperty>,
    pub game_mode: GameMode,
}

/// Player info actions of the single-action packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoAction {
    AddPlayer,
    RemovePlayer,
}

/// Packets the refresh cycles send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientboundPacket {
    /// Player info with a single action (before 1.19.3).
    PlayerInfo {
        action: InfoAction,
        entries: Vec<InfoEntry>,
    },
    /// Player info removal (1.19.3 and later).
    PlayerInfoRemove { uuids: Vec<Uuid> },
    /// Player info add (1.19.3 and later).
    PlayerInfoUpdate { entries: Vec<InfoEntry> },
    Respawn {
        world: String,
        game_mode: GameMode,
        hashed_seed: Option<i64>,
    },
    Position(Position),
    HeldSlot { slot: u8 },
    Abilities { flying: bool },
    /// Despawn the player's entity for observers.
    HidePlayer { uuid: Uuid },
    /// Spawn the player's entity for observers.
    ShowPlayer { uuid: Uuid },
}

/// A live player representation inside the host.
pub trait HostPlayer: Send {
    fn uuid(&self) -> Uuid;

    fn name(&self) -> &str;

    /// Whether this is a copy of a player connected to another server process.
    fn is_external(&self) -> bool {
        false
    }

    /// Internal member lookup by name.
    fn member(&self, name: &str) -> Option<&dyn Any>;

    fn member_mut(&mut self, name: &str) -> Option<&mut dyn Any>;

    fn view(&self) -> PlayerView;

    /// Send to this player's own connection.
    fn send(&mut self, packet: ClientboundPacket);

    /// Send to every other player who can see this one.
    fn broadcast(&mut self, packet: ClientboundPacket);

    /// Host-native profile resync, where the host provides one.
    fn refresh_profile(&mut self) -> PlatformResult<()>;
}

/// Where one representation of a player lives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerLocation {
    pub uuid: Uuid,
    /// `None` while the player is between regions.
    pub region: Option<RegionId>,
    pub position: Position,
    pub external: bool,
}

/// Lookup of connected players.
pub trait PlayerDirectory: Send + Sync {
    /// Every representation of `uuid` on this server; empty when offline.
    fn locate(&self, uuid: Uuid) -> Vec<PlayerLocation>;
}

/// Access to the players of the region a task runs in.
pub trait RegionContext {
    fn region(&self) -> RegionId;

    fn player_mut(&mut self, uuid: Uuid) -> Option<&mut dyn HostPlayer>;
}

pub type RegionTask = Box<dyn FnOnce(&mut dyn RegionContext) + Send>;

/// Runs tasks on region threads.
pub trait RegionScheduler: Send + Sync {
    /// Queue `task` on `region`. Fails when the region thread has stopped.
    fn submit(&self, region: RegionId, task: RegionTask) -> PlatformResult<()>;
}
