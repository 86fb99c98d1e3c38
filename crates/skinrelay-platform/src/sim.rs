//! In-process player for tests and the maintenance CLI.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use skinrelay_common::SkinProperty;
use uuid::Uuid;

use crate::error::{PlatformError, PlatformResult};
use crate::host::{ClientboundPacket, GameMode, HostPlayer, PlayerView, Position, ProfileProperty};
use crate::mapping::AccessorSet;

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Sent to the player's own connection.
    Own(ClientboundPacket),
    /// Sent to observers.
    Broadcast(ClientboundPacket),
    /// Host-native profile resync.
    ProfileRefresh,
}

/// One recorded delivery and the thread it happened on.
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub delivery: Delivery,
    pub thread: Option<String>,
}

/// Shared view of everything a [`SimulatedPlayer`] sent.
///
/// Stays readable after the player has been moved onto a region thread.
#[derive(Debug, Clone, Default)]
pub struct PacketLog(Arc<Mutex<Vec<Sent>>>);

impl PacketLog {
    fn push(&self, delivery: Delivery) {
        let thread = std::thread::current().name().map(str::to_string);
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Sent { delivery, thread });
    }

    pub fn entries(&self) -> Vec<Sent> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.entries().into_iter().map(|s| s.delivery).collect()
    }

    /// Packets sent to the player's own connection, in order.
    pub fn own(&self) -> Vec<ClientboundPacket> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivery::Own(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn broadcasts(&self) -> Vec<ClientboundPacket> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivery::Broadcast(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn threads(&self) -> Vec<Option<String>> {
        self.entries().into_iter().map(|s| s.thread).collect()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// A player whose internals are a member map and whose connection is a [`PacketLog`].
pub struct SimulatedPlayer {
    uuid: Uuid,
    name: String,
    external: bool,
    profile_api: bool,
    members: HashMap<String, Box<dyn Any + Send>>,
    view: PlayerView,
    log: PacketLog,
}

impl std::fmt::Debug for SimulatedPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedPlayer")
            .field("uuid", &self.uuid)
            .field("name", &self.name)
            .field("external", &self.external)
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SimulatedPlayer {
    /// A player with an empty profile in the shape `accessors` expects.
    pub fn new(uuid: Uuid, name: impl Into<String>, accessors: &AccessorSet) -> Self {
        let name = name.into();
        let profile = accessors.blank_profile(uuid, &name);
        Self::bare(uuid, name).with_member(accessors.profile_member, profile)
    }

    /// A player without any internal members.
    pub fn bare(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            external: false,
            profile_api: true,
            members: HashMap::new(),
            view: PlayerView {
                world: "world".to_string(),
                game_mode: GameMode::Survival,
                position: Position::new(0.0, 64.0, 0.0),
                held_slot: 0,
                hashed_seed: 0,
                flying: false,
            },
            log: PacketLog::default(),
        }
    }

    pub fn with_member(mut self, name: impl Into<String>, value: Box<dyn Any + Send>) -> Self {
        self.members.insert(name.into(), value);
        self
    }

    /// Start out wearing `property`.
    pub fn with_textures(
        mut self,
        accessors: &AccessorSet,
        property: &SkinProperty,
    ) -> PlatformResult<Self> {
        accessors.write_textures(&mut self, ProfileProperty::textures(property))?;
        Ok(self)
    }

    pub fn with_view(mut self, view: PlayerView) -> Self {
        self.view = view;
        self
    }

    /// Mark as a copy of a player connected to another server process.
    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }

    /// Behave like a host without a native profile resync.
    pub fn without_profile_api(mut self) -> Self {
        self.profile_api = false;
        self
    }

    pub fn log(&self) -> PacketLog {
        self.log.clone()
    }
}

impl HostPlayer for SimulatedPlayer {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_external(&self) -> bool {
        self.external
    }

    fn member(&self, name: &str) -> Option<&dyn Any> {
        self.members.get(name).map(|m| &**m as &dyn Any)
    }

    fn member_mut(&mut self, name: &str) -> Option<&mut dyn Any> {
        self.members.get_mut(name).map(|m| &mut **m as &mut dyn Any)
    }

    fn view(&self) -> PlayerView {
        self.view.clone()
    }

    fn send(&mut self, packet: ClientboundPacket) {
        self.log.push(Delivery::Own(packet));
    }

    fn broadcast(&mut self, packet: ClientboundPacket) {
        self.log.push(Delivery::Broadcast(packet));
    }

    fn refresh_profile(&mut self) -> PlatformResult<()> {
        if !self.profile_api {
            return Err(PlatformError::MissingMember {
                uuid: self.uuid,
                member: "setPlayerProfile".to_string(),
            });
        }
        self.log.push(Delivery::ProfileRefresh);
        Ok(())
    }
}
