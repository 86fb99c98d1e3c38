//! Applying skins to live players across server variants.
//!
//! # Overview
//!
//! - [`PlatformContext::detect`] probes the host for marker types and its
//!   version string, then picks the most specific variant the allowlist permits.
//! - [`MappingRegistry`] maps that context to an [`AccessorSet`], the table of
//!   accessors for the host's internal profile representation.
//! - A [`PlatformAdapter`] writes the property through those accessors and
//!   refreshes observers, on the thread [`PlatformAdapter::owner_of`] names.
//! - [`RegionRuntime`] and [`SimulatedPlayer`] implement the host ports
//!   in-process.

pub mod adapters;
pub mod context;
pub mod error;
pub mod host;
pub mod mapping;
pub mod runtime;
pub mod sim;
pub mod version;

pub use adapters::{adapter_for, ActivePlatform, ApplyOutcome, PlatformAdapter};
pub use context::{markers, PlatformContext, PlatformVariant, RuntimeProbe, StaticProbe};
pub use error::{PlatformError, PlatformResult};
pub use host::{
    ClientboundPacket, GameMode, HostPlayer, InfoAction, InfoEntry, PlayerDirectory,
    PlayerLocation, PlayerView, Position, ProfileProperty, RegionContext, RegionId,
    RegionScheduler, RegionTask,
};
pub use mapping::{AccessorSet, InfoStyle, MappingRegistry, ProfileShape, PropertyList};
pub use runtime::RegionRuntime;
pub use sim::{Delivery, PacketLog, SimulatedPlayer};
pub use version::{GameVersion, VersionParseError};
