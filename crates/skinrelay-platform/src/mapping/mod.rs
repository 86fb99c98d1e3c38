//! Per-version accessor tables.
//!
//! A server's player profile lives behind version-specific internals. The
//! [`MappingRegistry`] maps a platform family and version range to an
//! [`AccessorSet`]: the member that holds the profile, how to read and write
//! its `textures` property, and which player info packets the client expects.
//! The set is resolved once at startup and used for the process lifetime.

pub mod shapes;

use std::any::Any;
use std::fmt;

use uuid::Uuid;

use crate::context::{PlatformContext, PlatformVariant};
use crate::error::{PlatformError, PlatformResult};
use crate::host::{HostPlayer, ProfileProperty};
use crate::version::GameVersion;
use shapes::{BlankFn, ReadFn, WriteFn};

pub use shapes::{ProfileRecord, PropertyList, PropertyMultimap};

/// Player info packet layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoStyle {
    /// One packet type with an add/remove action (before 1.19.3).
    Action,
    /// Separate remove and update packets (1.19.3 and later).
    Split,
}

impl InfoStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Split => "split",
        }
    }
}

/// How the host stores profile properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileShape {
    Multimap,
    List,
    Record,
}

impl ProfileShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Multimap => "property multimap",
            Self::List => "property list",
            Self::Record => "profile record",
        }
    }
}

/// Accessors bound to one internal profile representation.
#[derive(Clone, Copy)]
pub struct AccessorSet {
    pub id: &'static str,
    /// Member name under which the host exposes the profile.
    pub profile_member: &'static str,
    pub shape: ProfileShape,
    pub info_style: InfoStyle,
    read: ReadFn,
    write: WriteFn,
    blank: BlankFn,
}

impl fmt::Debug for AccessorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorSet")
            .field("id", &self.id)
            .field("profile_member", &self.profile_member)
            .field("shape", &self.shape)
            .field("info_style", &self.info_style)
            .finish()
    }
}

impl AccessorSet {
    /// The player's current `textures` property.
    pub fn read_textures(&self, player: &dyn HostPlayer) -> PlatformResult<Option<ProfileProperty>> {
        let member = player
            .member(self.profile_member)
            .ok_or_else(|| self.missing(player.uuid()))?;
        (self.read)(member).map_err(|_| self.mismatch())
    }

    /// Replace the player's `textures` property.
    pub fn write_textures(
        &self,
        player: &mut dyn HostPlayer,
        property: ProfileProperty,
    ) -> PlatformResult<()> {
        let uuid = player.uuid();
        let member = player
            .member_mut(self.profile_member)
            .ok_or_else(|| self.missing(uuid))?;
        (self.write)(member, property).map_err(|_| self.mismatch())
    }

    /// An empty profile of this set's shape, for hosts that build players.
    pub fn blank_profile(&self, uuid: Uuid, name: &str) -> Box<dyn Any + Send> {
        (self.blank)(uuid, name)
    }

    fn missing(&self, uuid: Uuid) -> PlatformError {
        PlatformError::MissingMember {
            uuid,
            member: self.profile_member.to_string(),
        }
    }

    fn mismatch(&self) -> PlatformError {
        PlatformError::AccessorMismatch {
            member: self.profile_member.to_string(),
            expected: self.shape.as_str(),
        }
    }
}

static LEGACY_MULTIMAP: AccessorSet = AccessorSet {
    id: "legacy-multimap",
    profile_member: "profile.properties",
    shape: ProfileShape::Multimap,
    info_style: InfoStyle::Action,
    read: shapes::multimap_read,
    write: shapes::multimap_write,
    blank: shapes::multimap_blank,
};

static LIST_ACTION: AccessorSet = AccessorSet {
    id: "property-list",
    profile_member: "gameProfile.properties",
    shape: ProfileShape::List,
    info_style: InfoStyle::Action,
    read: shapes::list_read,
    write: shapes::list_write,
    blank: shapes::list_blank,
};

static LIST_SPLIT: AccessorSet = AccessorSet {
    id: "property-list-split-info",
    profile_member: "gameProfile.properties",
    shape: ProfileShape::List,
    info_style: InfoStyle::Split,
    read: shapes::list_read,
    write: shapes::list_write,
    blank: shapes::list_blank,
};

static RECORD_SPLIT: AccessorSet = AccessorSet {
    id: "profile-record",
    profile_member: "gameProfile",
    shape: ProfileShape::Record,
    info_style: InfoStyle::Split,
    read: shapes::record_read,
    write: shapes::record_write,
    blank: shapes::record_blank,
};

const LEGACY: &[PlatformVariant] = &[PlatformVariant::Legacy];
const MAIN_THREAD: &[PlatformVariant] = &[
    PlatformVariant::Spigot,
    PlatformVariant::Paper,
    PlatformVariant::MultiPaper,
];
const MODERN: &[PlatformVariant] = &[
    PlatformVariant::Spigot,
    PlatformVariant::Paper,
    PlatformVariant::MultiPaper,
    PlatformVariant::Folia,
];

/// One row of the registry: families and `[since, until)` served by `accessors`.
#[derive(Debug)]
pub struct MappingEntry {
    pub families: &'static [PlatformVariant],
    pub since: GameVersion,
    pub until: GameVersion,
    pub accessors: &'static AccessorSet,
}

impl MappingEntry {
    fn matches(&self, context: &PlatformContext) -> bool {
        self.families.contains(&context.variant)
            && context.version >= self.since
            && context.version < self.until
    }
}

static BUILTIN: &[MappingEntry] = &[
    MappingEntry {
        families: LEGACY,
        since: GameVersion::new(1, 8, 0),
        until: GameVersion::new(1, 17, 0),
        accessors: &LEGACY_MULTIMAP,
    },
    MappingEntry {
        families: MAIN_THREAD,
        since: GameVersion::new(1, 17, 0),
        until: GameVersion::new(1, 19, 3),
        accessors: &LIST_ACTION,
    },
    MappingEntry {
        families: MODERN,
        since: GameVersion::new(1, 19, 3),
        until: GameVersion::new(1, 20, 2),
        accessors: &LIST_SPLIT,
    },
    MappingEntry {
        families: MODERN,
        since: GameVersion::new(1, 20, 2),
        until: GameVersion::new(1, 22, 0),
        accessors: &RECORD_SPLIT,
    },
];

/// Static table of accessor sets.
#[derive(Debug, Clone, Copy)]
pub struct MappingRegistry {
    entries: &'static [MappingEntry],
}

impl Default for MappingRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MappingRegistry {
    pub fn builtin() -> Self {
        Self { entries: BUILTIN }
    }

    pub fn entries(&self) -> &'static [MappingEntry] {
        self.entries
    }

    /// The accessor set for `context`, or `UnsupportedPlatform` when no row covers it.
    pub fn resolve_accessors(&self, context: &PlatformContext) -> PlatformResult<&'static AccessorSet> {
        self.entries
            .iter()
            .find(|entry| entry.matches(context))
            .map(|entry| entry.accessors)
            .ok_or_else(|| PlatformError::UnsupportedPlatform {
                reason: format!("no mappings for {}", context),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(variant: PlatformVariant, version: GameVersion) -> PlatformResult<&'static AccessorSet> {
        MappingRegistry::builtin().resolve_accessors(&PlatformContext::new(variant, version))
    }

    #[test]
    fn picks_shape_and_info_style_by_version() {
        let set = resolve(PlatformVariant::Legacy, GameVersion::new(1, 8, 8)).unwrap();
        assert_eq!(set.shape, ProfileShape::Multimap);
        assert_eq!(set.info_style, InfoStyle::Action);

        let set = resolve(PlatformVariant::Spigot, GameVersion::new(1, 19, 2)).unwrap();
        assert_eq!(set.shape, ProfileShape::List);
        assert_eq!(set.info_style, InfoStyle::Action);

        let set = resolve(PlatformVariant::Paper, GameVersion::new(1, 19, 3)).unwrap();
        assert_eq!(set.info_style, InfoStyle::Split);

        let set = resolve(PlatformVariant::Folia, GameVersion::new(1, 20, 4)).unwrap();
        assert_eq!(set.shape, ProfileShape::Record);
        assert_eq!(set.profile_member, "gameProfile");
    }

    #[test]
    fn versions_without_a_table_are_unsupported() {
        for (variant, version) in [
            (PlatformVariant::Legacy, GameVersion::new(1, 7, 10)),
            (PlatformVariant::Spigot, GameVersion::new(1, 22, 0)),
            (PlatformVariant::Legacy, GameVersion::new(1, 18, 0)),
            (PlatformVariant::Folia, GameVersion::new(1, 18, 2)),
        ] {
            assert!(
                matches!(
                    resolve(variant, version),
                    Err(PlatformError::UnsupportedPlatform { .. })
                ),
                "{} {} should be unsupported",
                variant,
                version
            );
        }
    }

    #[test]
    fn ranges_do_not_overlap() {
        let registry = MappingRegistry::builtin();
        for variant in PlatformVariant::ALL {
            let mut rows: Vec<_> = registry
                .entries()
                .iter()
                .filter(|e| e.families.contains(&variant))
                .collect();
            rows.sort_by_key(|e| e.since);
            for pair in rows.windows(2) {
                assert!(pair[0].until <= pair[1].since, "{} rows overlap", variant);
            }
        }
    }
}
