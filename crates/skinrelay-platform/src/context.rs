//! Server variant detection.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PlatformError, PlatformResult};
use crate::version::GameVersion;

/// Host types whose presence identifies a server fork.
pub mod markers {
    pub const FOLIA: &str = "io.papermc.paper.threadedregions.RegionizedServer";
    pub const MULTIPAPER: &str = "puregero.multipaper.MultiPaper";
    pub const PAPER: &str = "io.papermc.paper.configuration.Configuration";
    pub const PAPER_LEGACY: &str = "com.destroystokyo.paper.PaperConfig";
}

/// Versions before this use the legacy adapter.
pub const LEGACY_BEFORE: GameVersion = GameVersion::new(1, 17, 0);

/// Supported server variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformVariant {
    Spigot,
    Paper,
    MultiPaper,
    Folia,
    Legacy,
}

impl PlatformVariant {
    pub const ALL: [PlatformVariant; 5] = [
        Self::Spigot,
        Self::Paper,
        Self::MultiPaper,
        Self::Folia,
        Self::Legacy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spigot => "spigot",
            Self::Paper => "paper",
            Self::MultiPaper => "multipaper",
            Self::Folia => "folia",
            Self::Legacy => "legacy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
    }

    /// Adapters able to drive this variant, most specific first.
    ///
    /// Forks keep their parent's behaviour, so a MultiPaper server can fall
    /// back to the Paper or Spigot adapter. Folia cannot: its regions have no
    /// main thread.
    fn fallbacks(&self) -> &'static [PlatformVariant] {
        match self {
            Self::Spigot => &[Self::Spigot],
            Self::Paper => &[Self::Paper, Self::Spigot],
            Self::MultiPaper => &[Self::MultiPaper, Self::Paper, Self::Spigot],
            Self::Folia => &[Self::Folia],
            Self::Legacy => &[Self::Legacy],
        }
    }
}

impl fmt::Display for PlatformVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature probing against the host runtime.
pub trait RuntimeProbe {
    /// The host's version string, e.g. `git-Paper-196 (MC: 1.20.4)`.
    fn server_version(&self) -> String;

    /// Whether the named host type is present.
    fn has_marker(&self, marker: &str) -> bool;
}

/// A probe over a fixed version string and marker set.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    version: String,
    markers: HashSet<String>,
}

impl StaticProbe {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            markers: HashSet::new(),
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.insert(marker.into());
        self
    }
}

impl RuntimeProbe for StaticProbe {
    fn server_version(&self) -> String {
        self.version.clone()
    }

    fn has_marker(&self, marker: &str) -> bool {
        self.markers.contains(marker)
    }
}

/// The detected server: variant plus game version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformContext {
    pub variant: PlatformVariant,
    pub version: GameVersion,
}

impl PlatformContext {
    pub fn new(variant: PlatformVariant, version: GameVersion) -> Self {
        Self { variant, version }
    }

    /// Probe the host and pick the most specific variant the allowlist permits.
    ///
    /// An empty allowlist permits every variant.
    pub fn detect(
        probe: &dyn RuntimeProbe,
        allowlist: &[PlatformVariant],
    ) -> PlatformResult<Self> {
        let raw = probe.server_version();
        let version = GameVersion::parse(&raw).map_err(|e| PlatformError::UnsupportedPlatform {
            reason: e.to_string(),
        })?;

        let native = native_variant(probe, version);
        debug!(server_version = %raw, native = %native, "probed host runtime");

        let variant = native
            .fallbacks()
            .iter()
            .copied()
            .find(|v| allowlist.is_empty() || allowlist.contains(v))
            .ok_or_else(|| PlatformError::UnsupportedPlatform {
                reason: format!("{} {} is not in the platform allowlist", native, version),
            })?;

        info!(variant = %variant, version = %version, "detected platform");
        Ok(Self { variant, version })
    }
}

impl fmt::Display for PlatformContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.variant, self.version)
    }
}

fn native_variant(probe: &dyn RuntimeProbe, version: GameVersion) -> PlatformVariant {
    if probe.has_marker(markers::FOLIA) {
        PlatformVariant::Folia
    } else if probe.has_marker(markers::MULTIPAPER) {
        PlatformVariant::MultiPaper
    } else if version < LEGACY_BEFORE {
        PlatformVariant::Legacy
    } else if probe.has_marker(markers::PAPER) || probe.has_marker(markers::PAPER_LEGACY) {
        PlatformVariant::Paper
    } else {
        PlatformVariant::Spigot
    }
}
