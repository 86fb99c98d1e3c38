//! Game version parsing.
//!
//! Server software reports versions in several shapes:
//!
//! - `1.20.4`
//! - `1.8.8-R0.1-SNAPSHOT` (Bukkit version)
//! - `git-Paper-196 (MC: 1.20.4)` (server version)
//! - `This server is running Paper version git-Paper-196 (MC: 1.20.4) (Implementing API version 1.20.4-R0.1-SNAPSHOT)`
//!
//! When an `(MC: x.y.z)` marker is present it wins; otherwise the first
//! dotted number in the string is used.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A `major.minor.patch` game version. A missing patch component is zero.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GameVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse game version from {input:?}")]
pub struct VersionParseError {
    pub input: String,
}

impl GameVersion {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extract the game version from a server version string.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let err = || VersionParseError {
            input: input.to_string(),
        };

        let candidate = match input.find("(MC: ") {
            Some(start) => {
                let rest = &input[start + 5..];
                rest.split(')').next().unwrap_or(rest)
            }
            None => input,
        };

        candidate
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .filter(|token| token.contains('.'))
            .find_map(parse_dotted)
            .ok_or_else(err)
    }
}

fn parse_dotted(token: &str) -> Option<GameVersion> {
    let mut parts = token.split('.').filter(|p| !p.is_empty());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    Some(GameVersion::new(major, minor, patch))
}

impl FromStr for GameVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.patch == 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}
