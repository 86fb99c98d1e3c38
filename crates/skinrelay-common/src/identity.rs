//! Player identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable unique id plus the display name last seen for it.
///
/// The uuid keys every cache tier. The name is advisory: it is only used for
/// name based lookups and may be stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerIdentity {
    uuid: Uuid,
    name: String,
}

impl PlayerIdentity {
    pub fn new(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
        }
    }

    /// Parse a uuid in either hyphenated or simple (32 hex digit) form.
    pub fn parse(uuid: &str, name: impl Into<String>) -> Result<Self, uuid::Error> {
        Ok(Self::new(Uuid::parse_str(uuid.trim())?, name))
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Uuid without hyphens, as the session service expects it in URLs.
    pub fn simple_uuid(&self) -> String {
        self.uuid.simple().to_string()
    }
}

impl std::fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.uuid)
    }
}

/// Whether `name` is a syntactically valid account name (1-16 of `[A-Za-z0-9_]`).
pub fn is_valid_player_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 16
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
