//! Shared types for skinrelay.
//!
//! Everything here is plain data: identities, signed skin properties, the
//! intents callers express, and helpers for reading the textures payload that
//! upstream services sign.

pub mod digest;
pub mod identity;
pub mod intent;
pub mod property;
pub mod textures;

pub use digest::sha256_hex_bytes;
pub use identity::{is_valid_player_name, PlayerIdentity};
pub use intent::SkinIntent;
pub use property::{SkinProperty, SkinSource, SkinVariant, TEXTURES_PROPERTY_NAME};
pub use textures::{TextureRef, Textures, TexturesError, TexturesPayload};
