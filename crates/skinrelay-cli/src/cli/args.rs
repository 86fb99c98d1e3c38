use clap::{Args, Parser, Subcommand, ValueEnum};
use skinrelay_common::{is_valid_player_name, PlayerIdentity, SkinIntent};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "skinrelay",
    version,
    about = "Resolve, cache and apply Minecraft player skins"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Config file (default: ./skinrelay.yaml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve a player's skin through the cache
    Resolve(ResolveArgs),
    /// Choose a skin for a player and store it
    Set(super::commands::set::SetArgs),
    /// Drop a player's choice and go back to their own skin
    Reset(PlayerArgs),
    /// Show the stored skin record for a player
    Show(UuidArg),
    /// Remove cached skins
    Purge(super::commands::purge::PurgeArgs),
    /// List stored skin records
    List,
    /// Detect the platform variant and accessor table for a server
    Detect(super::commands::detect::DetectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PlayerArgs {
    /// Player uuid, dashed or simple form
    pub uuid: Uuid,

    /// Player name
    #[arg(value_parser = parse_player_name)]
    pub name: String,
}

impl PlayerArgs {
    pub fn identity(&self) -> PlayerIdentity {
        PlayerIdentity::new(self.uuid, self.name.clone())
    }
}

#[derive(Args, Debug, Clone)]
pub struct UuidArg {
    /// Player uuid, dashed or simple form
    pub uuid: Uuid,
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub player: PlayerArgs,

    /// Which skin to resolve
    #[arg(long, value_enum, default_value_t = IntentArg::Stored)]
    pub intent: IntentArg,
}

/// Intents that need no further input.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntentArg {
    /// The player's last choice, or their own skin
    Stored,
    /// The account's own skin
    Original,
    /// The server default skin
    Default,
}

impl From<IntentArg> for SkinIntent {
    fn from(arg: IntentArg) -> Self {
        match arg {
            IntentArg::Stored => SkinIntent::Stored,
            IntentArg::Original => SkinIntent::Original,
            IntentArg::Default => SkinIntent::Default,
        }
    }
}

pub fn parse_player_name(raw: &str) -> Result<String, String> {
    if is_valid_player_name(raw) {
        Ok(raw.to_string())
    } else {
        Err(format!(
            "'{}' is not a valid player name (up to 16 letters, digits or underscores)",
            raw
        ))
    }
}
