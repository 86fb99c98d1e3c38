use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use crate::exit_codes;

use super::super::args::GlobalArgs;
use super::output::{emit, Render};
use super::session::Session;

#[derive(Args, Debug, Clone)]
pub struct PurgeArgs {
    /// Player whose cached skin is dropped from memory and storage
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub uuid: Option<Uuid>,

    /// Drop every cached skin
    #[arg(long)]
    pub all: bool,

    /// Confirm --all
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, Serialize)]
struct Purged {
    #[serde(skip_serializing_if = "Option::is_none")]
    uuid: Option<Uuid>,
    removed: usize,
}

impl Render for Purged {
    fn render(&self) -> String {
        match (self.uuid, self.removed) {
            (Some(uuid), 0) => format!("nothing stored for {}\n", uuid),
            (Some(uuid), _) => format!("purged {}\n", uuid),
            (None, n) => format!("purged {} record(s)\n", n),
        }
    }
}

pub async fn run(global: &GlobalArgs, args: PurgeArgs) -> anyhow::Result<i32> {
    if args.all && !args.yes {
        anyhow::bail!("Refusing to --all without --yes (safety).");
    }

    let session = Session::open(global)?;
    let purged = match args.uuid {
        Some(uuid) => Purged {
            uuid: Some(uuid),
            removed: usize::from(session.store().invalidate(uuid).await?),
        },
        None => Purged {
            uuid: None,
            removed: session.store().purge().await?,
        },
    };
    emit(global, &purged)?;
    Ok(exit_codes::SUCCESS)
}
