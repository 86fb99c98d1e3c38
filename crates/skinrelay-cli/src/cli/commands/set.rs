use clap::{ArgGroup, Args};
use skinrelay_common::{SkinIntent, SkinVariant};

use crate::exit_codes;

use super::super::args::{parse_player_name, GlobalArgs, PlayerArgs};
use super::output::{emit, SkinReport};
use super::session::Session;

#[derive(Args, Debug, Clone)]
#[command(group(
    ArgGroup::new("skin")
        .required(true)
        .args(["url", "copy_from", "upload"])
))]
pub struct SetArgs {
    #[command(flatten)]
    pub player: PlayerArgs,

    /// Generate a skin from an image URL or a NameMC skin page
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Use the slim arm model for --url
    #[arg(long, requires = "url")]
    pub slim: bool,

    /// Copy another account's skin
    #[arg(long = "player", value_name = "NAME", value_parser = parse_player_name)]
    pub copy_from: Option<String>,

    /// Base64 textures value of a signed property
    #[arg(long, value_name = "VALUE", requires = "signature")]
    pub upload: Option<String>,

    /// Signature for --upload
    #[arg(long, value_name = "SIG", requires = "upload")]
    pub signature: Option<String>,
}

impl SetArgs {
    pub fn intent(&self) -> Option<SkinIntent> {
        if let Some(url) = &self.url {
            return Some(SkinIntent::Url {
                url: url.clone(),
                variant: self.slim.then_some(SkinVariant::Slim),
            });
        }
        if let Some(name) = &self.copy_from {
            return Some(SkinIntent::Player { name: name.clone() });
        }
        match (&self.upload, &self.signature) {
            (Some(value), Some(signature)) => Some(SkinIntent::Upload {
                value: value.clone(),
                signature: signature.clone(),
            }),
            _ => None,
        }
    }
}

pub async fn run(global: &GlobalArgs, args: SetArgs) -> anyhow::Result<i32> {
    let Some(intent) = args.intent() else {
        anyhow::bail!("one of --url, --player or --upload with --signature is required");
    };
    let session = Session::open(global)?;
    let identity = args.player.identity();
    let report = session.resolver().set(&identity, intent).await?;
    emit(global, &SkinReport::new(&identity, &report))?;
    Ok(exit_codes::SUCCESS)
}
