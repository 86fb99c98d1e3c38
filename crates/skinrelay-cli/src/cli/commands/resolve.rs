use crate::exit_codes;

use super::super::args::{GlobalArgs, ResolveArgs};
use super::output::{emit, SkinReport};
use super::session::Session;

pub async fn run(global: &GlobalArgs, args: ResolveArgs) -> anyhow::Result<i32> {
    let session = Session::open(global)?;
    let identity = args.player.identity();
    let report = session
        .resolver()
        .resolve(&identity, &args.intent.into())
        .await?;
    emit(global, &SkinReport::new(&identity, &report))?;
    Ok(exit_codes::SUCCESS)
}
