use crate::exit_codes;

use super::super::args::{GlobalArgs, PlayerArgs};
use super::output::{emit, SkinReport};
use super::session::Session;

pub async fn run(global: &GlobalArgs, args: PlayerArgs) -> anyhow::Result<i32> {
    let session = Session::open(global)?;
    let identity = args.identity();
    let report = session.resolver().reset(&identity).await?;
    emit(global, &SkinReport::new(&identity, &report))?;
    Ok(exit_codes::SUCCESS)
}
