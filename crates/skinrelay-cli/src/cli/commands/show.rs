use crate::exit_codes;

use super::super::args::{GlobalArgs, UuidArg};
use super::output::{emit, RecordView};
use super::session::Session;

pub async fn run(global: &GlobalArgs, args: UuidArg) -> anyhow::Result<i32> {
    let session = Session::open(global)?;
    match session.store().record(args.uuid).await? {
        Some(record) => {
            emit(global, &RecordView::from(&record))?;
            Ok(exit_codes::SUCCESS)
        }
        None => {
            eprintln!("no skin stored for {}", args.uuid);
            Ok(exit_codes::NOT_FOUND)
        }
    }
}
