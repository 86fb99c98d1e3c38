use crate::exit_codes;

use super::super::args::GlobalArgs;
use super::output::{emit, RecordTable, RecordView};
use super::session::Session;

pub async fn run(global: &GlobalArgs) -> anyhow::Result<i32> {
    let session = Session::open(global)?;
    let mut records = session.store().records().await?;
    records.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    let table = RecordTable(records.iter().map(RecordView::from).collect());
    emit(global, &table)?;
    Ok(exit_codes::SUCCESS)
}
