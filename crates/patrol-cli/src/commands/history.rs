use patrol_core::{Action, CellValue, InboundRequest};

use crate::commands::common::{ensure_success, print_records, CliDispatcher};
use crate::error::CliError;

pub async fn run_history(
    dispatcher: &CliDispatcher,
    part_no: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let response = dispatcher
        .handle(InboundRequest {
            action: Some(Action::GetHistory.to_string()),
            part_no: Some(CellValue::from(part_no.trim())),
            ..InboundRequest::default()
        })
        .await;
    ensure_success(&response)?;

    let records = response.data.as_deref().unwrap_or_default();
    if records.is_empty() && !as_json {
        println!("No records for part {}", part_no.trim());
        return Ok(());
    }
    print_records(records, as_json)
}
