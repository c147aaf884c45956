use patrol_core::{Action, InboundRequest};

use crate::commands::common::{ensure_success, print_records, CliDispatcher};
use crate::error::CliError;

pub async fn run_list(dispatcher: &CliDispatcher, as_json: bool) -> Result<(), CliError> {
    let response = dispatcher
        .handle(InboundRequest {
            action: Some(Action::GetAllData.to_string()),
            ..InboundRequest::default()
        })
        .await;
    ensure_success(&response)?;

    print_records(response.data.as_deref().unwrap_or_default(), as_json)
}
