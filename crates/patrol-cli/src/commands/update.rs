use patrol_core::{Action, CellValue, InboundRequest};

use crate::cli::UpdateArgs;
use crate::commands::common::{emit_response, text_arg, CliDispatcher};
use crate::error::CliError;

pub async fn run_update(dispatcher: &CliDispatcher, args: &UpdateArgs) -> Result<(), CliError> {
    let response = dispatcher.handle(build_update_request(args)).await;
    emit_response(&response)
}

pub fn build_update_request(args: &UpdateArgs) -> InboundRequest {
    InboundRequest {
        action: Some(Action::UpdateStatus.to_string()),
        timestamp: Some(CellValue::from(args.timestamp.as_str())),
        part_no: text_arg(args.part_no.as_deref()),
        status: text_arg(args.status.as_deref()),
        manager_comment: text_arg(args.comment.as_deref()),
        change_point: text_arg(args.change_point.as_deref()),
        apply_all: Some(CellValue::Bool(args.all)),
        ..InboundRequest::default()
    }
}
