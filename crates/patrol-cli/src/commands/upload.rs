use std::fs;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use patrol_core::{Action, CellValue, InboundRequest};

use crate::cli::UploadArgs;
use crate::commands::common::{cell_from_arg, emit_response, text_arg, CliDispatcher};
use crate::error::CliError;

pub async fn run_upload(dispatcher: &CliDispatcher, args: &UploadArgs) -> Result<(), CliError> {
    let request = build_upload_request(args)?;
    let response = dispatcher.handle(request).await;
    emit_response(&response)
}

pub fn build_upload_request(args: &UploadArgs) -> Result<InboundRequest, CliError> {
    let mut request = InboundRequest {
        action: Some(Action::Upload.to_string()),
        timestamp: Some(CellValue::from(args.timestamp.as_str())),
        part_no: Some(CellValue::from(args.part_no.as_str())),
        model: text_arg(args.model.as_deref()),
        part_name: text_arg(args.part_name.as_deref()),
        inspection_type: text_arg(args.inspection_type.as_deref()),
        weight: args.weight.as_deref().map(cell_from_arg),
        length: args.length.as_deref().map(cell_from_arg),
        material_ok: args.material_ok.as_deref().map(cell_from_arg),
        change_point: text_arg(args.change_point.as_deref()),
        action_taken: text_arg(args.action_taken.as_deref()),
        status: text_arg(args.status.as_deref()),
        result: text_arg(args.result.as_deref()),
        folder_id: args.folder.clone(),
        ..InboundRequest::default()
    };

    if let Some(path) = &args.photo {
        let bytes = fs::read(path)?;
        request.image_base64 = Some(STANDARD.encode(bytes));
        request.filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string);
    }

    Ok(request)
}
