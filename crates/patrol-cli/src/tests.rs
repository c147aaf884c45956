use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use patrol_core::{CellValue, InspectionRecord, Response};
use pretty_assertions::assert_eq;

use crate::cli::{Cli, Commands, UpdateArgs, UploadArgs};
use crate::commands::common::{
    cell_from_arg, ensure_success, format_record_lines, open_dispatcher, resolve_db_path,
};
use crate::commands::request::read_request_body;
use crate::commands::update::build_update_request;
use crate::commands::upload::build_upload_request;
use crate::error::CliError;

fn upload_args(timestamp: &str, part_no: &str) -> UploadArgs {
    UploadArgs {
        timestamp: timestamp.to_string(),
        part_no: part_no.to_string(),
        model: Some("KA-7".to_string()),
        part_name: None,
        inspection_type: None,
        weight: Some("93.5".to_string()),
        length: None,
        material_ok: Some("TRUE".to_string()),
        change_point: None,
        action_taken: None,
        status: None,
        result: Some("OK".to_string()),
        photo: None,
        folder: None,
    }
}

#[test]
fn explicit_db_path_wins() {
    let path = PathBuf::from("/tmp/patrol-test.db");
    assert_eq!(resolve_db_path(Some(path.clone())), path);
}

#[test]
fn measurement_args_keep_native_types() {
    assert_eq!(cell_from_arg("93.5"), CellValue::Number(93.5));
    assert_eq!(cell_from_arg(" 120 "), CellValue::Number(120.0));
    assert_eq!(cell_from_arg("True"), CellValue::Bool(true));
    assert_eq!(cell_from_arg("n/a"), CellValue::from("n/a"));
    assert_eq!(cell_from_arg("NaN"), CellValue::from("NaN"));
}

#[test]
fn record_lines_are_aligned_and_flag_photos() {
    let records = vec![
        InspectionRecord {
            timestamp: "2025-03-07 08:00:00".to_string(),
            part_no: "A1".to_string(),
            status: "結案".to_string(),
            result: "OK".to_string(),
            image_url: "https://cdn.test/root/a.jpg".to_string(),
            ..InspectionRecord::default()
        },
        InspectionRecord {
            timestamp: "2025-03-07 09:00:00".to_string(),
            part_no: "B2".to_string(),
            status: "未審核".to_string(),
            result: "NG".to_string(),
            ..InspectionRecord::default()
        },
    ];

    let lines = format_record_lines(&records);
    assert!(lines[0].starts_with("2025-03-07 08:00:00  A1"));
    assert!(lines[0].ends_with("photo"));
    assert!(lines[1].ends_with("NG"));
}

#[test]
fn error_envelopes_fail_the_command() {
    let response = Response::error(&patrol_core::Error::NotFound("timestamp x".to_string()));
    let err = ensure_success(&response).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Request failed: No matching record: timestamp x"
    );
    assert!(ensure_success(&Response::success("ok")).is_ok());
}

#[test]
fn blank_request_body_is_rejected() {
    assert!(matches!(
        read_request_body("   "),
        Err(CliError::EmptyRequest)
    ));
    assert_eq!(
        read_request_body(r#"{"action":"get_all_data"}"#).unwrap(),
        r#"{"action":"get_all_data"}"#
    );
}

#[test]
fn update_args_map_to_request_fields() {
    let request = build_update_request(&UpdateArgs {
        timestamp: "2025-03-07 08:00:00".to_string(),
        part_no: None,
        status: Some("結案".to_string()),
        comment: None,
        change_point: None,
        all: true,
    });

    assert_eq!(request.action().unwrap(), patrol_core::Action::UpdateStatus);
    assert!(request.apply_all());
    assert_eq!(request.manager_comment, None);
    assert_eq!(request.status, Some(CellValue::from("結案")));
}

#[test]
fn upload_reads_photo_file() {
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("front.png");
    std::fs::write(&photo, [1_u8, 2, 3]).unwrap();

    let mut args = upload_args("2025-03-07 08:00:00", "A1");
    args.photo = Some(photo);
    let request = build_upload_request(&args).unwrap();

    assert_eq!(request.image_base64.as_deref(), Some("AQID"));
    assert_eq!(request.filename.as_deref(), Some("front.png"));
    assert_eq!(request.weight, Some(CellValue::Number(93.5)));
}

#[test]
fn missing_photo_file_is_an_io_error() {
    let mut args = upload_args("2025-03-07 08:00:00", "A1");
    args.photo = Some(PathBuf::from("/definitely/not/here.jpg"));
    assert!(matches!(build_upload_request(&args), Err(CliError::Io(_))));
}

#[test]
fn cli_parses_update_command() {
    let cli = Cli::try_parse_from([
        "patrol",
        "--db-path",
        "/tmp/p.db",
        "update",
        "--timestamp",
        "2025-03-07 08:00:00",
        "--part-no",
        "A1",
        "--status",
        "結案",
    ])
    .unwrap();

    assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/p.db")));
    assert_eq!(cli.lock_timeout, 10);
    let Commands::Update(args) = cli.command else {
        panic!("expected update command");
    };
    assert_eq!(args.part_no.as_deref(), Some("A1"));
    assert!(!args.all);
}

#[tokio::test]
async fn upload_then_history_against_sqlite_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("data").join("patrol.db");
    let dispatcher = open_dispatcher(&db_path, Duration::from_secs(1)).unwrap();

    let request = build_upload_request(&upload_args("2025-03-07 08:00:00", "A1")).unwrap();
    assert!(dispatcher.handle(request).await.is_success());

    let reopened = open_dispatcher(&db_path, Duration::from_secs(1)).unwrap();
    let response = reopened
        .handle_body(br#"{"action": "get_history", "part_no": "A1"}"#)
        .await;
    let records = response.data.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].weight, CellValue::from("93.5"));
    assert_eq!(records[0].material_ok, CellValue::from("TRUE"));
    assert!(records[0].is_unreviewed());
}
