use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use patrol_core::storage::{R2BlobStore, R2Config, SqliteRowStore};
use patrol_core::{CellValue, Dispatcher, DispatcherConfig, InspectionRecord, Response};

use crate::error::CliError;

pub type CliDispatcher = Dispatcher<SqliteRowStore, Option<R2BlobStore>>;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("PATROL_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from("patrol.db"),
        |dir| dir.join("patrol").join("patrol.db"),
    )
}

pub fn open_dispatcher(db_path: &Path, lock_timeout: Duration) -> Result<CliDispatcher, CliError> {
    let rows = SqliteRowStore::open(db_path)?;
    let blobs = R2Config::from_env()?.map(R2BlobStore::new);
    tracing::debug!(path = %db_path.display(), photos = blobs.is_some(), "Opening dispatcher");

    Ok(Dispatcher::new(
        rows,
        blobs,
        DispatcherConfig {
            lock_timeout,
            ..DispatcherConfig::default()
        },
    )?)
}

/// Print the envelope as JSON; an `Error` envelope becomes a failing exit.
pub fn emit_response(response: &Response) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(response)?);
    ensure_success(response)
}

pub fn ensure_success(response: &Response) -> Result<(), CliError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(CliError::Rejected(
            response
                .message
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

pub fn print_records(records: &[InspectionRecord], as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(records)?);
    } else {
        for line in format_record_lines(records) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_record_lines(records: &[InspectionRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let photo = if record.has_photo() { "photo" } else { "" };
            format!(
                "{:<19}  {:<14}  {:<8}  {:<6}  {photo}",
                record.timestamp, record.part_no, record.status, record.result
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

/// Read a measurement argument the way a sheet would: numbers and booleans
/// keep their type, everything else is text.
pub fn cell_from_arg(value: &str) -> CellValue {
    let trimmed = value.trim();
    if let Ok(number) = trimmed.parse::<f64>() {
        if number.is_finite() {
            return CellValue::Number(number);
        }
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => CellValue::Bool(true),
        "false" => CellValue::Bool(false),
        _ => CellValue::from(value),
    }
}

pub fn text_arg(value: Option<&str>) -> Option<CellValue> {
    value.map(CellValue::from)
}
