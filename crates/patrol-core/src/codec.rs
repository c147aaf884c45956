//! Row codec: positional rows to [`InspectionRecord`] and back.
//!
//! Decoding is driven by the table's [`SchemaVersion`]; encoding always emits
//! the latest layout.

use crate::error::{Error, Result};
use crate::models::{CellValue, InspectionRecord, Row};
use crate::schema::{SchemaVersion, MODEL_COLUMN, PART_NO_COLUMN, TIMESTAMP_COLUMN};

/// Decode one data row laid out as `version`.
///
/// Cells are taken as they are; a display-fidelity row yields text measurements.
pub fn decode(row: &[CellValue], version: SchemaVersion) -> Result<InspectionRecord> {
    let layout = version.layout();
    if row.len() < layout.min_width() {
        return Err(Error::SchemaMismatch(format!(
            "row has {} columns, {version} requires at least {}",
            row.len(),
            layout.min_width()
        )));
    }

    let text = |column: usize| row.get(column).map(ToString::to_string).unwrap_or_default();
    let cell = |column: usize| row.get(column).cloned().unwrap_or_default();

    Ok(InspectionRecord {
        timestamp: text(TIMESTAMP_COLUMN),
        model: text(MODEL_COLUMN),
        part_no: text(PART_NO_COLUMN),
        part_name: layout.part_name.map(text),
        inspection_type: text(layout.inspection_type),
        weight: cell(layout.weight),
        length: cell(layout.length),
        material_ok: cell(layout.material_ok),
        change_point: text(layout.change_point),
        action_taken: layout.action_taken.map(text),
        status: text(layout.status),
        manager_comment: text(layout.manager_comment),
        result: text(layout.result),
        image_url: text(layout.image),
    })
}

/// Decode every data row of a table (header at index 0 is skipped).
pub fn decode_table(rows: &[Row], version: SchemaVersion) -> Result<Vec<InspectionRecord>> {
    rows.iter()
        .enumerate()
        .skip(1)
        .map(|(index, row)| {
            decode(row, version).map_err(|error| match error {
                Error::SchemaMismatch(message) => {
                    Error::SchemaMismatch(format!("row {index}: {message}"))
                }
                other => other,
            })
        })
        .collect()
}

/// Encode a record in the latest layout.
pub fn encode(record: &InspectionRecord) -> Row {
    let layout = SchemaVersion::LATEST.layout();
    let mut row = vec![CellValue::empty(); layout.width];

    row[TIMESTAMP_COLUMN] = CellValue::from(record.timestamp.as_str());
    row[MODEL_COLUMN] = CellValue::from(record.model.as_str());
    row[PART_NO_COLUMN] = CellValue::from(record.part_no.as_str());
    if let Some(column) = layout.part_name {
        row[column] = CellValue::from(record.part_name.clone().unwrap_or_default());
    }
    row[layout.inspection_type] = CellValue::from(record.inspection_type.as_str());
    row[layout.weight] = record.weight.clone();
    row[layout.length] = record.length.clone();
    row[layout.material_ok] = record.material_ok.clone();
    row[layout.change_point] = CellValue::from(record.change_point.as_str());
    if let Some(column) = layout.action_taken {
        row[column] = CellValue::from(record.action_taken.clone().unwrap_or_default());
    }
    row[layout.status] = CellValue::from(record.status.as_str());
    row[layout.manager_comment] = CellValue::from(record.manager_comment.as_str());
    row[layout.result] = CellValue::from(record.result.as_str());
    row[layout.image] = CellValue::from(record.image_url.as_str());

    row
}
