//! Partial updates of the reviewer-owned columns.

use crate::error::{Error, Result};
use crate::models::CellValue;
use crate::schema::Layout;
use crate::storage::{CellWrite, RowStore};

/// Fields a reviewer may change on an existing record. `None` leaves the
/// stored cell untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub change_point: Option<String>,
    pub status: Option<String>,
    pub manager_comment: Option<String>,
}

impl RecordPatch {
    pub const fn is_empty(&self) -> bool {
        self.change_point.is_none() && self.status.is_none() && self.manager_comment.is_none()
    }

    /// Reject a patch that would write nothing.
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidInput(
                "update needs at least one of change_point, status, manager_comment".to_string(),
            ));
        }
        Ok(())
    }

    /// `(column, value)` pairs to write under `layout`.
    fn cells(&self, layout: &Layout) -> Vec<(usize, CellValue)> {
        [
            (layout.change_point, &self.change_point),
            (layout.status, &self.status),
            (layout.manager_comment, &self.manager_comment),
        ]
        .into_iter()
        .filter_map(|(column, value)| {
            value
                .as_deref()
                .map(|value| (column, CellValue::from(value)))
        })
        .collect()
    }
}

/// Write `patch` into every row in `rows` as one atomic batch.
///
/// Returns the number of rows written. If any write fails, no row changes.
pub fn apply(
    store: &impl RowStore,
    layout: &Layout,
    rows: &[usize],
    patch: &RecordPatch,
) -> Result<usize> {
    patch.ensure_not_empty()?;
    if rows.is_empty() {
        return Ok(0);
    }

    let cells = patch.cells(layout);
    let writes: Vec<CellWrite> = rows
        .iter()
        .flat_map(|&row| {
            cells.iter().map(move |(column, value)| CellWrite {
                row,
                column: *column,
                value: value.clone(),
            })
        })
        .collect();
    store.write_cells(&writes)?;

    tracing::debug!(rows = rows.len(), cells = writes.len(), "Applied record patch");
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{Fidelity, Row};
    use crate::schema::SchemaVersion;
    use crate::storage::MemoryRowStore;

    fn store_with(rows: usize, version: SchemaVersion) -> MemoryRowStore {
        let width = version.layout().width;
        let mut table: Vec<Row> = vec![version.header_row()];
        for index in 0..rows {
            let mut row = vec![CellValue::from(format!("r{index}")); width];
            row[version.layout().status] = CellValue::from("未審核");
            table.push(row);
        }
        MemoryRowStore::with_rows(table)
    }

    #[test]
    fn writes_only_present_fields() {
        let store = store_with(2, SchemaVersion::V5);
        let before = store.read_rows(Fidelity::Raw).unwrap();
        let patch = RecordPatch {
            status: Some("結案".to_string()),
            ..RecordPatch::default()
        };

        let count = apply(&store, SchemaVersion::V5.layout(), &[2], &patch).unwrap();
        assert_eq!(count, 1);

        let after = store.read_rows(Fidelity::Raw).unwrap();
        assert_eq!(after[1], before[1]);
        let mut expected = before[2].clone();
        expected[10] = CellValue::from("結案");
        assert_eq!(after[2], expected);
    }

    #[test]
    fn uses_legacy_offsets_for_legacy_tables() {
        let store = store_with(1, SchemaVersion::V4);
        let patch = RecordPatch {
            change_point: Some("gate moved".to_string()),
            status: Some("結案".to_string()),
            manager_comment: Some("ok".to_string()),
        };

        apply(&store, SchemaVersion::V4.layout(), &[1], &patch).unwrap();

        let row = &store.read_rows(Fidelity::Raw).unwrap()[1];
        assert_eq!(row.len(), 13);
        assert_eq!(row[8], CellValue::from("gate moved"));
        assert_eq!(row[9], CellValue::from("結案"));
        assert_eq!(row[10], CellValue::from("ok"));
    }

    #[test]
    fn empty_string_is_a_real_value() {
        let store = store_with(1, SchemaVersion::V5);
        let patch = RecordPatch {
            manager_comment: Some(String::new()),
            ..RecordPatch::default()
        };
        apply(&store, SchemaVersion::V5.layout(), &[1], &patch).unwrap();
        assert_eq!(store.read_rows(Fidelity::Raw).unwrap()[1][11], CellValue::empty());
    }

    #[test]
    fn empty_patch_is_rejected() {
        let store = store_with(1, SchemaVersion::V5);
        let err = apply(
            &store,
            SchemaVersion::V5.layout(),
            &[1],
            &RecordPatch::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn failed_batch_leaves_every_row_untouched() {
        let store = store_with(2, SchemaVersion::V5);
        let before = store.read_rows(Fidelity::Raw).unwrap();
        let patch = RecordPatch {
            status: Some("結案".to_string()),
            manager_comment: Some("checked".to_string()),
            ..RecordPatch::default()
        };

        let err = apply(&store, SchemaVersion::V5.layout(), &[1, 2, 7], &patch).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(store.read_rows(Fidelity::Raw).unwrap(), before);
    }

    #[test]
    fn no_rows_means_zero_writes() {
        let store = store_with(1, SchemaVersion::V5);
        let patch = RecordPatch {
            status: Some("結案".to_string()),
            ..RecordPatch::default()
        };
        assert_eq!(
            apply(&store, SchemaVersion::V5.layout(), &[], &patch).unwrap(),
            0
        );
    }
}
