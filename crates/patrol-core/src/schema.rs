//! Table schema versions and their column layouts.
//!
//! The schema version belongs to the whole table. It is read from the tag the
//! row store keeps beside the rows; tables written before the tag existed fall
//! back to counting the header columns.

use std::fmt;

use crate::error::{Error, Result};
use crate::models::{CellValue, Fidelity, Row};
use crate::storage::RowStore;

/// Column positions shared by every layout.
pub const TIMESTAMP_COLUMN: usize = 0;
pub const MODEL_COLUMN: usize = 1;
pub const PART_NO_COLUMN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    /// 13 columns, no `action_taken`
    V4,
    /// 14 columns
    V5,
}

/// Column offsets for one schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: usize,
    pub part_name: Option<usize>,
    pub inspection_type: usize,
    pub weight: usize,
    pub length: usize,
    pub material_ok: usize,
    pub change_point: usize,
    pub action_taken: Option<usize>,
    pub status: usize,
    pub manager_comment: usize,
    pub result: usize,
    pub image: usize,
}

const V4_LAYOUT: Layout = Layout {
    width: 13,
    part_name: Some(3),
    inspection_type: 4,
    weight: 5,
    length: 6,
    material_ok: 7,
    change_point: 8,
    action_taken: None,
    status: 9,
    manager_comment: 10,
    result: 11,
    image: 12,
};

const V5_LAYOUT: Layout = Layout {
    width: 14,
    part_name: Some(3),
    inspection_type: 4,
    weight: 5,
    length: 6,
    material_ok: 7,
    change_point: 8,
    action_taken: Some(9),
    status: 10,
    manager_comment: 11,
    result: 12,
    image: 13,
};

const V4_HEADER: [&str; 13] = [
    "timestamp",
    "model",
    "part_no",
    "part_name",
    "inspection_type",
    "weight",
    "length",
    "material_ok",
    "change_point",
    "status",
    "manager_comment",
    "result",
    "image",
];

const V5_HEADER: [&str; 14] = [
    "timestamp",
    "model",
    "part_no",
    "part_name",
    "inspection_type",
    "weight",
    "length",
    "material_ok",
    "change_point",
    "action_taken",
    "status",
    "manager_comment",
    "result",
    "image",
];

impl SchemaVersion {
    /// The layout every newly encoded row uses.
    pub const LATEST: Self = Self::V5;

    pub const fn layout(self) -> &'static Layout {
        match self {
            Self::V4 => &V4_LAYOUT,
            Self::V5 => &V5_LAYOUT,
        }
    }

    /// Numeric tag persisted by the row store.
    pub const fn tag(self) -> u32 {
        match self {
            Self::V4 => 4,
            Self::V5 => 5,
        }
    }

    pub fn from_tag(tag: u32) -> Result<Self> {
        match tag {
            4 => Ok(Self::V4),
            5 => Ok(Self::V5),
            other => Err(Error::SchemaMismatch(format!(
                "unknown schema version tag {other}"
            ))),
        }
    }

    /// Infer the version of an untagged table from its column count.
    pub fn infer_from_width(width: usize) -> Result<Self> {
        match width {
            13 => Ok(Self::V4),
            w if w >= 14 => Ok(Self::V5),
            other => Err(Error::SchemaMismatch(format!(
                "cannot infer schema from a {other}-column header (expected 13 or 14)"
            ))),
        }
    }

    /// Header row written when a table is created.
    pub fn header_row(self) -> Row {
        let names: &[&str] = match self {
            Self::V4 => &V4_HEADER,
            Self::V5 => &V5_HEADER,
        };
        names.iter().map(|name| CellValue::from(*name)).collect()
    }
}

impl Layout {
    /// Narrowest row the codec accepts; the trailing image cell may be missing.
    pub const fn min_width(&self) -> usize {
        self.width - 1
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.tag())
    }
}

/// Resolve the schema version in force for `store`, given rows already read
/// from it (header at index 0).
pub fn resolve_version(store: &impl RowStore, rows: &[Row]) -> Result<SchemaVersion> {
    if let Some(version) = store.schema_tag()? {
        return Ok(version);
    }
    rows.first().map_or(Ok(SchemaVersion::LATEST), |header| {
        SchemaVersion::infer_from_width(header.len())
    })
}

/// Prepare a table for use: an empty table gets the latest header and tag; an
/// untagged table with data has its inferred version persisted.
pub fn ensure_table(store: &impl RowStore) -> Result<SchemaVersion> {
    if let Some(version) = store.schema_tag()? {
        return Ok(version);
    }

    let rows = store.read_rows(Fidelity::Raw)?;
    let Some(header) = rows.first() else {
        let version = SchemaVersion::LATEST;
        store.append_row(version.header_row())?;
        store.set_schema_tag(version)?;
        tracing::info!(schema = %version, "Initialized empty inspection table");
        return Ok(version);
    };

    let version = SchemaVersion::infer_from_width(header.len())?;
    store.set_schema_tag(version)?;
    tracing::warn!(
        schema = %version,
        columns = header.len(),
        rows = rows.len().saturating_sub(1),
        "Adopted untagged legacy table by column count"
    );
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRowStore;

    #[test]
    fn layouts_match_documented_offsets() {
        let v4 = SchemaVersion::V4.layout();
        assert_eq!(v4.width, 13);
        assert_eq!(v4.part_name, Some(3));
        assert_eq!(v4.action_taken, None);
        assert_eq!((v4.status, v4.manager_comment, v4.image), (9, 10, 12));

        let v5 = SchemaVersion::V5.layout();
        assert_eq!(v5.width, 14);
        assert_eq!(v5.part_name, Some(3));
        assert_eq!(v5.action_taken, Some(9));
        assert_eq!((v5.status, v5.manager_comment, v5.image), (10, 11, 13));
    }

    #[test]
    fn tags_round_trip_and_reject_unknown() {
        for version in [SchemaVersion::V4, SchemaVersion::V5] {
            assert_eq!(SchemaVersion::from_tag(version.tag()).unwrap(), version);
        }
        assert!(matches!(
            SchemaVersion::from_tag(3),
            Err(Error::SchemaMismatch(_))
        ));
    }

    #[test]
    fn width_inference_covers_both_layouts() {
        assert_eq!(SchemaVersion::infer_from_width(13).unwrap(), SchemaVersion::V4);
        assert_eq!(SchemaVersion::infer_from_width(14).unwrap(), SchemaVersion::V5);
        assert_eq!(SchemaVersion::infer_from_width(16).unwrap(), SchemaVersion::V5);
        assert!(SchemaVersion::infer_from_width(9).is_err());
    }

    #[test]
    fn ensure_table_initializes_empty_store() {
        let store = MemoryRowStore::new();
        assert_eq!(ensure_table(&store).unwrap(), SchemaVersion::V5);
        let rows = store.read_rows(Fidelity::Raw).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 14);
        assert_eq!(store.schema_tag().unwrap(), Some(SchemaVersion::V5));
    }

    #[test]
    fn ensure_table_adopts_untagged_legacy_header() {
        let store = MemoryRowStore::new();
        store.append_row(SchemaVersion::V4.header_row()).unwrap();

        assert_eq!(ensure_table(&store).unwrap(), SchemaVersion::V4);
        assert_eq!(store.schema_tag().unwrap(), Some(SchemaVersion::V4));
        assert_eq!(store.read_rows(Fidelity::Raw).unwrap().len(), 1);
    }

    #[test]
    fn stored_tag_wins_over_column_count() {
        let store = MemoryRowStore::new();
        store.append_row(SchemaVersion::V5.header_row()).unwrap();
        store.set_schema_tag(SchemaVersion::V4).unwrap();
        let rows = store.read_rows(Fidelity::Raw).unwrap();
        assert_eq!(resolve_version(&store, &rows).unwrap(), SchemaVersion::V4);
    }
}
