//! Inspection record model

use serde::{Deserialize, Serialize};

use super::CellValue;

/// Status written on creation when the inspector did not set one ("unreviewed").
pub const DEFAULT_STATUS: &str = "未審核";

/// One inspection event, decoded from a single table row.
///
/// Text columns are strings; the measurement columns keep their cell type so
/// the native value of a submission survives the append path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionRecord {
    /// Temporal key, as submitted or as displayed by the store
    pub timestamp: String,
    pub model: String,
    pub part_no: String,
    /// Absent for legacy 13-column tables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_name: Option<String>,
    pub inspection_type: String,
    pub weight: CellValue,
    pub length: CellValue,
    pub material_ok: CellValue,
    pub change_point: String,
    /// Absent for legacy 13-column tables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_taken: Option<String>,
    pub status: String,
    pub manager_comment: String,
    pub result: String,
    /// Public photo URL, empty when no photo was attached
    #[serde(alias = "image")]
    pub image_url: String,
}

impl InspectionRecord {
    /// True when the reviewer has not touched the status yet.
    #[must_use]
    pub fn is_unreviewed(&self) -> bool {
        self.status == DEFAULT_STATUS
    }

    #[must_use]
    pub fn has_photo(&self) -> bool {
        !self.image_url.trim().is_empty()
    }
}
