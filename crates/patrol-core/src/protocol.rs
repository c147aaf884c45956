//! Request and response envelope of the intake endpoint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{CellValue, InspectionRecord};

/// Dispatchable actions. A request without `action` is an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Upload,
    GetAllData,
    GetHistory,
    UpdateStatus,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::GetAllData => "get_all_data",
            Self::GetHistory => "get_history",
            Self::UpdateStatus => "update_status",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "" | "upload" => Ok(Self::Upload),
            "get_all_data" => Ok(Self::GetAllData),
            "get_history" => Ok(Self::GetHistory),
            "update_status" => Ok(Self::UpdateStatus),
            other => Err(Error::InvalidInput(format!("unknown action {other:?}"))),
        }
    }
}

/// A decoded request body. Every field is optional on the wire; handlers check
/// what they need.
///
/// Text fields accept JSON strings, numbers, or booleans and are read through
/// their display form, so a part number sent as `52100` matches the stored
/// cell `"52100"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundRequest {
    pub action: Option<String>,
    pub timestamp: Option<CellValue>,
    pub model: Option<CellValue>,
    pub part_no: Option<CellValue>,
    pub part_name: Option<CellValue>,
    pub inspection_type: Option<CellValue>,
    pub weight: Option<CellValue>,
    pub length: Option<CellValue>,
    pub material_ok: Option<CellValue>,
    pub change_point: Option<CellValue>,
    pub action_taken: Option<CellValue>,
    pub status: Option<CellValue>,
    pub result: Option<CellValue>,
    pub manager_comment: Option<CellValue>,
    pub apply_all: Option<CellValue>,
    pub image_base64: Option<String>,
    pub filename: Option<String>,
    pub folder_id: Option<String>,
}

impl InboundRequest {
    /// Parse a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::Parse("request body is empty".to_string()));
        }
        serde_json::from_slice(body).map_err(|error| Error::Parse(error.to_string()))
    }

    pub fn action(&self) -> Result<Action> {
        self.action.as_deref().map_or(Ok(Action::default()), str::parse)
    }

    /// Truthiness of `apply_all`: `true`, `"true"`, or a non-zero number.
    pub fn apply_all(&self) -> bool {
        match &self.apply_all {
            Some(CellValue::Bool(flag)) => *flag,
            Some(CellValue::Number(value)) => value.abs() > 0.0,
            Some(CellValue::Text(text)) => text.trim().eq_ignore_ascii_case("true"),
            None => false,
        }
    }

    /// Photo payload, `None` when absent or blank.
    pub fn image_base64(&self) -> Option<&str> {
        self.image_base64
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Display string of an optional lenient text field.
pub fn text(value: Option<&CellValue>) -> Option<String> {
    value.map(ToString::to_string)
}

/// Display string of a field that must be present and non-blank.
pub fn required_text(value: Option<&CellValue>, field: &str) -> Result<String> {
    text(value)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("{field} is required")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Response envelope. Outcome is carried by `status`, never by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<InspectionRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Response {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: Some(message.into()),
            data: None,
            image_url: None,
        }
    }

    pub const fn records(data: Vec<InspectionRecord>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: None,
            data: Some(data),
            image_url: None,
        }
    }

    pub fn error(error: &Error) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: Some(error.to_string()),
            data: None,
            image_url: None,
        }
    }

    #[must_use]
    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}
