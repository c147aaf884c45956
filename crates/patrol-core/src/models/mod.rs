//! Data models for Patrol

mod cell;
mod record;

pub use cell::{CellValue, Fidelity, Row};
pub use record::{InspectionRecord, DEFAULT_STATUS};
