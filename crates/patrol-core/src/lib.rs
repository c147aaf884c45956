//! patrol-core - Core library for Patrol
//!
//! This crate holds the inspection record model, the versioned row codec,
//! the matcher and mutation engine used by the review path, and the request
//! dispatcher shared by the HTTP service and the CLI.

pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod matcher;
pub mod models;
pub mod mutation;
pub mod protocol;
pub mod schema;
pub mod storage;
pub mod timestamp;
pub mod util;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{Error, ErrorKind, Result};
pub use models::{CellValue, Fidelity, InspectionRecord, Row};
pub use protocol::{Action, InboundRequest, Response, ResponseStatus};
pub use schema::SchemaVersion;
