//! Error types for patrol-core

use std::time::Duration;

use thiserror::Error;

/// Result type alias using patrol-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in patrol-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Request body could not be parsed
    #[error("Malformed request: {0}")]
    Parse(String),

    /// Request parsed but a field is missing or unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The request gate was not granted within the bounded wait
    #[error("Timed out after {}s waiting for the request lock", .0.as_secs())]
    LockTimeout(Duration),

    /// No row matched the update key
    #[error("No matching record: {0}")]
    NotFound(String),

    /// Row width or stored tag disagrees with the expected layout
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// `SQLite` row store error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Row or blob store adapter error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`], used for logging and by callers that
/// need to branch on the failure class without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    InvalidInput,
    LockTimeout,
    NotFound,
    Schema,
    Adapter,
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::Parse,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::LockTimeout(_) => ErrorKind::LockTimeout,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::SchemaMismatch(_) => ErrorKind::Schema,
            Self::Database(_) | Self::Storage(_) | Self::Serialization(_) | Self::Io(_) => {
                ErrorKind::Adapter
            }
        }
    }
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::InvalidInput => "invalid_input",
            Self::LockTimeout => "lock_timeout",
            Self::NotFound => "not_found",
            Self::Schema => "schema",
            Self::Adapter => "adapter",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_timeout_message_reports_seconds() {
        let error = Error::LockTimeout(Duration::from_secs(10));
        assert_eq!(
            error.to_string(),
            "Timed out after 10s waiting for the request lock"
        );
        assert_eq!(error.kind(), ErrorKind::LockTimeout);
    }

    #[test]
    fn adapter_failures_share_a_kind() {
        assert_eq!(Error::Storage("down".into()).kind(), ErrorKind::Adapter);
        let io = Error::Io(std::io::Error::other("disk"));
        assert_eq!(io.kind(), ErrorKind::Adapter);
        assert_eq!(io.kind().label(), "adapter");
    }
}
