//! Storage contracts and adapters for rows and photo blobs.
//!
//! The core never owns table state. Every handler works against a [`RowStore`]
//! and a [`BlobStore`] handed to the dispatcher, so tests and the CLI can swap
//! the `SQLite` and R2 backends for in-memory ones.

mod memory;
mod migrations;
mod r2;
mod sqlite;

use std::future::Future;

use chrono::Utc;
use uuid::Uuid;

pub use memory::{MemoryBlobStore, MemoryObject, MemoryRowStore};
pub use r2::{R2BlobStore, R2Config};
pub use sqlite::SqliteRowStore;

use crate::error::{Error, Result};
use crate::models::{CellValue, Fidelity, Row};
use crate::schema::SchemaVersion;
use crate::util::sanitize_file_name;

/// Tabular row persistence: append, full read, batched cell writes.
///
/// Row indices are zero-based and count the header, so the first data row is
/// index 1. Implementations must be safe to share across requests; the
/// dispatcher serializes every call through its request gate.
pub trait RowStore: Send + Sync {
    /// Append a row, returning its index.
    fn append_row(&self, row: Row) -> Result<usize>;

    /// Read every row, header included.
    fn read_rows(&self, fidelity: Fidelity) -> Result<Vec<Row>>;

    /// Apply a batch of cell writes atomically: either every write lands or
    /// none does. Writing past a row's width pads it with empty cells.
    fn write_cells(&self, writes: &[CellWrite]) -> Result<()>;

    /// Overwrite a single cell.
    fn write_cell(&self, row: usize, column: usize, value: CellValue) -> Result<()> {
        self.write_cells(&[CellWrite { row, column, value }])
    }

    /// Stored schema version tag, `None` for tables that predate tagging.
    fn schema_tag(&self) -> Result<Option<SchemaVersion>>;

    fn set_schema_tag(&self, version: SchemaVersion) -> Result<()>;
}

/// One cell assignment within a [`RowStore::write_cells`] batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CellWrite {
    pub row: usize,
    pub column: usize,
    pub value: CellValue,
}

/// A photo to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobUpload {
    /// Target container (folder) identifier
    pub container: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A persisted, publicly readable blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Backend object key, used for cleanup
    pub key: String,
    /// Stable public URL
    pub url: String,
}

/// Blob persistence for photo attachments.
pub trait BlobStore: Send + Sync {
    /// Store `upload`, make it publicly readable and return its URL.
    fn put_public(&self, upload: BlobUpload) -> impl Future<Output = Result<StoredBlob>> + Send;

    /// Remove a blob stored earlier by [`BlobStore::put_public`].
    fn delete(&self, blob: &StoredBlob) -> impl Future<Output = Result<()>> + Send;
}

/// An unconfigured blob store: requests without photos still work, requests
/// with photos fail.
impl<B: BlobStore> BlobStore for Option<B> {
    async fn put_public(&self, upload: BlobUpload) -> Result<StoredBlob> {
        match self {
            Some(store) => store.put_public(upload).await,
            None => Err(not_configured()),
        }
    }

    async fn delete(&self, blob: &StoredBlob) -> Result<()> {
        match self {
            Some(store) => store.delete(blob).await,
            None => Err(not_configured()),
        }
    }
}

fn not_configured() -> Error {
    Error::Storage("photo storage is not configured".to_string())
}

/// Object key for a photo: `<container>/<unix-ms>-<uuid v7>-<file name>`.
pub(crate) fn build_object_key(container: &str, file_name: &str) -> Result<String> {
    let container = normalize_container(container)?;
    let file_name = sanitize_file_name(file_name);
    let ts = Utc::now().timestamp_millis();
    let id = Uuid::now_v7();
    Ok(format!("{container}/{ts}-{id}-{file_name}"))
}

/// Container ids are opaque folder identifiers; keep their case and reduce
/// anything outside `[A-Za-z0-9_-]` to a dash.
fn normalize_container(container: &str) -> Result<String> {
    let trimmed = container.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("folder_id cannot be empty".to_string()));
    }
    if trimmed.contains("..") {
        return Err(Error::InvalidInput(
            "folder_id must not contain path traversal segments".to_string(),
        ));
    }
    Ok(trimmed
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                ch
            } else {
                '-'
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_keep_container_case() {
        let key = build_object_key("1AbC_d-9", "Front View.PNG").unwrap();
        assert!(key.starts_with("1AbC_d-9/"));
        assert!(key.ends_with("-front-view.png"));
    }

    #[test]
    fn object_keys_reject_bad_containers() {
        assert!(build_object_key("  ", "a.jpg").is_err());
        assert!(build_object_key("../etc", "a.jpg").is_err());
        assert!(build_object_key("a b/c", "a.jpg").unwrap().starts_with("a-b-c/"));
    }

    #[tokio::test]
    async fn missing_blob_store_rejects_photos() {
        let store: Option<MemoryBlobStore> = None;
        let err = store
            .put_public(BlobUpload {
                container: "root".to_string(),
                file_name: "a.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                bytes: vec![1, 2, 3],
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn configured_option_delegates() {
        let store = Some(MemoryBlobStore::new("https://cdn.test"));
        let blob = store
            .put_public(BlobUpload {
                container: "root".to_string(),
                file_name: "a.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                bytes: vec![1, 2, 3],
            })
            .await
            .unwrap();
        assert!(blob.url.starts_with("https://cdn.test/root/"));
        store.delete(&blob).await.unwrap();
    }
}
