//! In-memory row and blob stores for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{build_object_key, BlobStore, BlobUpload, CellWrite, RowStore, StoredBlob};
use crate::error::{Error, Result};
use crate::models::{CellValue, Fidelity, Row};
use crate::schema::SchemaVersion;

#[derive(Default)]
struct Table {
    rows: Vec<Row>,
    tag: Option<SchemaVersion>,
}

/// Row store backed by a `Vec` behind a mutex.
#[derive(Default)]
pub struct MemoryRowStore {
    table: Mutex<Table>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing rows (header first) and no schema tag.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            table: Mutex::new(Table { rows, tag: None }),
        }
    }

    fn table(&self) -> Result<MutexGuard<'_, Table>> {
        self.table
            .lock()
            .map_err(|_| Error::Storage("memory row store lock poisoned".to_string()))
    }
}

impl RowStore for MemoryRowStore {
    fn append_row(&self, row: Row) -> Result<usize> {
        let mut table = self.table()?;
        table.rows.push(row);
        Ok(table.rows.len() - 1)
    }

    fn read_rows(&self, fidelity: Fidelity) -> Result<Vec<Row>> {
        let table = self.table()?;
        Ok(match fidelity {
            Fidelity::Raw => table.rows.clone(),
            Fidelity::Display => table
                .rows
                .iter()
                .map(|row| row.iter().map(CellValue::to_display).collect())
                .collect(),
        })
    }

    fn write_cells(&self, writes: &[CellWrite]) -> Result<()> {
        let mut table = self.table()?;
        if let Some(missing) = writes.iter().find(|write| write.row >= table.rows.len()) {
            return Err(Error::Storage(format!("row {} does not exist", missing.row)));
        }

        for write in writes {
            let cells = &mut table.rows[write.row];
            if cells.len() <= write.column {
                cells.resize(write.column + 1, CellValue::empty());
            }
            cells[write.column] = write.value.clone();
        }
        Ok(())
    }

    fn schema_tag(&self) -> Result<Option<SchemaVersion>> {
        Ok(self.table()?.tag)
    }

    fn set_schema_tag(&self, version: SchemaVersion) -> Result<()> {
        self.table()?.tag = Some(version);
        Ok(())
    }
}

/// A blob kept by [`MemoryBlobStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Blob store that keeps objects in a map and serves them under `base_url`.
pub struct MemoryBlobStore {
    base_url: String,
    objects: Mutex<BTreeMap<String, MemoryObject>>,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map_or(0, |objects| objects.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn object(&self, key: &str) -> Option<MemoryObject> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
    }

    fn objects(&self) -> Result<MutexGuard<'_, BTreeMap<String, MemoryObject>>> {
        self.objects
            .lock()
            .map_err(|_| Error::Storage("memory blob store lock poisoned".to_string()))
    }
}

impl BlobStore for MemoryBlobStore {
    async fn put_public(&self, upload: BlobUpload) -> Result<StoredBlob> {
        let key = build_object_key(&upload.container, &upload.file_name)?;
        self.objects()?.insert(
            key.clone(),
            MemoryObject {
                content_type: upload.content_type,
                bytes: upload.bytes,
            },
        );
        let url = format!("{}/{key}", self.base_url);
        Ok(StoredBlob { key, url })
    }

    async fn delete(&self, blob: &StoredBlob) -> Result<()> {
        self.objects()?
            .remove(&blob.key)
            .map(|_| ())
            .ok_or_else(|| Error::Storage(format!("blob {} does not exist", blob.key)))
    }
}
