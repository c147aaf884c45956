//! `SQLite`-backed row store
//!
//! Each sheet row is one `sheet_rows` record holding its cells as a JSON array,
//! so raw cell types (text, number, boolean) survive a round trip.
//!
//! Several processes may share one database file, each with its own request
//! gate. Writes therefore take the write lock up front (`BEGIN IMMEDIATE`),
//! which lets the busy timeout queue them, and a batch of cell writes commits
//! as one transaction.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use super::{migrations, CellWrite, RowStore};
use crate::error::{Error, Result};
use crate::models::{CellValue, Fidelity, Row};
use crate::schema::SchemaVersion;

const SCHEMA_TAG_KEY: &str = "schema_version";

pub struct SqliteRowStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteRowStore {
    /// Open (or create) a row store at `path` and run pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        migrations::run(&mut conn)?;
        tracing::debug!(path = %path.display(), "Opened SQLite row store");

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory row store (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("SQLite row store lock poisoned".to_string()))
    }
}

impl RowStore for SqliteRowStore {
    fn append_row(&self, row: Row) -> Result<usize> {
        let cells = serde_json::to_string(&row)?;
        let mut conn = self.conn()?;
        let tx = write_transaction(&mut conn)?;
        let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(row_index) + 1, 0) FROM sheet_rows",
            [],
            |r| r.get(0),
        )?;
        tx.execute(
            "INSERT INTO sheet_rows (row_index, cells) VALUES (?, ?)",
            params![next, cells],
        )?;
        tx.commit()?;
        to_usize(next)
    }

    fn read_rows(&self, fidelity: Fidelity) -> Result<Vec<Row>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT cells FROM sheet_rows ORDER BY row_index")?;
        let encoded = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        encoded
            .iter()
            .map(|cells| {
                let row: Row = serde_json::from_str(cells)?;
                Ok(match fidelity {
                    Fidelity::Raw => row,
                    Fidelity::Display => row.iter().map(CellValue::to_display).collect(),
                })
            })
            .collect()
    }

    fn write_cells(&self, writes: &[CellWrite]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = write_transaction(&mut conn)?;

        let mut touched: BTreeMap<usize, Row> = BTreeMap::new();
        for write in writes {
            let cells = match touched.entry(write.row) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(load_row(&tx, write.row)?),
            };
            if cells.len() <= write.column {
                cells.resize(write.column + 1, CellValue::empty());
            }
            cells[write.column] = write.value.clone();
        }

        for (row, cells) in &touched {
            tx.execute(
                "UPDATE sheet_rows SET cells = ? WHERE row_index = ?",
                params![serde_json::to_string(cells)?, to_i64(*row)?],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn schema_tag(&self) -> Result<Option<SchemaVersion>> {
        let conn = self.conn()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM sheet_meta WHERE key = ?",
                params![SCHEMA_TAG_KEY],
                |r| r.get(0),
            )
            .optional()?;

        value
            .map(|raw| {
                raw.trim()
                    .parse::<u32>()
                    .map_err(|_| {
                        Error::SchemaMismatch(format!("stored schema tag {raw:?} is not a number"))
                    })
                    .and_then(SchemaVersion::from_tag)
            })
            .transpose()
    }

    fn set_schema_tag(&self, version: SchemaVersion) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sheet_meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![SCHEMA_TAG_KEY, version.tag().to_string()],
        )?;
        Ok(())
    }
}

fn write_transaction(conn: &mut Connection) -> Result<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

fn load_row(tx: &Transaction<'_>, row: usize) -> Result<Row> {
    let encoded: Option<String> = tx
        .query_row(
            "SELECT cells FROM sheet_rows WHERE row_index = ?",
            params![to_i64(row)?],
            |r| r.get(0),
        )
        .optional()?;
    let Some(encoded) = encoded else {
        return Err(Error::Storage(format!("row {row} does not exist")));
    };
    Ok(serde_json::from_str(&encoded)?)
}

fn to_i64(index: usize) -> Result<i64> {
    i64::try_from(index).map_err(|_| Error::Storage(format!("row index {index} out of range")))
}

fn to_usize(index: i64) -> Result<usize> {
    usize::try_from(index).map_err(|_| Error::Storage(format!("row index {index} out of range")))
}
