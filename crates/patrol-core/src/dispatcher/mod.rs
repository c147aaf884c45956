//! Request dispatcher.
//!
//! Routes each action to its handler while holding the request gate and turns
//! every outcome into a [`Response`]. This is the only place a handler
//! `Result` becomes an envelope.


use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::codec;
use crate::error::{Error, Result};
use crate::gate::{RequestGate, DEFAULT_LOCK_TIMEOUT};
use crate::matcher::{self, MatchKey};
use crate::models::{CellValue, Fidelity, InspectionRecord, DEFAULT_STATUS};
use crate::mutation::{self, RecordPatch};
use crate::protocol::{required_text, text, Action, InboundRequest, Response};
use crate::schema::{self, SchemaVersion, PART_NO_COLUMN};
use crate::storage::{BlobStore, BlobUpload, RowStore, StoredBlob};
use crate::util::{compact_text, normalize_text_option};

/// Photo file name used when a request does not provide one.
pub const DEFAULT_PHOTO_NAME: &str = "photo.jpg";

/// Container photos go to when a request has no `folder_id`.
pub const DEFAULT_CONTAINER: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Bounded wait for the request gate
    pub lock_timeout: Duration,
    pub default_container: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            default_container: DEFAULT_CONTAINER.to_string(),
        }
    }
}

pub struct Dispatcher<R, B> {
    rows: R,
    blobs: B,
    gate: RequestGate,
    config: DispatcherConfig,
}

impl<R: RowStore, B: BlobStore> Dispatcher<R, B> {
    /// Wrap the stores, preparing the table (header and schema tag) if needed.
    pub fn new(rows: R, blobs: B, config: DispatcherConfig) -> Result<Self> {
        let version = schema::ensure_table(&rows)?;
        tracing::info!(
            schema = %version,
            lock_timeout_secs = config.lock_timeout.as_secs(),
            "Dispatcher ready"
        );
        Ok(Self {
            rows,
            blobs,
            gate: RequestGate::new(config.lock_timeout),
            config,
        })
    }

    pub const fn rows(&self) -> &R {
        &self.rows
    }

    pub const fn blobs(&self) -> &B {
        &self.blobs
    }

    pub const fn gate(&self) -> &RequestGate {
        &self.gate
    }

    pub const fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Schema version currently in force for the table.
    pub fn schema_version(&self) -> Result<SchemaVersion> {
        if let Some(version) = self.rows.schema_tag()? {
            return Ok(version);
        }
        let rows = self.rows.read_rows(Fidelity::Raw)?;
        schema::resolve_version(&self.rows, &rows)
    }

    /// Handle a raw request body. Never fails; errors come back as an
    /// `Error` envelope.
    pub async fn handle_body(&self, body: &[u8]) -> Response {
        match InboundRequest::from_slice(body) {
            Ok(request) => self.handle(request).await,
            Err(error) => finish(None, Instant::now(), Err(error)),
        }
    }

    /// Handle a decoded request. Never fails; errors come back as an `Error`
    /// envelope.
    pub async fn handle(&self, request: InboundRequest) -> Response {
        let started = Instant::now();
        match request.action() {
            Ok(action) => {
                let outcome = self.dispatch(action, request).await;
                finish(Some(action), started, outcome)
            }
            Err(error) => finish(None, started, Err(error)),
        }
    }

    async fn dispatch(&self, action: Action, request: InboundRequest) -> Result<Response> {
        let guard = self.gate.acquire().await?;
        tracing::trace!(
            action = %action,
            waited_ms = millis(guard.waited()),
            "Request gate granted"
        );

        match action {
            Action::Upload => self.upload(request).await,
            Action::GetAllData => self.get_all_data(),
            Action::GetHistory => self.get_history(&request),
            Action::UpdateStatus => self.update_status(&request),
        }
    }

    async fn upload(&self, request: InboundRequest) -> Result<Response> {
        let version = self.schema_version()?;
        if version != SchemaVersion::LATEST {
            return Err(Error::SchemaMismatch(format!(
                "table uses the {version} layout, new records need {}",
                SchemaVersion::LATEST
            )));
        }

        let mut record = record_from_request(&request)?;
        let photo = self.photo_upload(&request)?;

        let stored = match photo {
            Some(upload) => {
                let blob = self.blobs.put_public(upload).await?;
                record.image_url.clone_from(&blob.url);
                Some(blob)
            }
            None => None,
        };

        match self.rows.append_row(codec::encode(&record)) {
            Ok(index) => {
                tracing::info!(
                    row = index,
                    part_no = %record.part_no,
                    photo = stored.is_some(),
                    "Appended inspection record"
                );
                Ok(Response::success("Data uploaded successfully").with_image_url(record.image_url))
            }
            Err(error) => {
                if let Some(blob) = stored {
                    self.discard_blob(&blob).await;
                }
                Err(error)
            }
        }
    }

    async fn discard_blob(&self, blob: &StoredBlob) {
        match self.blobs.delete(blob).await {
            Ok(()) => tracing::info!(key = %blob.key, "Removed photo after failed append"),
            Err(cleanup) => tracing::warn!(
                key = %blob.key,
                error = %cleanup,
                "Failed to remove orphaned photo after failed append"
            ),
        }
    }

    fn photo_upload(&self, request: &InboundRequest) -> Result<Option<BlobUpload>> {
        let Some(payload) = request.image_base64() else {
            return Ok(None);
        };

        let bytes = decode_photo(payload)?;
        let file_name = normalize_text_option(request.filename.clone())
            .unwrap_or_else(|| DEFAULT_PHOTO_NAME.to_string());
        let container = normalize_text_option(request.folder_id.clone())
            .unwrap_or_else(|| self.config.default_container.clone());

        Ok(Some(BlobUpload {
            container,
            content_type: content_type_for(&file_name).to_string(),
            file_name,
            bytes,
        }))
    }

    fn get_all_data(&self) -> Result<Response> {
        let rows = self.rows.read_rows(Fidelity::Display)?;
        let version = schema::resolve_version(&self.rows, &rows)?;
        let records = codec::decode_table(&rows, version)?;
        tracing::debug!(records = records.len(), schema = %version, "Read all records");
        Ok(Response::records(records))
    }

    fn get_history(&self, request: &InboundRequest) -> Result<Response> {
        let part_no = required_text(request.part_no.as_ref(), "part_no")?;
        let rows = self.rows.read_rows(Fidelity::Display)?;
        let version = schema::resolve_version(&self.rows, &rows)?;

        let records = rows
            .iter()
            .skip(1)
            .filter(|row| {
                row.get(PART_NO_COLUMN)
                    .is_some_and(|cell| cell.to_string() == part_no)
            })
            .map(|row| codec::decode(row, version))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(part_no = %part_no, records = records.len(), "Read part history");
        Ok(Response::records(records))
    }

    fn update_status(&self, request: &InboundRequest) -> Result<Response> {
        let patch = RecordPatch {
            change_point: text(request.change_point.as_ref()),
            status: text(request.status.as_ref()),
            manager_comment: text(request.manager_comment.as_ref()),
        };
        patch.ensure_not_empty()?;

        let timestamp = required_text(request.timestamp.as_ref(), "timestamp")?;
        let key = if request.apply_all() {
            MatchKey::batch(&timestamp)
        } else {
            let part_no = required_text(request.part_no.as_ref(), "part_no")?;
            MatchKey::single(&timestamp, part_no)
        };

        let rows = self.rows.read_rows(Fidelity::Display)?;
        let version = schema::resolve_version(&self.rows, &rows)?;
        let matched = matcher::find_matches(&rows, &key);
        if matched.is_empty() {
            return Err(Error::NotFound(key.to_string()));
        }

        let count = mutation::apply(&self.rows, version.layout(), &matched, &patch)?;
        tracing::info!(key = %key, rows = count, "Updated review fields");
        Ok(Response::success(format!("Updated {count} rows")))
    }
}

fn finish(action: Option<Action>, started: Instant, outcome: Result<Response>) -> Response {
    let action = action.map_or("-", Action::as_str);
    let elapsed_ms = millis(started.elapsed());
    match outcome {
        Ok(response) => {
            tracing::info!(action, elapsed_ms, "Request handled");
            response
        }
        Err(error) => {
            tracing::warn!(
                action,
                elapsed_ms,
                kind = error.kind().label(),
                error = %compact_text(&error.to_string()),
                "Request failed"
            );
            Response::error(&error)
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn record_from_request(request: &InboundRequest) -> Result<InspectionRecord> {
    let cell = |value: Option<&CellValue>| value.cloned().unwrap_or_default();
    let field = |value: Option<&CellValue>| text(value).unwrap_or_default();

    Ok(InspectionRecord {
        timestamp: required_text(request.timestamp.as_ref(), "timestamp")?,
        model: field(request.model.as_ref()),
        part_no: required_text(request.part_no.as_ref(), "part_no")?,
        part_name: Some(field(request.part_name.as_ref())),
        inspection_type: field(request.inspection_type.as_ref()),
        weight: cell(request.weight.as_ref()),
        length: cell(request.length.as_ref()),
        material_ok: cell(request.material_ok.as_ref()),
        change_point: field(request.change_point.as_ref()),
        action_taken: Some(field(request.action_taken.as_ref())),
        status: text(request.status.as_ref())
            .filter(|status| !status.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        manager_comment: String::new(),
        result: field(request.result.as_ref()),
        image_url: String::new(),
    })
}

/// Decode a base64 photo, with or without a `data:<mime>;base64,` prefix.
fn decode_photo(payload: &str) -> Result<Vec<u8>> {
    let encoded = if payload.starts_with("data:") {
        payload
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| Error::InvalidInput("image_base64 data URL has no payload".to_string()))?
    } else {
        payload
    };
    let compact: String = encoded
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|error| Error::InvalidInput(format!("image_base64 is not valid base64: {error}")))?;
    if bytes.is_empty() {
        return Err(Error::InvalidInput("image_base64 decodes to nothing".to_string()));
    }
    Ok(bytes)
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        _ => "image/jpeg",
    }
}
