use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use patrol_core::gate::GateMetricsSnapshot;
use patrol_core::storage::{BlobStore, RowStore};
use patrol_core::{Dispatcher, Error, Response};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tokio::runtime::Handle;
use tower_http::trace::TraceLayer;

use crate::error::AppError;

pub struct AppState<R, B> {
    dispatcher: Arc<Dispatcher<R, B>>,
}

impl<R, B> AppState<R, B> {
    pub fn new(dispatcher: Dispatcher<R, B>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

impl<R, B> Clone for AppState<R, B> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

pub fn app_router<R, B>(state: AppState<R, B>, max_body_bytes: usize) -> Router
where
    R: RowStore + 'static,
    B: BlobStore + 'static,
{
    Router::new()
        .route("/", post(exec::<R, B>))
        .route("/exec", post(exec::<R, B>))
        .route("/healthz", get(healthz::<R, B>))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

/// The intake endpoint. Always answers 200; the outcome is in the envelope,
/// including bodies that could not be read.
///
/// Row stores block, so each request runs on the blocking pool rather than
/// on an async worker.
async fn exec<R, B>(
    State(state): State<AppState<R, B>>,
    body: Result<Bytes, BytesRejection>,
) -> Json<Response>
where
    R: RowStore + 'static,
    B: BlobStore + 'static,
{
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let error = Error::Parse(rejection.body_text());
            tracing::warn!(error = %error, "Rejected request body");
            return Json(Response::error(&error));
        }
    };

    let dispatcher = Arc::clone(&state.dispatcher);
    let runtime = Handle::current();
    let handled =
        tokio::task::spawn_blocking(move || runtime.block_on(dispatcher.handle_body(&body))).await;

    match handled {
        Ok(response) => Json(response),
        Err(join_error) => {
            let error = Error::Storage(format!("request handler stopped: {join_error}"));
            tracing::error!(error = %error, "Request task failed");
            Json(Response::error(&error))
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    schema_version: u32,
    gate: GateMetricsSnapshot,
}

async fn healthz<R, B>(State(state): State<AppState<R, B>>) -> Result<Json<HealthResponse>, AppError>
where
    R: RowStore + 'static,
    B: BlobStore + 'static,
{
    let version = state.dispatcher.schema_version()?;
    Ok(Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        schema_version: version.tag(),
        gate: state.dispatcher.gate().metrics_snapshot(),
    }))
}

#[cfg(test)]
mod tests {
    use patrol_core::storage::{MemoryBlobStore, MemoryRowStore};
    use patrol_core::{DispatcherConfig, ResponseStatus};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn state() -> AppState<MemoryRowStore, MemoryBlobStore> {
        let dispatcher = Dispatcher::new(
            MemoryRowStore::new(),
            MemoryBlobStore::new("https://cdn.test"),
            DispatcherConfig::default(),
        )
        .unwrap();
        AppState::new(dispatcher)
    }

    async fn post_json(
        state: &AppState<MemoryRowStore, MemoryBlobStore>,
        body: &serde_json::Value,
    ) -> Response {
        let Json(response) = exec(State(state.clone()), Ok(Bytes::from(body.to_string()))).await;
        response
    }

    #[tokio::test]
    async fn exec_round_trips_upload_and_read() {
        let state = state();
        let response = post_json(
            &state,
            &json!({"timestamp": "2025-03-07 08:00:00", "part_no": "A1", "result": "OK"}),
        )
        .await;
        assert!(response.is_success());

        let response = post_json(&state, &json!({"action": "get_all_data"})).await;
        let records = response.data.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].part_no, "A1");
    }

    #[tokio::test]
    async fn malformed_body_is_an_error_envelope() {
        let state = state();
        let Json(response) = exec(State(state), Ok(Bytes::from_static(b"{oops"))).await;
        assert_eq!(response.status, ResponseStatus::Error);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], json!("Error"));
        assert!(value.get("data").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_requests_are_all_recorded() {
        let state = state();
        let bodies = (0..8).map(|index| {
            json!({"timestamp": "2025-03-07 08:00:00", "part_no": format!("P{index}")})
        });
        let handles: Vec<_> = bodies
            .map(|body| {
                let state = state.clone();
                tokio::spawn(async move { post_json(&state, &body).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_success());
        }

        let response = post_json(&state, &json!({"action": "get_all_data"})).await;
        assert_eq!(response.data.map(|records| records.len()), Some(8));
    }

    #[tokio::test]
    async fn healthz_reports_schema_version() {
        let Json(health) = healthz(State(state())).await.unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.schema_version, 5);
        assert_eq!(health.gate.timed_out, 0);
    }

    #[test]
    fn router_builds_with_memory_stores() {
        let _router = app_router(state(), 1024);
    }
}
