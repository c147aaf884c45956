mod config;
mod error;
mod routes;

use config::AppConfig;
use patrol_core::storage::{R2BlobStore, SqliteRowStore};
use patrol_core::{Dispatcher, DispatcherConfig};
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("patrol_api=info".parse()?)
                .add_directive("patrol_core=info".parse()?),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Starting patrol-api with config: {:?}", config);

    let rows = SqliteRowStore::open(&config.db_path)?;
    let blobs = config.r2.clone().map(R2BlobStore::new);
    match &blobs {
        Some(store) => {
            if let Err(error) = store.bucket_is_reachable().await {
                tracing::warn!(error = %error, "R2 bucket is not reachable; photo uploads will fail");
            }
        }
        None => tracing::warn!("R2 is not configured; uploads with photos will be rejected"),
    }

    let dispatcher = Dispatcher::new(
        rows,
        blobs,
        DispatcherConfig {
            lock_timeout: config.lock_timeout,
            default_container: config.default_folder.clone(),
        },
    )?;
    let router = app_router(AppState::new(dispatcher), config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("patrol-api listening on {}", config.bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
