use anyhow::Result;
use blob_gateway::{
    config::{AppConfig, Backend},
    services::{
        blob_store::BlobStore,
        disk_store::DiskBlobStore,
        listing_cache::{CacheCoordinator, MemoryListingCache},
        memory_store::MemoryBlobStore,
    },
    state::AppState,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting blob-gateway with config: {:?}", cfg);

    // --- Initialize blob store ---
    let store: Arc<dyn BlobStore> = match cfg.backend {
        Backend::Disk => {
            let disk = open_disk_store(&cfg).await?;
            disk.migrate().await?;
            if migrate {
                tracing::info!("Database migration complete.");
                return Ok(()); // exit after migration
            }
            Arc::new(disk)
        }
        Backend::Memory => {
            if migrate {
                tracing::warn!("Nothing to migrate for the memory backend.");
                return Ok(());
            }
            Arc::new(MemoryBlobStore::new())
        }
    };

    // --- Listing cache ---
    let cache = CacheCoordinator::new(
        Arc::new(MemoryListingCache::new()),
        cfg.cache_ttl,
        cfg.listing_cache,
    );
    let state = AppState::new(store, cache.clone());

    // --- Build router ---
    let app = blob_gateway::app(&cfg, state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Waiting for pending cache invalidations");
    cache.wait_idle().await;
    Ok(())
}

/// Create the storage directories and connect to the metadata database.
async fn open_disk_store(cfg: &AppConfig) -> Result<DiskBlobStore> {
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    let db_url = &cfg.database_url;
    tracing::debug!("Connecting using raw URL => {}", db_url);

    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(DiskBlobStore::new(Arc::new(db), cfg.storage_dir.clone()))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received termination signal, shutting down");
}
