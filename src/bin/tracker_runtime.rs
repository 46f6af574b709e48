//! Tracker Runtime - ingest, retention and HTTP API in one process
//!
//! Usage:
//!   cargo run --release --bin tracker_runtime
//!
//! Environment variables (see `TrackerConfig::from_env`):
//!   LEADERBOARD_DB_PATH - SQLite database path (default: leaderboard.db)
//!   HOST / PORT - HTTP listen address (default: 0.0.0.0:8080)
//!   UPSTREAM_URL - leaderboard endpoint
//!   INGEST_INTERVAL_SECS / RETENTION_INTERVAL_SECS - job cadences

use dotenv::dotenv;
use leaderboard_tracker::api::{create_router, AppState};
use leaderboard_tracker::pipeline::{
    config::TrackerConfig,
    db::SqliteAppendLog,
    fetcher::HttpSnapshotFetcher,
    ingestion::IngestJob,
    query::QueryEngine,
    retention::RetentionJob,
};
use log::{error, info};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize environment and logging
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 Leaderboard Tracker Runtime");

    let config = TrackerConfig::from_env();
    info!("   ├─ Database: {}", config.db_path);
    info!("   ├─ Upstream: {}", config.upstream_url);
    info!("   ├─ Ingest interval: {:?} (backoff {:?})", config.ingest_interval, config.ingest_backoff);
    info!("   ├─ Retention: every {:?}, horizon {:?}", config.retention_interval, config.retention_horizon);
    info!("   └─ Listen: {}", config.listen_addr());

    // Nothing works without the store, so this is the one fatal failure
    info!("🔧 Initializing database...");
    let store = match SqliteAppendLog::new(&config.db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("❌ Failed to open database {}: {}", config.db_path, e);
            return Err(e.into());
        }
    };
    info!("✅ Database initialized ({} snapshots retained)", store.snapshot_count()?);

    let fetcher = Arc::new(HttpSnapshotFetcher::new(
        config.upstream_url.clone(),
        config.fetch_timeout,
    )?);

    let shutdown = CancellationToken::new();

    info!("🚀 Spawning background tasks...");
    let ingest = IngestJob::new(fetcher, store.clone())
        .with_interval(config.ingest_interval)
        .with_backoff(config.ingest_backoff);
    let ingest_handle = tokio::spawn(ingest.run(shutdown.clone()));
    info!("   ├─ ✅ Ingest task spawned");

    let retention = RetentionJob::new(store.clone())
        .with_interval(config.retention_interval)
        .with_horizon(config.retention_horizon);
    let retention_handle = tokio::spawn(retention.run(shutdown.clone()));
    info!("   └─ ✅ Retention task spawned");

    let state = AppState::new(Arc::new(QueryEngine::new(store)));
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr()).await?;
    info!("📡 Listening on {}", listener.local_addr()?);
    info!("🔄 Press CTRL+C to shutdown gracefully");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown.clone()))
        .await?;

    // The server can also stop on its own; make sure the jobs follow
    shutdown.cancel();
    for handle in [ingest_handle, retention_handle] {
        if let Err(e) = handle.await {
            error!("❌ Background task failed: {}", e);
        }
    }

    info!("✅ Tracker runtime stopped");
    Ok(())
}

async fn wait_for_shutdown(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
        Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
    }
    shutdown.cancel();
}
