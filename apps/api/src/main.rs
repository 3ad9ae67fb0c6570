mod config;
mod db;
mod documents;
mod errors;
mod models;
mod pagination;
mod routes;
mod state;
mod storage;

use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StoreBackend};
use crate::db::create_pool;
use crate::pagination::Language;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{MemoryPageStore, PageStore, PgPageStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pagebound API v{}", env!("CARGO_PKG_VERSION"));

    // Reject settings that could never paginate, before accepting traffic
    let profile = Language::select(&config.default_language).profile();
    config
        .pagination
        .validate(profile.measure(profile.continuation_glyph()))
        .map_err(|e| anyhow!(e))
        .context("Invalid pagination settings")?;
    info!(
        line_width = config.pagination.line_width,
        page_length = config.pagination.page_length,
        early_cutoff = config.pagination.early_cutoff,
        batch_size = config.pagination.batch_size,
        "Pagination settings loaded"
    );

    let store: Arc<dyn PageStore> = match config.page_store {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres page store")?;
            let pool = create_pool(url).await?;
            info!("PostgreSQL page store initialized");
            Arc::new(PgPageStore::new(pool))
        }
        StoreBackend::Memory => {
            info!("In-memory page store initialized; pages are lost on restart");
            Arc::new(MemoryPageStore::new())
        }
    };

    let state = AppState {
        store,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
