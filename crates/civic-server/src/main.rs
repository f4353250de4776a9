//! # civic-server
//!
//! HTTP backend for the civic issue platform.
//!
//! This binary provides:
//! - **Issue feed and CRUD** with anonymity masking and per-viewer
//!   aggregates (reactions, comment count, ownership)
//! - **Resolution workflow** endpoints: self resolution, external proposals
//!   and the author's accept / reject
//! - **Reactions** with single-slot toggle semantics
//! - **Comments**, flat or as a reply forest
//! - **Reports** counting issues per resolution state and category

mod api;
mod auth;
mod config;
mod db;
mod error;
mod facade;
mod requests;
mod workflow;

use civic_shared::constants::APP_NAME;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::db::Db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,civic_server=debug")),
        )
        .init();

    info!("Starting {} server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the database (runs migrations)
    // -----------------------------------------------------------------------
    let db_path = config.database_path.clone();
    let max_connections = config.db_max_connections;
    let db = tokio::task::spawn_blocking(move || Db::open(&db_path, max_connections)).await??;

    let http_addr = config.http_addr;
    let app_state = AppState::new(db, config);

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
