//! Movie Master worker host entry point.
//!
//! Opens the shared database, installs the configured worker and serves the
//! tools on stdio. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use moviemaster_client::{FetchClient, FetchConfig, WorkerConfig};
use moviemaster_core::{AppConfig, Db};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(db = %config.db_path.display(), version = %config.cache_version, "starting moviemaster-sw on stdio transport");

    let db = Db::open(&config.db_path)
        .await
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker_config = WorkerConfig::from_app_config(&config)?;
    let state = Arc::new(state::AppState::new(config, db, fetcher));

    // Pages stay uncontrolled until a later sw_update succeeds.
    if let Err(e) = state.registration.update(worker_config).await {
        tracing::warn!(error = %e, "initial worker install failed");
    }

    let handler = handler::MovieMasterServer::new(state);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
