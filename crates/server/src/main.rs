//! swcache server entry point.
//!
//! Boots the caching worker (install, then activate) and serves it over the
//! MCP stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig, ServiceWorker};
use swcache_core::{AppConfig, CacheDb, CacheStore};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

const STDIO_SESSION: &str = "stdio";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        origin = %config.origin,
        version = %config.version,
        db = %config.db_path.display(),
        "starting swcache"
    );

    let store: Arc<dyn CacheStore> = Arc::new(CacheDb::open(&config.db_path).await?);
    let network = FetchClient::new(FetchConfig::from_app(&config)?)?;
    let worker = Arc::new(ServiceWorker::new(&config, Arc::clone(&store), Arc::new(network))?);

    // The stdio session is itself a consumer; activation claims it.
    worker.clients().connect(STDIO_SESSION, None);

    let (installed, activated) = worker.install_and_activate().await?;
    if !installed.is_complete() {
        tracing::warn!(
            failed = installed.failed.len(),
            offline = ?installed.offline_source,
            "static shell installed partially"
        );
    }
    tracing::info!(
        cache = %installed.generation,
        cached = installed.cached.len(),
        deleted = activated.deleted.len(),
        claimed = activated.claimed,
        "worker active"
    );

    let handler = handler::SwCacheServer::new(Arc::clone(&worker), store);
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    worker.clients().disconnect(STDIO_SESSION);
    worker.tasks().drain().await;

    Ok(())
}
