//! hostgrade server entry point.
//!
//! Boots the HTTP API over the SQLite record store and the three upstream
//! clients. Logs are JSON on stderr, filtered by `RUST_LOG`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use hostgrade_client::{HttpConfig, PageClient, SslLabsClient, WhoisClient};
use hostgrade_core::{AppConfig, HostDb, PollPolicy, RefreshOrchestrator, Upstreams};

mod error;
mod handler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let whois_api_key = config.require_whois_api_key()?.to_string();

    let db = HostDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;

    let http = HttpConfig::from(&config);
    let upstreams = Upstreams {
        analyzer: Arc::new(SslLabsClient::new(&config.ssl_labs_url, &http)?),
        registrants: Arc::new(WhoisClient::new(&config.whois_url, whois_api_key, &http)?),
        pages: Arc::new(PageClient::new(&http, config.max_page_bytes)?),
    };
    let policy = PollPolicy { interval: config.poll_interval(), budget: config.poll_budget() };

    let state = handler::AppState { orchestrator: Arc::new(RefreshOrchestrator::new(db, upstreams, policy)) };
    let app = handler::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        db_path = %config.db_path.display(),
        poll_interval_secs = config.poll_interval_secs,
        poll_budget_secs = config.poll_budget_secs,
        "starting hostgrade server"
    );

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
