// src/bin/relay_server.rs
//! Log relay and transcription proxy

use std::net::SocketAddr;

use anyhow::{Context, Result};
use journal_vault::http::{router, AppState};
use journal_vault::logging;
use tracing::{info, warn};

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = journal_vault::load_config().context("failed to load configuration")?;
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid server.bind {:?}", config.server.bind))?;
    if config.server.transcription_api_key.is_none() {
        warn!("no transcription API key configured; /transcribe will answer 500");
    }

    let app = router(AppState::from_config(&config.server));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!(%addr, "relay listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
