//! Vault service binary
//!
//! Builds the market from configuration, opens the journal, and serves
//! `/metrics` and `/health` over axum until interrupted.

use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use vault_core::{router, spawn_market_actor, Config, HttpState, Journal, Metrics};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "Starting vault service"
    );

    let now = u64::try_from(chrono::Utc::now().timestamp())?;
    let (mut market, _oracles) = config
        .build_market(now)
        .context("Failed to build market")?;

    let journal = Arc::new(Journal::open(&config).context("Failed to open journal")?);
    if let Some(latest) = journal.latest_sequence()? {
        market.set_next_sequence(latest + 1);
        tracing::info!(next_sequence = latest + 1, "Resuming event sequence");
    }

    let metrics = Metrics::new()?;
    let handle = spawn_market_actor(market, Some(journal), metrics.clone(), &config.batching);

    let app = router(HttpState {
        metrics,
        service: config.service_name.clone(),
        version: config.service_version.clone(),
    });
    let listener = TcpListener::bind(&config.metrics_listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.metrics_listen_addr))?;
    tracing::info!(addr = %config.metrics_listen_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("HTTP server failed")?;

    tracing::info!("Shutting down vault service");
    handle.shutdown().await?;
    Ok(())
}
