mod auth;
mod bootstrap;
mod error;
mod health;
mod priority;
mod requests;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use matreq_core::config::{AppConfig, LoadOptions};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use matreq_core::config::LogFormat::*;

    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let server_config = &app.config.server;
    let listener =
        tokio::net::TcpListener::bind((server_config.bind_address.as_str(), server_config.port))
            .await
            .with_context(|| {
                format!("failed to bind {}:{}", server_config.bind_address, server_config.port)
            })?;
    let address = listener.local_addr().context("listener has no local address")?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        address = %address,
        suggester = app.suggester.name(),
        "matreq-server listening"
    );

    let shutdown = Arc::new(Notify::new());
    let server = axum::serve(listener, app.router()).with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move { shutdown.notified().await }
    });
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        finished = &mut server => {
            finished.context("http server task panicked")?.context("http server failed")?;
            return Ok(());
        }
        _ = wait_for_shutdown() => {}
    }

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = grace.as_secs(),
        "matreq-server draining in-flight requests"
    );
    shutdown.notify_one();

    match tokio::time::timeout(grace, &mut server).await {
        Ok(finished) => {
            finished.context("http server task panicked")?.context("http server failed")?
        }
        Err(_) => {
            tracing::warn!(
                event_name = "system.server.shutdown_timeout",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "in-flight requests did not finish within the grace period"
            );
            server.abort();
        }
    }
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}
