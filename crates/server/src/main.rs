mod bootstrap;
mod health;
mod ingress;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use slotbook_core::config::{AppConfig, LoadOptions, LogFormat};
use slotbook_slack::events::scheduling_dispatcher;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
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

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await
    .context("failed to start health endpoint")?;

    let picker_weeks =
        usize::try_from(app.config.scheduling.upcoming_weeks).unwrap_or(usize::MAX);
    let state = ingress::IngressState::new(
        app.verifier.clone(),
        scheduling_dispatcher(Arc::clone(&app.service), picker_weeks),
        Arc::new(ingress::HttpResponsePoster::new()?),
    );

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind slack ingress on {address}"))?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "slotbook-server accepting slack requests"
    );

    let shutdown = Arc::new(Notify::new());
    let server = tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        let serve = axum::serve(listener, ingress::router(state))
            .with_graceful_shutdown(async move { shutdown.notified().await });
        async move { serve.await }
    });

    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = app.config.server.graceful_shutdown_secs,
        "slotbook-server stopping"
    );
    shutdown.notify_one();

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined.context("ingress task panicked")??,
        Err(_) => tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            "in-flight requests did not finish within the grace period"
        ),
    }
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
