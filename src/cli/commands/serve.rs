use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;

use crate::config;
use crate::database::{seed_demo, Database};
use crate::router::app;
use crate::state::AppState;

pub async fn handle(port: Option<u16>, no_seed: bool) -> anyhow::Result<()> {
    let mut config = config::config().clone();
    if let Some(port) = port {
        config.api.port = port;
    }
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }
    info!("Starting Kinder API in {:?} mode", config.environment);

    let db = Database::in_memory();
    db.open().await?;
    if !no_seed {
        seed_demo(&db).await.context("failed to seed demo data")?;
    }

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.api.port));
    let state = AppState::new(config, db);
    let router = app(state.clone());

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Kinder API listening on http://{}", bind_addr);

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    state.db.close().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
