//! Fides trust graph service — entry point.

mod api;
mod breaker;
mod config;
mod engine;
mod error;
mod identity_cache;
mod state;
mod store;

use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use fides_discovery::RegistryClient;

use config::TrustConfig;
use engine::TrustEngine;
use state::AppState;
use store::TrustStore;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fides_trust_node=info,tower_http=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let config = TrustConfig::from_env()?;
    tracing::info!(
        port = config.port,
        registry = %config.discovery_url,
        env = %config.node_env,
        "starting trust graph service"
    );

    let store = TrustStore::connect(&config).await?;
    let registry = RegistryClient::new(&config.discovery_url)?;
    let engine = TrustEngine::new(store.clone(), registry);

    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(origin.parse::<HeaderValue>()?),
        None => CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(Any),
    };

    let state = Arc::new(AppState::new(engine, config.clone()));
    let app = api::build_router(Arc::clone(&state)).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "trust graph service listening");

    let (drain_tx, drain_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                drain_rx.await.ok();
            })
            .await
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("received shutdown signal, draining in-flight requests");
    state.begin_shutdown();
    let _ = drain_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server).await {
        Ok(result) => result??,
        Err(_) => tracing::warn!("drain timed out, closing anyway"),
    }

    state.engine.reset_caches();
    store.close().await;
    tracing::info!("trust graph service exited cleanly");
    Ok(())
}
