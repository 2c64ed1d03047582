//! Fides identity registry — entry point.

mod api;
mod config;
mod state;
mod store;

use axum::http::HeaderValue;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use fides_crypto::KeyPair;
use fides_discovery::DiscoveryDocument;
use fides_identity::Did;

use config::RegistryConfig;
use state::AppState;
use store::IdentityStore;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fides_registry_node=info,tower_http=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let config = RegistryConfig::from_env()?;
    tracing::info!(port = config.port, env = %config.node_env, "starting identity registry");

    let store = IdentityStore::connect(&config).await?;

    // The registry's own identity, served from the well-known endpoint.
    let service_key = KeyPair::generate();
    let service_did = Did::from_public_key(&service_key.public_key());
    let document = DiscoveryDocument {
        did: service_did.to_string(),
        public_key: service_key.public_key().to_hex(),
        service: Some("fides-identity-registry".into()),
        updated_at: Utc::now(),
    };
    tracing::info!(did = %service_did, "service identity minted");

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

    let state = Arc::new(AppState::new(store.clone(), config.clone(), document));
    let app = api::build_router(Arc::clone(&state)).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "identity registry listening");

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

    store.close().await;
    tracing::info!("identity registry exited cleanly");
    Ok(())
}
