//! alerta-gateway server entry point.
//!
//! Starts the Axum HTTP server with the realtime WebSocket endpoint,
//! wires the fan-out loop to the change stream, and spawns the
//! registry janitor that reclaims expired subscriptions.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use alerta_gateway::api;
use alerta_gateway::app_state::AppState;
use alerta_gateway::auth::TokenService;
use alerta_gateway::config::GatewayConfig;
use alerta_gateway::domain::ChangeStream;
use alerta_gateway::gateway::{ChannelGateway, ChannelHub};
use alerta_gateway::registry::{MemorySubscriptionStore, SubscriptionRegistry, SubscriptionStore};
use alerta_gateway::service::{ConnectionService, FanoutEngine};
use alerta_gateway::store::{
    MemoryStateStore, MemoryUserDirectory, MemoryWorkStore, StateStore, UserDirectory,
    WorkStateStore,
};
use alerta_gateway::ws::handler::ws_handler;

/// How often the registry janitor reclaims expired subscriptions.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration; unresolved push-endpoint coordinates are fatal.
    let config = GatewayConfig::from_env()?;
    tracing::info!(
        addr = %config.listen_addr,
        endpoint = %config.push_endpoint(),
        tabla_conexiones = %config.tabla_conexiones,
        "starting alerta-gateway"
    );

    // Build domain layer
    let stream = ChangeStream::new(config.change_stream_capacity);
    let store = Arc::new(MemorySubscriptionStore::new());
    let registry = SubscriptionRegistry::new(Arc::clone(&store) as Arc<dyn SubscriptionStore>);
    let hub = Arc::new(ChannelHub::new(config.push_endpoint(), config.send_deadline()));

    // External collaborators (in-memory stand-ins)
    let tokens = TokenService::from_secret(config.token_secret.clone());
    let estados = Arc::new(MemoryStateStore::new(
        config.tabla_estados.clone(),
        stream.clone(),
    ));
    let trabajos = Arc::new(MemoryWorkStore::new());
    let usuarios: Arc<dyn UserDirectory> = Arc::new(MemoryUserDirectory::new());

    // Build service layer
    let connections = Arc::new(ConnectionService::new(
        tokens.clone(),
        registry.clone(),
        Arc::clone(&hub) as Arc<dyn ChannelGateway>,
        Arc::clone(&estados) as Arc<dyn StateStore>,
        Arc::clone(&trabajos) as Arc<dyn WorkStateStore>,
        config.channel_ttl(),
    ));

    // Fan-out loop consuming the change stream
    let engine = FanoutEngine::new(registry, Arc::clone(&hub) as Arc<dyn ChannelGateway>);
    let change_rx = stream.subscribe();
    tokio::spawn(async move { engine.run(change_rx).await });

    // Registry janitor
    let janitor_store = Arc::clone(&store);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = janitor_store.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "expired subscriptions reclaimed");
            }
        }
    });

    // Build application state
    let app_state = AppState {
        connections,
        hub,
        tokens,
        usuarios,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
