//! whiteboard-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use whiteboard_gateway::api;
use whiteboard_gateway::app_state::AppState;
use whiteboard_gateway::config::GatewayConfig;
use whiteboard_gateway::persistence::{
    self, HistoryStore, MemoryHistoryStore, MemoryRoomStore, PostgresHistoryStore,
    PostgresRoomStore, RoomStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config = GatewayConfig::from_env().context("invalid LISTEN_ADDR")?;
    tracing::info!(
        addr = %config.listen_addr,
        persistence = config.persistence_enabled,
        policy = %config.join_approval_policy,
        "starting whiteboard-gateway"
    );

    // Build persistence layer
    let (rooms, histories): (Arc<dyn RoomStore>, Arc<dyn HistoryStore>) =
        if config.persistence_enabled {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .min_connections(config.database_min_connections)
                .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
                .connect(&config.database_url)
                .await
                .context("connecting to PostgreSQL")?;
            persistence::postgres::migrate(&pool)
                .await
                .context("running migrations")?;
            tracing::info!("postgres persistence ready");
            (
                Arc::new(PostgresRoomStore::new(pool.clone())) as Arc<dyn RoomStore>,
                Arc::new(PostgresHistoryStore::new(pool)) as Arc<dyn HistoryStore>,
            )
        } else {
            tracing::warn!("persistence disabled; rooms and histories live in memory only");
            (
                Arc::new(MemoryRoomStore::new()) as Arc<dyn RoomStore>,
                Arc::new(MemoryHistoryStore::new()) as Arc<dyn HistoryStore>,
            )
        };

    // Build application
    let listen_addr = config.listen_addr;
    let app = api::build_app(AppState::new(config, rooms, histories));

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler failed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
