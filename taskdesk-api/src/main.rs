//! # Taskdesk API Server
//!
//! HTTP API for Taskdesk: authentication, user management, and task CRUD
//! with a Redis read-through cache in front of PostgreSQL.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskdesk-api
//! ```

use std::net::SocketAddr;

use taskdesk_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskdesk_shared::{
    cache::{
        client::{RedisClient, RedisConfig},
        task_cache::TaskCache,
    },
    db,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdesk_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Taskdesk API v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = db::pool::create_pool(db::pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    db::migrations::run_migrations(&pool).await?;

    let redis = RedisClient::new(RedisConfig {
        url: config.cache.redis_url.clone(),
        command_timeout_secs: 5,
    })
    .await?;
    let cache = TaskCache::with_ttl(redis, config.cache.ttl_secs);

    let bind_address = config.bind_address();
    let state = AppState::new(pool.clone(), cache, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    db::pool::close_pool(pool).await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
