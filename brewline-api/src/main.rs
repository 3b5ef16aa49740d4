use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use brewline_api::{app, AppState};
use brewline_store::{app_config::Config, DbClient, RedisClient, StoreOrderRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brewline_api=debug,brewline_order=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Brewline API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let redis = RedisClient::new(&config.redis.url, &config.redis.key_prefix)
        .context("Invalid Redis URL")?;

    let state = AppState::new(
        Arc::new(StoreOrderRepository::new(db.pool.clone())),
        Arc::new(redis),
        &config,
    )
    .context("Failed to register metrics")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
