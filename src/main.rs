use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use storefront_api::app::build_router;
use storefront_api::config::AppConfig;
use storefront_api::email::HttpMailer;
use storefront_api::state::AppState;
use storefront_api::storage::S3Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    let storage = Arc::new(S3Storage::from_config(&config.storage)?);
    let mailer = Arc::new(HttpMailer::new(&config.email));

    let port = config.port;
    let state = AppState::new(pool, storage, mailer, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
