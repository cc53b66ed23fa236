// src/main.rs
use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use halfhour_poll::config::Config;
use halfhour_poll::db::{self, PgStore};
use halfhour_poll::handlers::AppState;
use halfhour_poll::routes;
use halfhour_poll::store::{MemoryStore, RecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok(); // Load environment variables from .env file

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("halfhour_poll=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn RecordStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::create_pool(url, config.db_max_connections)
                .await
                .context("failed to connect to the database")?;
            let store = PgStore::new(pool);
            store.ensure_schema().await.context("failed to prepare the polls table")?;
            tracing::info!("using postgres record store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, polls are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let cors = routes::cors_layer(config.cors_allow_origin.as_deref())
        .context("CORS_ALLOW_ORIGIN is not a valid header value")?;
    let app = routes::create_routes(AppState::new(store, config.retry)).layer(cors);

    tracing::info!(addr = %config.bind_addr, "listening");
    axum_server::bind(config.bind_addr)
        .serve(app.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}
