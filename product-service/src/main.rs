use std::sync::Arc;

use anyhow::Context;
use common_store::{PgInfoRepository, PgMovieRepository, PgProductRepository};
use product_service::config::CatalogConfig;
use product_service::{build_router, AppState};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();
    let config = CatalogConfig::load()?;

    let db = PgPool::connect(&config.database_url).await.context("failed to connect to DATABASE_URL")?;
    if config.run_migrations {
        let mut migrator = sqlx::migrate!("./migrations");
        migrator.set_ignore_missing(true);
        migrator.run(&db).await.context("catalog migrations failed")?;
    }

    let state = AppState {
        products: Arc::new(PgProductRepository::new(db.clone())),
        movies: Arc::new(PgMovieRepository::new(db.clone())),
        infos: Arc::new(PgInfoRepository::new(db)),
    };
    let app = build_router(state);

    info!(addr = %config.bind_addr, "starting product-service");
    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
