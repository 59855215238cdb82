use std::sync::Arc;

use anyhow::Context;
use common_events::{EventPublisher, EventSink, SystemClock};
use common_observability::SagaMetrics;
use common_store::{PgMovieRepository, PgProductRepository};
use order_service::config::OrderConfig;
use order_service::order_repo::PgOrderRepository;
use order_service::{build_router, AppState, OrderSaga, SagaPorts};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::info;

#[cfg(feature = "kafka")]
fn event_sink(config: &OrderConfig) -> anyhow::Result<Arc<dyn EventSink>> {
    let producer: rdkafka::producer::FutureProducer = rdkafka::ClientConfig::new()
        .set("bootstrap.servers", &config.kafka_bootstrap)
        .set("message.timeout.ms", "5000")
        .create()
        .context("failed to create kafka producer")?;
    info!(bootstrap = %config.kafka_bootstrap, topic = %config.events_topic, "publishing order events to kafka");
    Ok(Arc::new(common_events::KafkaEventSink::new(producer, config.events_topic.clone())))
}

#[cfg(not(feature = "kafka"))]
fn event_sink(config: &OrderConfig) -> anyhow::Result<Arc<dyn EventSink>> {
    info!(topic = %config.events_topic, "kafka feature disabled; order events are logged only");
    Ok(Arc::new(common_events::NoopEventSink))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();
    let config = OrderConfig::load()?;

    let db = PgPool::connect(&config.database_url).await.context("failed to connect to DATABASE_URL")?;
    if config.run_migrations {
        // catalog and audit services share the database and own their own migrations
        let mut migrator = sqlx::migrate!("./migrations");
        migrator.set_ignore_missing(true);
        migrator.run(&db).await.context("order migrations failed")?;
    }

    let ports = SagaPorts {
        orders: Arc::new(PgOrderRepository::new(db.clone())),
        products: Arc::new(PgProductRepository::new(db.clone())),
        movies: Arc::new(PgMovieRepository::new(db)),
        publisher: EventPublisher::new(event_sink(&config)?),
        clock: Arc::new(SystemClock),
    };
    let saga = OrderSaga::new(ports, SagaMetrics::new()?).with_publish_deletions(config.publish_deletions);
    let app = build_router(AppState { saga });

    info!(addr = %config.bind_addr, "starting order-service");
    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
