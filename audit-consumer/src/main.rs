use std::sync::Arc;

use anyhow::Context;
use audit_consumer::app::ops_router;
use audit_consumer::config::AuditConfig;
use audit_consumer::sweeper::spawn_expiry_sweeper;
use audit_consumer::{AuditRecorder, AuditRepository, PgAuditRepository};
use chrono::Duration;
use common_events::{delivery_from_message, Clock, SystemClock};
use common_observability::ConsumerMetrics;
use futures::StreamExt;
use rdkafka::consumer::{Consumer, StreamConsumer};
use sqlx::PgPool;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();
    let config = AuditConfig::load()?;

    let db = PgPool::connect(&config.database_url).await.context("failed to connect to DATABASE_URL")?;
    let mut migrator = sqlx::migrate!("./migrations");
    migrator.set_ignore_missing(true);
    migrator.run(&db).await.context("audit migrations failed")?;

    let metrics = ConsumerMetrics::new("audit")?;
    let repo: Arc<dyn AuditRepository> = Arc::new(PgAuditRepository::new(db));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let recorder = AuditRecorder::new(repo.clone(), clock.clone(), metrics.clone()).with_ttl(Duration::seconds(config.ttl_secs));
    spawn_expiry_sweeper(repo, clock, metrics.clone(), config.sweep_every);

    let ops = ops_router(metrics);
    let listener = tokio::net::TcpListener::bind(config.metrics_addr).await?;
    info!(addr = %config.metrics_addr, "starting audit-consumer http server");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, ops).await {
            error!(?e, "ops server stopped");
        }
    });

    let consumer: StreamConsumer = rdkafka::ClientConfig::new()
        .set("bootstrap.servers", &config.kafka_bootstrap)
        .set("group.id", &config.group_id)
        .set("enable.partition.eof", "false")
        .create()
        .context("failed to create kafka consumer")?;
    consumer.subscribe(&[&config.topic])?;
    info!(topic = %config.topic, group = %config.group_id, "audit consumer subscribed");

    let mut batches = consumer.stream().ready_chunks(config.batch_size);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            next = batches.next() => {
                let Some(batch) = next else { break };
                let deliveries: Vec<_> = batch
                    .into_iter()
                    .filter_map(|m| match m {
                        Ok(message) => Some(delivery_from_message(&message)),
                        Err(e) => {
                            warn!(?e, "kafka consumer error");
                            None
                        }
                    })
                    .collect();
                let outcomes = recorder.record_batch(&deliveries).await;
                let failed = outcomes.iter().filter(|r| r.is_err()).count();
                if failed > 0 {
                    warn!(failed, total = outcomes.len(), "some audit records were not written");
                }
            }
        }
    }
    Ok(())
}
