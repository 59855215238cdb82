use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common_events::delivery_from_message;
use common_observability::ConsumerMetrics;
use futures::StreamExt;
use notification_service::app::ops_router;
use notification_service::config::NotificationConfig;
use notification_service::{Dispatcher, HttpMailer, LogMailer, Mailer};
use rdkafka::consumer::{Consumer, StreamConsumer};
use reqwest::Client;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();
    let config = NotificationConfig::load()?;

    let mailer: Arc<dyn Mailer> = match &config.mailer_url {
        Some(url) => {
            let client = Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .context("failed to build mail relay client")?;
            info!(%url, "using http mail relay");
            Arc::new(HttpMailer::new(client, url.clone(), config.mailer_bearer.clone()))
        }
        None => {
            warn!("MAILER_URL not set; notifications will only be logged");
            Arc::new(LogMailer)
        }
    };
    let metrics = ConsumerMetrics::new("notification")?;
    let dispatcher = Dispatcher::new(mailer, config.mail_from.clone(), metrics.clone());

    let ops = ops_router(metrics);
    let listener = tokio::net::TcpListener::bind(config.metrics_addr).await?;
    info!(addr = %config.metrics_addr, "starting notification-service http server");
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
    info!(topic = %config.topic, group = %config.group_id, "notification consumer subscribed");

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
                let outcomes = dispatcher.dispatch_batch(&deliveries).await;
                let failed = outcomes.iter().filter(|r| r.is_err()).count();
                if failed > 0 {
                    warn!(failed, total = outcomes.len(), "some notifications were not sent");
                }
            }
        }
    }
    Ok(())
}
