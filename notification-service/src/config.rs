use std::env;
use std::net::SocketAddr;

use anyhow::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub kafka_bootstrap: String,
    pub topic: String,
    pub group_id: String,
    /// Absent means notifications are only logged.
    pub mailer_url: Option<String>,
    pub mailer_bearer: Option<String>,
    pub mail_from: String,
    pub batch_size: usize,
    pub metrics_addr: SocketAddr,
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl NotificationConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let batch_size = match normalize_optional(lookup("NOTIFICATION_BATCH_SIZE")) {
            Some(raw) => raw.parse::<usize>().map_err(|e| anyhow::anyhow!("NOTIFICATION_BATCH_SIZE: {e}"))?,
            None => 10,
        };
        let metrics_addr = match normalize_optional(lookup("METRICS_ADDR")) {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|e| anyhow::anyhow!("METRICS_ADDR: {e}"))?,
            None => SocketAddr::from(([0, 0, 0, 0], 8091)),
        };
        let mailer_url = normalize_optional(lookup("MAILER_URL"));
        if let Some(url) = &mailer_url {
            anyhow::ensure!(
                url.starts_with("http://") || url.starts_with("https://"),
                "MAILER_URL must be an http(s) URL"
            );
        }
        Ok(Self {
            kafka_bootstrap: normalize_optional(lookup("KAFKA_BOOTSTRAP")).unwrap_or_else(|| "localhost:9092".into()),
            topic: normalize_optional(lookup("ORDER_EVENTS_TOPIC")).unwrap_or_else(|| "order-events".into()),
            group_id: normalize_optional(lookup("NOTIFICATION_CONSUMER_GROUP"))
                .unwrap_or_else(|| "order-events-notifications".into()),
            mailer_url,
            mailer_bearer: normalize_optional(lookup("MAILER_BEARER")),
            mail_from: normalize_optional(lookup("MAIL_FROM")).unwrap_or_else(|| "orders@cinema.local".into()),
            batch_size: batch_size.max(1),
            metrics_addr,
        })
    }

    pub fn load() -> Result<Self> { Self::from_lookup(|key| env::var(key).ok()) }
}
