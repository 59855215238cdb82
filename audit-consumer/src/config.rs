use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    pub database_url: String,
    pub kafka_bootstrap: String,
    pub topic: String,
    pub group_id: String,
    pub ttl_secs: i64,
    pub sweep_every: Duration,
    pub batch_size: usize,
    pub metrics_addr: SocketAddr,
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match normalize_optional(lookup(key)) {
        Some(raw) => raw.parse::<T>().map_err(|e| anyhow::anyhow!("{key}: {e}")),
        None => Ok(default),
    }
}

impl AuditConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = normalize_optional(lookup("DATABASE_URL")).context("DATABASE_URL must be set")?;
        let ttl_secs: i64 = parsed(&lookup, "AUDIT_TTL_SECS", 300)?;
        anyhow::ensure!(ttl_secs > 0, "AUDIT_TTL_SECS must be positive");
        let batch_size: usize = parsed(&lookup, "AUDIT_BATCH_SIZE", 10)?;
        Ok(Self {
            database_url,
            kafka_bootstrap: normalize_optional(lookup("KAFKA_BOOTSTRAP")).unwrap_or_else(|| "localhost:9092".into()),
            topic: normalize_optional(lookup("ORDER_EVENTS_TOPIC")).unwrap_or_else(|| "order-events".into()),
            group_id: normalize_optional(lookup("AUDIT_CONSUMER_GROUP")).unwrap_or_else(|| "order-events-audit".into()),
            ttl_secs,
            sweep_every: Duration::from_secs(parsed(&lookup, "AUDIT_SWEEP_SECS", 60u64)?.max(1)),
            batch_size: batch_size.max(1),
            metrics_addr: parsed(&lookup, "METRICS_ADDR", SocketAddr::from(([0, 0, 0, 0], 8090)))?,
        })
    }

    pub fn load() -> Result<Self> { Self::from_lookup(|key| env::var(key).ok()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = AuditConfig::from_lookup(|k| (k == "DATABASE_URL").then(|| "postgres://db".to_string())).unwrap();
        assert_eq!(cfg.ttl_secs, 300);
        assert_eq!(cfg.topic, "order-events");
        assert_eq!(cfg.metrics_addr.port(), 8090);
        assert_eq!(cfg.batch_size, 10);
    }

    #[test]
    fn rejects_bad_ttl() {
        let lookup = |k: &str| match k {
            "DATABASE_URL" => Some("postgres://db".to_string()),
            "AUDIT_TTL_SECS" => Some("0".to_string()),
            _ => None,
        };
        assert!(AuditConfig::from_lookup(lookup).is_err());
    }
}
