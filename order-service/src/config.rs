use std::env;
use std::net::{IpAddr, SocketAddr};

use anyhow::{anyhow, Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub kafka_bootstrap: String,
    pub events_topic: String,
    pub publish_deletions: bool,
    pub run_migrations: bool,
}

fn bool_from(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(other) => Err(anyhow!("expected a boolean, got {other}")),
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl OrderConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = normalize_optional(lookup("DATABASE_URL")).context("DATABASE_URL must be set")?;
        let host = normalize_optional(lookup("HOST")).unwrap_or_else(|| "0.0.0.0".to_string());
        let ip: IpAddr = host.parse().with_context(|| format!("HOST is not an IP address: {host}"))?;
        let port = match normalize_optional(lookup("PORT")) {
            Some(p) => p.parse::<u16>().with_context(|| format!("PORT is not a port number: {p}"))?,
            None => 8084,
        };
        Ok(Self {
            database_url,
            bind_addr: SocketAddr::from((ip, port)),
            kafka_bootstrap: normalize_optional(lookup("KAFKA_BOOTSTRAP")).unwrap_or_else(|| "localhost:9092".to_string()),
            events_topic: normalize_optional(lookup("ORDER_EVENTS_TOPIC")).unwrap_or_else(|| "order-events".to_string()),
            publish_deletions: bool_from(lookup("ORDER_PUBLISH_DELETIONS"), true).context("ORDER_PUBLISH_DELETIONS")?,
            run_migrations: bool_from(lookup("RUN_MIGRATIONS"), true).context("RUN_MIGRATIONS")?,
        })
    }

    pub fn load() -> Result<Self> { Self::from_lookup(|key| env::var(key).ok()) }
}
