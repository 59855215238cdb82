use std::env;
use std::net::{IpAddr, SocketAddr};

use anyhow::{anyhow, Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub run_migrations: bool,
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CatalogConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = normalize_optional(lookup("DATABASE_URL")).context("DATABASE_URL must be set")?;
        let host = normalize_optional(lookup("HOST")).unwrap_or_else(|| "0.0.0.0".to_string());
        let ip: IpAddr = host.parse().with_context(|| format!("HOST is not an IP address: {host}"))?;
        let port = match normalize_optional(lookup("PORT")) {
            Some(p) => p.parse::<u16>().with_context(|| format!("PORT is not a port number: {p}"))?,
            None => 8081,
        };
        let run_migrations = match normalize_optional(lookup("RUN_MIGRATIONS")).as_deref() {
            None => true,
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
            Some(other) => return Err(anyhow!("RUN_MIGRATIONS: expected a boolean, got {other}")),
        };
        Ok(Self { database_url, bind_addr: SocketAddr::from((ip, port)), run_migrations })
    }

    pub fn load() -> Result<Self> { Self::from_lookup(|key| env::var(key).ok()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_8081() {
        let cfg = CatalogConfig::from_lookup(|k| (k == "DATABASE_URL").then(|| "postgres://db".to_string())).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8081);
        assert!(cfg.run_migrations);
    }

    #[test]
    fn rejects_bad_flag() {
        let lookup = |k: &str| match k {
            "DATABASE_URL" => Some("postgres://db".to_string()),
            "RUN_MIGRATIONS" => Some("maybe".to_string()),
            _ => None,
        };
        assert!(CatalogConfig::from_lookup(lookup).is_err());
    }
}
