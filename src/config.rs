// src/config.rs
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::services::RetryPolicy;

/// Upper bound for the per-attempt submit backoff.
pub const MAX_BACKOFF_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// No URL means records live in process memory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub retry: RetryPolicy,
    pub cors_allow_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any name lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host: IpAddr = parse_or(&lookup, "BIND_ADDR", IpAddr::from([0, 0, 0, 0]))?;
        let port: u16 = parse_or(&lookup, "PORT", 3030)?;
        let backoff_ms: u64 = parse_or(&lookup, "SUBMIT_BACKOFF_MS", 10)?;
        if backoff_ms > MAX_BACKOFF_MS {
            return Err(ConfigError::Invalid {
                name: "SUBMIT_BACKOFF_MS",
                value: backoff_ms.to_string(),
            });
        }

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            database_url: non_empty(lookup("DATABASE_URL")),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            retry: RetryPolicy {
                max_attempts: parse_or(&lookup, "SUBMIT_MAX_ATTEMPTS", 5)?,
                backoff: Duration::from_millis(backoff_ms),
            },
            cors_allow_origin: non_empty(lookup("CORS_ALLOW_ORIGIN")),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match non_empty(lookup(name)) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
