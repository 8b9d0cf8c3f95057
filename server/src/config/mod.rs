use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 14;
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_connections: u32,
    pub session_ttl: Duration,
    pub allowed_origins: Vec<String>,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let session_ttl_hours: i64 =
            parse_or(&lookup, "SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS)?;
        let session_ttl = Some(session_ttl_hours)
            .filter(|hours| *hours > 0)
            .and_then(Duration::try_hours)
            .ok_or_else(|| ConfigError::Invalid {
                key: "SESSION_TTL_HOURS",
                value: session_ttl_hours.to_string(),
            })?;

        let allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let production = lookup("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        Ok(Self {
            database_url,
            host: parse_or(&lookup, "HOST", DEFAULT_HOST)?,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            session_ttl,
            allowed_origins,
            production,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse();
            parsed.map_err(|_| ConfigError::Invalid { key, value })
        }
    }
}
