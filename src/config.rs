use std::env;
use std::time::Duration;

use crate::engine::overlap::BoundaryPolicy;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}, expected compact/json")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    /// Upper bound on waiting for a courier or order-pool lock.
    pub lock_timeout: Duration,
    /// Upper bound on a whole engine operation, lock waits included.
    pub store_timeout: Duration,
    pub overlap_boundary: BoundaryPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: parse_or_default("LOG_FORMAT", LogFormat::Compact)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            lock_timeout: Duration::from_millis(parse_or_default("LOCK_TIMEOUT_MS", 2_000)?),
            store_timeout: Duration::from_millis(parse_or_default("STORE_TIMEOUT_MS", 5_000)?),
            overlap_boundary: parse_or_default("OVERLAP_BOUNDARY", BoundaryPolicy::Inclusive)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            event_buffer_size: 1024,
            lock_timeout: Duration::from_millis(2_000),
            store_timeout: Duration::from_millis(5_000),
            overlap_boundary: BoundaryPolicy::Inclusive,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
