//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where reports, accounts and sessions are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local maps; everything is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("'{}' is not a known store backend", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub log_level: Level,
    pub cloudinary_cloud_name: String,
    pub cloudinary_upload_preset: String,
    pub feed_page_size: usize,
    pub search_debounce: Duration,
    pub session_ttl_days: i64,
    pub max_photo_bytes: usize,
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            store_backend: StoreBackend::Postgres,
            database_url: None,
            log_level: Level::INFO,
            cloudinary_cloud_name: String::new(),
            cloudinary_upload_preset: String::new(),
            feed_page_size: 9,
            search_debounce: Duration::from_millis(300),
            session_ttl_days: 30,
            max_photo_bytes: 5 * 1024 * 1024,
            cors_origin: "http://localhost:5173".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn required_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        let defaults = Config::default();

        // --- Load Server and Storage Settings ---
        let bind_address = parse_var("BIND_ADDRESS", defaults.bind_address)?;
        let store_backend = parse_var("STORE_BACKEND", defaults.store_backend)?;
        let database_url = match store_backend {
            StoreBackend::Postgres => Some(required_var("DATABASE_URL")?),
            StoreBackend::Memory => std::env::var("DATABASE_URL").ok(),
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Media Host Settings ---
        let cloudinary_cloud_name = required_var("CLOUDINARY_CLOUD_NAME")?;
        let cloudinary_upload_preset = required_var("CLOUDINARY_UPLOAD_PRESET")?;

        // --- Load Feed and Session Settings ---
        let feed_page_size = parse_var("FEED_PAGE_SIZE", defaults.feed_page_size)?;
        if feed_page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "FEED_PAGE_SIZE".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let search_debounce = Duration::from_millis(parse_var("SEARCH_DEBOUNCE_MS", 300u64)?);
        let session_ttl_days = parse_var("SESSION_TTL_DAYS", defaults.session_ttl_days)?;
        let max_photo_bytes = parse_var("MAX_PHOTO_BYTES", defaults.max_photo_bytes)?;
        let cors_origin = std::env::var("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        Ok(Self {
            bind_address,
            store_backend,
            database_url,
            log_level,
            cloudinary_cloud_name,
            cloudinary_upload_preset,
            feed_page_size,
            search_debounce,
            session_ttl_days,
            max_photo_bytes,
            cors_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_known_names() {
        assert_eq!("Postgres".parse::<StoreBackend>(), Ok(StoreBackend::Postgres));
        assert_eq!(" memory ".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn defaults_match_the_web_client() {
        let config = Config::default();
        assert_eq!(config.feed_page_size, 9);
        assert_eq!(config.search_debounce, Duration::from_millis(300));
        assert_eq!(config.max_photo_bytes, 5 * 1024 * 1024);
    }
}
