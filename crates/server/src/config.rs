//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `PROMOWELL_HOST` - Bind address (default: 127.0.0.1)
//! - `PROMOWELL_PORT` - Listen port (default: 3002)
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2025-01)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shopify Admin API version used for node lookups and bulk sync
    pub shopify_api_version: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_env("DATABASE_URL").map(SecretString::from)?;
        let host = get_env_or_default("PROMOWELL_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("PROMOWELL_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PROMOWELL_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PROMOWELL_PORT".to_string(), e.to_string()))?;
        let shopify_api_version = get_env_or_default("SHOPIFY_API_VERSION", "2025-01");
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            shopify_api_version,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3002,
            shopify_api_version: "2025-01".to_string(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3002);
    }

    #[test]
    fn test_env_or_default() {
        assert_eq!(
            get_env_or_default("PROMOWELL_TEST_UNSET_VAR", "fallback"),
            "fallback"
        );
    }
}
