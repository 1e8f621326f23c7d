//! Shared application state for route handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::shopify::AdminClient;

/// Application state shared across all request handlers.
///
/// Cheap to clone; all fields live behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    shopify: AdminClient,
}

impl AppState {
    /// Create application state from configuration and a connection pool.
    #[must_use]
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        let shopify = AdminClient::new(&config.shopify_api_version);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                shopify,
            }),
        }
    }

    /// The loaded configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// The Postgres connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The Shopify Admin API client.
    #[must_use]
    pub fn shopify(&self) -> &AdminClient {
        &self.inner.shopify
    }
}
