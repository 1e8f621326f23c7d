//! Database operations for the Promowell `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `shops` - One row per merchant install (domain is the natural key)
//! - `shopify_discounts_raw` - Normalized discounts plus verbatim payload
//! - `shopify_orders_raw` - Normalized orders plus verbatim payload
//! - `discount_performance_daily` - Per-day aggregates written by the
//!   external ETL; read-only from this crate
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run on startup
//! via `sqlx::migrate!`.

pub mod discounts;
pub mod orders;
pub mod performance;
pub mod shops;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use discounts::{
    DiscountClass, DiscountPatch, DiscountRecord, DiscountRepository, DiscountSummary,
    DiscountType, MinimumRequirement, ResolvedDiscount,
};
pub use orders::{OrderPatch, OrderRecord, OrderRepository};
pub use performance::{DailyPerformanceRow, PerformanceRepository};
pub use shops::{Shop, ShopRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
