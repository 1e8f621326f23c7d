//! Shop repository - one row per merchant install.
//!
//! Shops are created on first authenticated request for a new domain,
//! refreshed on subsequent opens, and marked inactive (never hard-deleted)
//! when the merchant uninstalls.

use chrono::{DateTime, Utc};
use promowell_core::ShopId;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

use super::RepositoryError;

/// A merchant shop record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Shop {
    /// Internal shop ID - the foreign key for all other entities.
    pub id: ShopId,
    /// External domain, e.g. `mystore.myshopify.com` (unique natural key).
    pub shop_domain: String,
    /// Whether the app is currently installed.
    pub is_active: bool,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Repository for shop database operations.
pub struct ShopRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopRepository<'a> {
    /// Create a new shop repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a shop by its external domain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_domain(&self, domain: &str) -> Result<Option<Shop>, RepositoryError> {
        let shop = sqlx::query_as::<_, Shop>(
            r"
            SELECT id, shop_domain, is_active, created_at, updated_at
            FROM shops
            WHERE shop_domain = $1
            ",
        )
        .bind(domain)
        .fetch_optional(self.pool)
        .await?;

        Ok(shop)
    }

    /// Resolve a domain to its internal shop ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no shop exists for the domain,
    /// `RepositoryError::Database` if the query fails.
    pub async fn resolve_shop_id(&self, domain: &str) -> Result<ShopId, RepositoryError> {
        self.find_by_domain(domain)
            .await?
            .map(|s| s.id)
            .ok_or(RepositoryError::NotFound)
    }

    /// Insert or refresh a shop on install/open.
    ///
    /// Updates the access credential and reactivates the shop if it was
    /// previously uninstalled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_install(
        &self,
        domain: &str,
        access_token: &SecretString,
    ) -> Result<ShopId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ShopId>(
            r"
            INSERT INTO shops (shop_domain, access_token, is_active)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (shop_domain) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                is_active = TRUE,
                updated_at = NOW()
            RETURNING id
            ",
        )
        .bind(domain)
        .bind(access_token.expose_secret())
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Fetch the stored access credential for a shop domain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn access_token(
        &self,
        domain: &str,
    ) -> Result<Option<SecretString>, RepositoryError> {
        let token = sqlx::query_scalar::<_, Option<String>>(
            r"
            SELECT access_token
            FROM shops
            WHERE shop_domain = $1
            ",
        )
        .bind(domain)
        .fetch_optional(self.pool)
        .await?
        .flatten();

        Ok(token.map(SecretString::from))
    }

    /// Mark a shop inactive. The row is kept for audit; only the raw data
    /// tables are cleaned up on uninstall.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_inactive(&self, shop_id: ShopId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE shops
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(shop_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
