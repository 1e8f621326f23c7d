//! Ingestion writer: the one place webhook and sync payloads become rows.
//!
//! Every entry point resolves the shop by domain first; a missing shop is
//! fatal for that single event (upstream redelivery cannot create the shop,
//! so webhook handlers still acknowledge receipt).

use promowell_core::ShopId;
use secrecy::SecretString;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::db::{
    DiscountRepository, OrderRepository, PerformanceRepository, RepositoryError, ShopRepository,
};
use crate::shopify::{AdminClient, ShopCredentials};

use super::IngestError;
use super::discount::{self, NormalizedDiscount};
use super::linker::link_discount_references;
use super::order::{self, NormalizedOrder};

/// Writes normalized orders and discounts into the store.
pub struct IngestionWriter<'a> {
    pool: &'a PgPool,
    client: &'a AdminClient,
}

impl<'a> IngestionWriter<'a> {
    /// Create a new ingestion writer.
    #[must_use]
    pub const fn new(pool: &'a PgPool, client: &'a AdminClient) -> Self {
        Self { pool, client }
    }

    /// Resolve the internal shop ID for a webhook's delivering domain.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::ShopNotFound` when the domain is unknown.
    pub async fn resolve_shop(&self, shop_domain: &str) -> Result<ShopId, IngestError> {
        match ShopRepository::new(self.pool).resolve_shop_id(shop_domain).await {
            Ok(id) => Ok(id),
            Err(RepositoryError::NotFound) => {
                Err(IngestError::ShopNotFound(shop_domain.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Admin API credentials for enrichment fetches, if the shop has a
    /// stored token. Absence degrades enrichment, never ingestion.
    async fn credentials(&self, shop_domain: &str) -> Option<ShopCredentials> {
        let token: Option<SecretString> = ShopRepository::new(self.pool)
            .access_token(shop_domain)
            .await
            .ok()
            .flatten();
        token.map(|access_token| ShopCredentials {
            domain: shop_domain.to_string(),
            access_token,
        })
    }

    /// Handle an order-created event.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::ShopNotFound` for unknown domains,
    /// `IngestError::Repository` when the write fails.
    #[instrument(skip(self, payload))]
    pub async fn handle_order_created(
        &self,
        shop_domain: &str,
        payload: &Value,
    ) -> Result<(), IngestError> {
        let shop_id = self.resolve_shop(shop_domain).await?;
        let normalized = self.normalize_and_link_order(shop_id, shop_domain, payload).await;

        OrderRepository::new(self.pool)
            .upsert(&normalized.to_record(shop_id))
            .await?;

        info!(shop = shop_domain, order = normalized.shopify_order_id, "order stored");
        Ok(())
    }

    /// Handle an order-updated event with partial-update semantics. If no
    /// row exists yet (update delivered before create), falls back to a
    /// full upsert.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::ShopNotFound` for unknown domains,
    /// `IngestError::Repository` when the write fails.
    #[instrument(skip(self, payload))]
    pub async fn handle_order_updated(
        &self,
        shop_domain: &str,
        payload: &Value,
    ) -> Result<(), IngestError> {
        let shop_id = self.resolve_shop(shop_domain).await?;
        let normalized = self.normalize_and_link_order(shop_id, shop_domain, payload).await;

        let repo = OrderRepository::new(self.pool);
        match repo
            .apply_patch(shop_id, normalized.shopify_order_id, &normalized.to_patch())
            .await
        {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => {
                repo.upsert(&normalized.to_record(shop_id)).await?;
            }
            Err(e) => return Err(e.into()),
        }

        info!(shop = shop_domain, order = normalized.shopify_order_id, "order updated");
        Ok(())
    }

    /// Handle a discount-created event: full upsert by natural key.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::ShopNotFound` for unknown domains,
    /// `IngestError::Repository` when the write fails.
    #[instrument(skip(self, payload))]
    pub async fn handle_discount_created(
        &self,
        shop_domain: &str,
        payload: &Value,
    ) -> Result<(), IngestError> {
        let shop_id = self.resolve_shop(shop_domain).await?;
        let normalized = self.normalize_discount(shop_domain, payload).await;

        DiscountRepository::new(self.pool)
            .upsert(&normalized.to_record(shop_id))
            .await?;

        info!(
            shop = shop_domain,
            discount = normalized.shopify_discount_id,
            "discount stored"
        );
        Ok(())
    }

    /// Handle a discount-updated event with partial-update semantics,
    /// falling back to a full upsert for a not-yet-seen discount.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::ShopNotFound` for unknown domains,
    /// `IngestError::Repository` when the write fails.
    #[instrument(skip(self, payload))]
    pub async fn handle_discount_updated(
        &self,
        shop_domain: &str,
        payload: &Value,
    ) -> Result<(), IngestError> {
        let shop_id = self.resolve_shop(shop_domain).await?;
        let normalized = self.normalize_discount(shop_domain, payload).await;

        let repo = DiscountRepository::new(self.pool);
        match repo
            .apply_patch(shop_id, normalized.shopify_discount_id, &normalized.to_patch())
            .await
        {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => {
                repo.upsert(&normalized.to_record(shop_id)).await?;
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            shop = shop_domain,
            discount = normalized.shopify_discount_id,
            "discount updated"
        );
        Ok(())
    }

    /// Handle a discount-deleted event: soft delete, the row is kept.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::ShopNotFound` for unknown domains,
    /// `IngestError::Repository` when the write fails.
    #[instrument(skip(self, payload))]
    pub async fn handle_discount_deleted(
        &self,
        shop_domain: &str,
        payload: &Value,
    ) -> Result<(), IngestError> {
        let shop_id = self.resolve_shop(shop_domain).await?;
        let shopify_discount_id = promowell_core::extract_numeric_id(
            payload
                .get("admin_graphql_api_id")
                .unwrap_or(&payload["id"]),
        );

        DiscountRepository::new(self.pool)
            .soft_delete(shop_id, shopify_discount_id)
            .await?;

        info!(shop = shop_domain, discount = shopify_discount_id, "discount soft-deleted");
        Ok(())
    }

    /// Handle app-uninstalled: delete the shop's raw data and mark the shop
    /// inactive. The shop row itself is kept.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::ShopNotFound` for unknown domains,
    /// `IngestError::Repository` when cleanup fails.
    #[instrument(skip(self))]
    pub async fn handle_app_uninstalled(&self, shop_domain: &str) -> Result<(), IngestError> {
        let shop_id = self.resolve_shop(shop_domain).await?;

        let orders = OrderRepository::new(self.pool).delete_for_shop(shop_id).await?;
        let discounts = DiscountRepository::new(self.pool)
            .delete_for_shop(shop_id)
            .await?;
        let performance = PerformanceRepository::new(self.pool)
            .delete_for_shop(shop_id)
            .await?;
        ShopRepository::new(self.pool).mark_inactive(shop_id).await?;

        info!(
            shop = shop_domain,
            orders, discounts, performance, "shop data cleaned up on uninstall"
        );
        Ok(())
    }

    /// Upsert an already-GraphQL-shaped order (historical sync path; no
    /// enrichment fetch needed).
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Repository` when the write fails.
    pub async fn upsert_order_from_node(
        &self,
        shop_id: ShopId,
        node: &Value,
    ) -> Result<(), IngestError> {
        let mut normalized = order::normalize_order(node);
        if normalized.shopify_order_id == 0 {
            return Err(IngestError::MissingEntityId);
        }
        self.link_order(shop_id, &mut normalized).await;
        OrderRepository::new(self.pool)
            .upsert(&normalized.to_record(shop_id))
            .await?;
        Ok(())
    }

    /// Upsert an already-GraphQL-shaped discount node (historical sync path).
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Repository` when the write fails.
    pub async fn upsert_discount_from_node(
        &self,
        shop_id: ShopId,
        node: &Value,
    ) -> Result<(), IngestError> {
        let normalized = discount::normalize_discount(node, None);
        if normalized.shopify_discount_id == 0 {
            return Err(IngestError::MissingEntityId);
        }
        DiscountRepository::new(self.pool)
            .upsert(&normalized.to_record(shop_id))
            .await?;
        Ok(())
    }

    async fn normalize_and_link_order(
        &self,
        shop_id: ShopId,
        shop_domain: &str,
        payload: &Value,
    ) -> NormalizedOrder {
        let mut normalized = order::normalize_order(payload);

        // REST payloads without application discriminators get one chance
        // at enrichment via the order node; failure is non-fatal.
        if normalized.needs_application_enrichment()
            && let Some(gid) = normalized.admin_graphql_api_id.clone()
            && let Some(creds) = self.credentials(shop_domain).await
        {
            match self.client.fetch_order_node(&creds, &gid).await {
                Ok(node) => order::apply_node_enrichment(&mut normalized, &node),
                Err(e) => {
                    warn!(shop = shop_domain, error = %e, "order node enrichment failed");
                }
            }
        }

        self.link_order(shop_id, &mut normalized).await;
        normalized
    }

    async fn link_order(&self, shop_id: ShopId, normalized: &mut NormalizedOrder) {
        // Preserve the present/absent distinction patch building relies on.
        let had_apps = normalized.applications.is_some();
        let had_allocs = normalized.allocations.is_some();
        let mut apps = normalized.applications.take().unwrap_or_default();
        let mut allocs = normalized.allocations.take().unwrap_or_default();

        let repo = DiscountRepository::new(self.pool);
        link_discount_references(&repo, shop_id, &mut apps, &mut allocs).await;

        if had_apps {
            normalized.applications = Some(apps);
        }
        if had_allocs {
            normalized.allocations = Some(allocs);
        }
    }

    async fn normalize_discount(&self, shop_domain: &str, payload: &Value) -> NormalizedDiscount {
        // REST-shaped payloads need the typed node before classification;
        // without credentials the lossy fallback applies.
        if let Some(gid) = discount::enrichment_gid(payload)
            && let Some(creds) = self.credentials(shop_domain).await
        {
            match self.client.fetch_discount_node(&creds, gid).await {
                Ok(node) => return discount::normalize_discount(payload, Some(&node)),
                Err(e) => {
                    warn!(shop = shop_domain, error = %e, "discount node enrichment failed");
                }
            }
        }
        discount::normalize_discount(payload, None)
    }
}
