//! Order repository - normalized order records plus verbatim payloads.
//!
//! Keyed by `(shop_id, shopify_order_id)`. The `discount_applications`
//! column stores the normalized application list after the cross-reference
//! linker has enriched each entry with the matched internal discount ID
//! (where one exists).

use chrono::{DateTime, Utc};
use promowell_core::{OrderRecordId, ShopId};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;

use super::RepositoryError;

/// A fully-normalized order record ready for storage.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub shop_id: ShopId,
    pub shopify_order_id: i64,
    /// Display name, e.g. `#1001`.
    pub order_name: Option<String>,
    pub currency: Option<String>,
    pub total_price: Option<Decimal>,
    pub subtotal_price: Option<Decimal>,
    pub total_discounts: Option<Decimal>,
    pub total_tax: Option<Decimal>,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub customer_id: Option<i64>,
    pub customer_email: Option<String>,
    /// Sales-channel name (`source_name` / publication name).
    pub channel_source_name: Option<String>,
    /// App ID behind the sales channel, when the channel is app-driven.
    pub channel_app_id: Option<i64>,
    /// Plain code strings attached to the order (jsonb array).
    pub discount_codes: Value,
    /// Normalized discount applications, enriched with matched internal
    /// discount IDs by the linker (jsonb array).
    pub discount_applications: Value,
    /// Line items with per-line discount allocations (jsonb array).
    pub line_items: Value,
    pub shopify_created_at: Option<DateTime<Utc>>,
    pub shopify_updated_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Verbatim original payload for audit/replay.
    pub raw_data: Value,
}

/// Partial update for an order. Only `Some` fields overwrite stored values.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub order_name: Option<String>,
    pub currency: Option<String>,
    pub total_price: Option<Decimal>,
    pub subtotal_price: Option<Decimal>,
    pub total_discounts: Option<Decimal>,
    pub total_tax: Option<Decimal>,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub customer_id: Option<i64>,
    pub customer_email: Option<String>,
    pub channel_source_name: Option<String>,
    pub channel_app_id: Option<i64>,
    pub discount_codes: Option<Value>,
    pub discount_applications: Option<Value>,
    pub line_items: Option<Value>,
    pub shopify_updated_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// The verbatim payload is always replaced on update events.
    pub raw_data: Option<Value>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or fully replace an order, keyed by the natural key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, record: &OrderRecord) -> Result<OrderRecordId, RepositoryError> {
        let id = sqlx::query_scalar::<_, OrderRecordId>(
            r"
            INSERT INTO shopify_orders_raw (
                shop_id, shopify_order_id, order_name, currency,
                total_price, subtotal_price, total_discounts, total_tax,
                financial_status, fulfillment_status,
                customer_id, customer_email,
                channel_source_name, channel_app_id,
                discount_codes, discount_applications, line_items,
                shopify_created_at, shopify_updated_at, processed_at,
                cancelled_at, raw_data
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22
            )
            ON CONFLICT (shop_id, shopify_order_id) DO UPDATE SET
                order_name = EXCLUDED.order_name,
                currency = EXCLUDED.currency,
                total_price = EXCLUDED.total_price,
                subtotal_price = EXCLUDED.subtotal_price,
                total_discounts = EXCLUDED.total_discounts,
                total_tax = EXCLUDED.total_tax,
                financial_status = EXCLUDED.financial_status,
                fulfillment_status = EXCLUDED.fulfillment_status,
                customer_id = EXCLUDED.customer_id,
                customer_email = EXCLUDED.customer_email,
                channel_source_name = EXCLUDED.channel_source_name,
                channel_app_id = EXCLUDED.channel_app_id,
                discount_codes = EXCLUDED.discount_codes,
                discount_applications = EXCLUDED.discount_applications,
                line_items = EXCLUDED.line_items,
                shopify_created_at = EXCLUDED.shopify_created_at,
                shopify_updated_at = EXCLUDED.shopify_updated_at,
                processed_at = EXCLUDED.processed_at,
                cancelled_at = EXCLUDED.cancelled_at,
                raw_data = EXCLUDED.raw_data,
                updated_at = NOW()
            RETURNING id
            ",
        )
        .bind(record.shop_id)
        .bind(record.shopify_order_id)
        .bind(&record.order_name)
        .bind(&record.currency)
        .bind(record.total_price)
        .bind(record.subtotal_price)
        .bind(record.total_discounts)
        .bind(record.total_tax)
        .bind(&record.financial_status)
        .bind(&record.fulfillment_status)
        .bind(record.customer_id)
        .bind(&record.customer_email)
        .bind(&record.channel_source_name)
        .bind(record.channel_app_id)
        .bind(&record.discount_codes)
        .bind(&record.discount_applications)
        .bind(&record.line_items)
        .bind(record.shopify_created_at)
        .bind(record.shopify_updated_at)
        .bind(record.processed_at)
        .bind(record.cancelled_at)
        .bind(&record.raw_data)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Apply a partial update keyed by the natural key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row matches the natural key,
    /// `RepositoryError::Database` if the query fails.
    pub async fn apply_patch(
        &self,
        shop_id: ShopId,
        shopify_order_id: i64,
        patch: &OrderPatch,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shopify_orders_raw SET
                order_name = COALESCE($3, order_name),
                currency = COALESCE($4, currency),
                total_price = COALESCE($5, total_price),
                subtotal_price = COALESCE($6, subtotal_price),
                total_discounts = COALESCE($7, total_discounts),
                total_tax = COALESCE($8, total_tax),
                financial_status = COALESCE($9, financial_status),
                fulfillment_status = COALESCE($10, fulfillment_status),
                customer_id = COALESCE($11, customer_id),
                customer_email = COALESCE($12, customer_email),
                channel_source_name = COALESCE($13, channel_source_name),
                channel_app_id = COALESCE($14, channel_app_id),
                discount_codes = COALESCE($15, discount_codes),
                discount_applications = COALESCE($16, discount_applications),
                line_items = COALESCE($17, line_items),
                shopify_updated_at = COALESCE($18, shopify_updated_at),
                processed_at = COALESCE($19, processed_at),
                cancelled_at = COALESCE($20, cancelled_at),
                raw_data = COALESCE($21, raw_data),
                updated_at = NOW()
            WHERE shop_id = $1 AND shopify_order_id = $2
            ",
        )
        .bind(shop_id)
        .bind(shopify_order_id)
        .bind(&patch.order_name)
        .bind(&patch.currency)
        .bind(patch.total_price)
        .bind(patch.subtotal_price)
        .bind(patch.total_discounts)
        .bind(patch.total_tax)
        .bind(&patch.financial_status)
        .bind(&patch.fulfillment_status)
        .bind(patch.customer_id)
        .bind(&patch.customer_email)
        .bind(&patch.channel_source_name)
        .bind(patch.channel_app_id)
        .bind(&patch.discount_codes)
        .bind(&patch.discount_applications)
        .bind(&patch.line_items)
        .bind(patch.shopify_updated_at)
        .bind(patch.processed_at)
        .bind(patch.cancelled_at)
        .bind(&patch.raw_data)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete all order rows for a shop (uninstall cleanup only).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_for_shop(&self, shop_id: ShopId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM shopify_orders_raw WHERE shop_id = $1")
            .bind(shop_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
