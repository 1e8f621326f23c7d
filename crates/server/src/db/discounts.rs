//! Discount repository - normalized discount records plus verbatim payloads.
//!
//! The natural key is `(shop_id, shopify_discount_id)`. Creation (webhook or
//! sync) goes through a full upsert; update events go through a partial
//! patch that only overwrites fields present in the incoming event; deletion
//! events soft-delete by flipping the status to `INACTIVE`.

use chrono::{DateTime, Utc};
use promowell_core::{DiscountRecordId, ShopId};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use super::RepositoryError;

/// Discount classification - which part of the order the discount targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountClass {
    Product,
    Order,
    Shipping,
}

impl DiscountClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Order => "order",
            Self::Shipping => "shipping",
        }
    }
}

/// Discount type tag. Never left empty: normalization falls back to `App`
/// only when no other signal is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    BasicAmount,
    BasicPercentage,
    Bxgy,
    FreeShipping,
    App,
}

impl DiscountType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BasicAmount => "basic_amount",
            Self::BasicPercentage => "basic_percentage",
            Self::Bxgy => "bxgy",
            Self::FreeShipping => "free_shipping",
            Self::App => "app",
        }
    }
}

/// Minimum purchase requirement kind. Subtotal and quantity are mutually
/// exclusive - determined by which sub-object the payload carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MinimumRequirement {
    Subtotal,
    Quantity,
}

impl MinimumRequirement {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subtotal => "subtotal",
            Self::Quantity => "quantity",
        }
    }
}

/// A fully-normalized discount record ready for storage.
///
/// Invariant: `amount` and `percentage` are never both set; a `Shipping`
/// class record always carries `DiscountType::FreeShipping`. Both are
/// enforced by the normalizer, not here.
#[derive(Debug, Clone)]
pub struct DiscountRecord {
    pub shop_id: ShopId,
    pub shopify_discount_id: i64,
    pub title: String,
    pub summary: Option<String>,
    /// Primary code (code discounts only).
    pub code: Option<String>,
    /// Full code list length.
    pub codes_count: i32,
    pub discount_class: DiscountClass,
    pub discount_type: DiscountType,
    pub is_automatic: bool,
    /// Fixed monetary value - mutually exclusive with `percentage`.
    pub amount: Option<Decimal>,
    /// Percentage value - mutually exclusive with `amount`.
    pub percentage: Option<Decimal>,
    pub minimum_requirement: Option<MinimumRequirement>,
    pub minimum_amount: Option<Decimal>,
    pub usage_limit: Option<i64>,
    pub used_count: i64,
    pub async_usage_count: i64,
    pub total_sales: Option<Decimal>,
    pub applies_once_per_customer: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    /// Lifecycle status: ACTIVE | EXPIRED | SCHEDULED | INACTIVE.
    pub status: String,
    /// `all` or `prerequisite` (named customer segments).
    pub customer_selection: String,
    /// Customer segments as `[{id, name}]` (jsonb).
    pub prerequisite_customers: Value,
    /// Entitled product GIDs (jsonb array).
    pub entitled_products: Value,
    /// Entitled collection GIDs (jsonb array).
    pub entitled_collections: Value,
    /// Entitled country codes (jsonb array, free-shipping only).
    pub entitled_countries: Value,
    pub combines_with_order_discounts: bool,
    pub combines_with_product_discounts: bool,
    pub combines_with_shipping_discounts: bool,
    pub shopify_created_at: Option<DateTime<Utc>>,
    pub shopify_updated_at: Option<DateTime<Utc>>,
    /// Verbatim original payload for audit/replay.
    pub raw_data: Value,
}

/// Partial update for a discount. Only fields carried as `Some` overwrite
/// stored values; everything else is preserved. The source event format has
/// no way to express an explicit clear, so clearing is out of scope.
#[derive(Debug, Clone, Default)]
pub struct DiscountPatch {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub code: Option<String>,
    pub codes_count: Option<i32>,
    pub discount_class: Option<DiscountClass>,
    pub discount_type: Option<DiscountType>,
    pub is_automatic: Option<bool>,
    pub amount: Option<Decimal>,
    pub percentage: Option<Decimal>,
    pub minimum_requirement: Option<MinimumRequirement>,
    pub minimum_amount: Option<Decimal>,
    pub usage_limit: Option<i64>,
    pub used_count: Option<i64>,
    pub async_usage_count: Option<i64>,
    pub total_sales: Option<Decimal>,
    pub applies_once_per_customer: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub customer_selection: Option<String>,
    pub prerequisite_customers: Option<Value>,
    pub entitled_products: Option<Value>,
    pub entitled_collections: Option<Value>,
    pub entitled_countries: Option<Value>,
    pub combines_with_order_discounts: Option<bool>,
    pub combines_with_product_discounts: Option<bool>,
    pub combines_with_shipping_discounts: Option<bool>,
    pub shopify_created_at: Option<DateTime<Utc>>,
    pub shopify_updated_at: Option<DateTime<Utc>>,
    /// The verbatim payload is always replaced on update events.
    pub raw_data: Option<Value>,
}

/// Minimal projection used by the cross-reference linker.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResolvedDiscount {
    pub id: DiscountRecordId,
    pub shopify_discount_id: i64,
    pub code: Option<String>,
    pub title: Option<String>,
}

/// Projection for the dashboard discount menu.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DiscountSummary {
    pub id: DiscountRecordId,
    pub shopify_discount_id: i64,
    pub code: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub discount_type: Option<String>,
}

/// Repository for discount database operations.
pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountRepository<'a> {
    /// Create a new discount repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or fully replace a discount, keyed by the natural key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, record: &DiscountRecord) -> Result<DiscountRecordId, RepositoryError> {
        let id = sqlx::query_scalar::<_, DiscountRecordId>(
            r"
            INSERT INTO shopify_discounts_raw (
                shop_id, shopify_discount_id, title, summary, code, codes_count,
                discount_class, discount_type, is_automatic,
                amount, percentage, minimum_requirement, minimum_amount,
                usage_limit, used_count, async_usage_count, total_sales,
                applies_once_per_customer, starts_at, ends_at, status,
                customer_selection, prerequisite_customers,
                entitled_products, entitled_collections, entitled_countries,
                combines_with_order_discounts, combines_with_product_discounts,
                combines_with_shipping_discounts,
                shopify_created_at, shopify_updated_at, raw_data
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26,
                $27, $28, $29, $30, $31, $32
            )
            ON CONFLICT (shop_id, shopify_discount_id) DO UPDATE SET
                title = EXCLUDED.title,
                summary = EXCLUDED.summary,
                code = EXCLUDED.code,
                codes_count = EXCLUDED.codes_count,
                discount_class = EXCLUDED.discount_class,
                discount_type = EXCLUDED.discount_type,
                is_automatic = EXCLUDED.is_automatic,
                amount = EXCLUDED.amount,
                percentage = EXCLUDED.percentage,
                minimum_requirement = EXCLUDED.minimum_requirement,
                minimum_amount = EXCLUDED.minimum_amount,
                usage_limit = EXCLUDED.usage_limit,
                used_count = EXCLUDED.used_count,
                async_usage_count = EXCLUDED.async_usage_count,
                total_sales = EXCLUDED.total_sales,
                applies_once_per_customer = EXCLUDED.applies_once_per_customer,
                starts_at = EXCLUDED.starts_at,
                ends_at = EXCLUDED.ends_at,
                status = EXCLUDED.status,
                customer_selection = EXCLUDED.customer_selection,
                prerequisite_customers = EXCLUDED.prerequisite_customers,
                entitled_products = EXCLUDED.entitled_products,
                entitled_collections = EXCLUDED.entitled_collections,
                entitled_countries = EXCLUDED.entitled_countries,
                combines_with_order_discounts = EXCLUDED.combines_with_order_discounts,
                combines_with_product_discounts = EXCLUDED.combines_with_product_discounts,
                combines_with_shipping_discounts = EXCLUDED.combines_with_shipping_discounts,
                shopify_created_at = EXCLUDED.shopify_created_at,
                shopify_updated_at = EXCLUDED.shopify_updated_at,
                raw_data = EXCLUDED.raw_data,
                updated_at = NOW()
            RETURNING id
            ",
        )
        .bind(record.shop_id)
        .bind(record.shopify_discount_id)
        .bind(&record.title)
        .bind(&record.summary)
        .bind(&record.code)
        .bind(record.codes_count)
        .bind(record.discount_class.as_str())
        .bind(record.discount_type.as_str())
        .bind(record.is_automatic)
        .bind(record.amount)
        .bind(record.percentage)
        .bind(record.minimum_requirement.map(MinimumRequirement::as_str))
        .bind(record.minimum_amount)
        .bind(record.usage_limit)
        .bind(record.used_count)
        .bind(record.async_usage_count)
        .bind(record.total_sales)
        .bind(record.applies_once_per_customer)
        .bind(record.starts_at)
        .bind(record.ends_at)
        .bind(&record.status)
        .bind(&record.customer_selection)
        .bind(&record.prerequisite_customers)
        .bind(&record.entitled_products)
        .bind(&record.entitled_collections)
        .bind(&record.entitled_countries)
        .bind(record.combines_with_order_discounts)
        .bind(record.combines_with_product_discounts)
        .bind(record.combines_with_shipping_discounts)
        .bind(record.shopify_created_at)
        .bind(record.shopify_updated_at)
        .bind(&record.raw_data)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Apply a partial update keyed by the natural key.
    ///
    /// `COALESCE` keeps the stored value wherever the patch carries no field,
    /// which is what gives update events their non-destructive semantics.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row matches the natural key,
    /// `RepositoryError::Database` if the query fails.
    pub async fn apply_patch(
        &self,
        shop_id: ShopId,
        shopify_discount_id: i64,
        patch: &DiscountPatch,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shopify_discounts_raw SET
                title = COALESCE($3, title),
                summary = COALESCE($4, summary),
                code = COALESCE($5, code),
                codes_count = COALESCE($6, codes_count),
                discount_class = COALESCE($7, discount_class),
                discount_type = COALESCE($8, discount_type),
                is_automatic = COALESCE($9, is_automatic),
                amount = COALESCE($10, amount),
                percentage = COALESCE($11, percentage),
                minimum_requirement = COALESCE($12, minimum_requirement),
                minimum_amount = COALESCE($13, minimum_amount),
                usage_limit = COALESCE($14, usage_limit),
                async_usage_count = COALESCE($15, async_usage_count),
                total_sales = COALESCE($16, total_sales),
                applies_once_per_customer = COALESCE($17, applies_once_per_customer),
                starts_at = COALESCE($18, starts_at),
                ends_at = COALESCE($19, ends_at),
                status = COALESCE($20, status),
                customer_selection = COALESCE($21, customer_selection),
                prerequisite_customers = COALESCE($22, prerequisite_customers),
                entitled_products = COALESCE($23, entitled_products),
                entitled_collections = COALESCE($24, entitled_collections),
                entitled_countries = COALESCE($25, entitled_countries),
                combines_with_order_discounts = COALESCE($26, combines_with_order_discounts),
                combines_with_product_discounts = COALESCE($27, combines_with_product_discounts),
                combines_with_shipping_discounts = COALESCE($28, combines_with_shipping_discounts),
                shopify_created_at = COALESCE($29, shopify_created_at),
                shopify_updated_at = COALESCE($30, shopify_updated_at),
                raw_data = COALESCE($31, raw_data),
                used_count = COALESCE($32, used_count),
                updated_at = NOW()
            WHERE shop_id = $1 AND shopify_discount_id = $2
            ",
        )
        .bind(shop_id)
        .bind(shopify_discount_id)
        .bind(&patch.title)
        .bind(&patch.summary)
        .bind(&patch.code)
        .bind(patch.codes_count)
        .bind(patch.discount_class.map(DiscountClass::as_str))
        .bind(patch.discount_type.map(DiscountType::as_str))
        .bind(patch.is_automatic)
        .bind(patch.amount)
        .bind(patch.percentage)
        .bind(patch.minimum_requirement.map(MinimumRequirement::as_str))
        .bind(patch.minimum_amount)
        .bind(patch.usage_limit)
        .bind(patch.async_usage_count)
        .bind(patch.total_sales)
        .bind(patch.applies_once_per_customer)
        .bind(patch.starts_at)
        .bind(patch.ends_at)
        .bind(&patch.status)
        .bind(&patch.customer_selection)
        .bind(&patch.prerequisite_customers)
        .bind(&patch.entitled_products)
        .bind(&patch.entitled_collections)
        .bind(&patch.entitled_countries)
        .bind(patch.combines_with_order_discounts)
        .bind(patch.combines_with_product_discounts)
        .bind(patch.combines_with_shipping_discounts)
        .bind(patch.shopify_created_at)
        .bind(patch.shopify_updated_at)
        .bind(&patch.raw_data)
        .bind(patch.used_count)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Soft-delete a discount: flip the status to INACTIVE, keep the row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn soft_delete(
        &self,
        shop_id: ShopId,
        shopify_discount_id: i64,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE shopify_discounts_raw
            SET status = 'INACTIVE', updated_at = NOW()
            WHERE shop_id = $1 AND shopify_discount_id = $2
            ",
        )
        .bind(shop_id)
        .bind(shopify_discount_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Batched exact-code lookup for the cross-reference linker.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_codes(
        &self,
        shop_id: ShopId,
        codes: &[String],
    ) -> Result<Vec<ResolvedDiscount>, RepositoryError> {
        let rows = sqlx::query_as::<_, ResolvedDiscount>(
            r"
            SELECT id, shopify_discount_id, code, title
            FROM shopify_discounts_raw
            WHERE shop_id = $1 AND code = ANY($2)
            ",
        )
        .bind(shop_id)
        .bind(codes)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Batched exact-title lookup restricted to automatic discounts.
    ///
    /// Titles are not guaranteed unique; callers take the first match.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_automatic_by_titles(
        &self,
        shop_id: ShopId,
        titles: &[String],
    ) -> Result<Vec<ResolvedDiscount>, RepositoryError> {
        let rows = sqlx::query_as::<_, ResolvedDiscount>(
            r"
            SELECT id, shopify_discount_id, code, title
            FROM shopify_discounts_raw
            WHERE shop_id = $1 AND is_automatic = TRUE AND title = ANY($2)
            ",
        )
        .bind(shop_id)
        .bind(titles)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// List discounts for the dashboard menu, ACTIVE first then by title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_shop(
        &self,
        shop_id: ShopId,
    ) -> Result<Vec<DiscountSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, DiscountSummary>(
            r"
            SELECT id, shopify_discount_id, code, title, status, discount_type
            FROM shopify_discounts_raw
            WHERE shop_id = $1
            ORDER BY (status = 'ACTIVE') DESC, title ASC
            ",
        )
        .bind(shop_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Delete all discount rows for a shop (uninstall cleanup only).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_for_shop(&self, shop_id: ShopId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM shopify_discounts_raw WHERE shop_id = $1")
            .bind(shop_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
