//! Read-side repository for the per-day performance aggregates.
//!
//! The `discount_performance_daily` table is written by the aggregation job
//! (one row per shop, day, and optionally discount). This repository only
//! reads it; the dashboard metrics layer does the windowing and
//! period-over-period math in memory.

use chrono::NaiveDate;
use promowell_core::{DiscountRecordId, ShopId};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// One day of performance for a shop, optionally scoped to a discount.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyPerformanceRow {
    pub metric_date: NaiveDate,
    /// `None` for the shop-wide (all discounts) rollup rows.
    pub discount_id: Option<DiscountRecordId>,
    pub orders_count: i64,
    pub total_orders_value: Decimal,
    pub total_discount_expense: Decimal,
    pub revenue_uplift: Decimal,
    pub average_order_value: Decimal,
}

/// Repository for daily performance reads.
pub struct PerformanceRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PerformanceRepository<'a> {
    /// Create a new performance repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch daily rows for a shop within `[start, end]`, oldest first.
    ///
    /// When `discount_id` is `None`, only shop-wide rollup rows (those with
    /// a NULL discount scope) are returned, so per-discount rows are never
    /// double-counted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn daily_rows(
        &self,
        shop_id: ShopId,
        discount_id: Option<DiscountRecordId>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPerformanceRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, DailyPerformanceRow>(
            r"
            SELECT metric_date, discount_id, orders_count,
                   total_orders_value, total_discount_expense,
                   revenue_uplift, average_order_value
            FROM discount_performance_daily
            WHERE shop_id = $1
              AND discount_id IS NOT DISTINCT FROM $2
              AND metric_date >= $3
              AND metric_date <= $4
            ORDER BY metric_date ASC
            ",
        )
        .bind(shop_id)
        .bind(discount_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Delete all performance rows for a shop (uninstall cleanup only).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_for_shop(&self, shop_id: ShopId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM discount_performance_daily WHERE shop_id = $1")
            .bind(shop_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
