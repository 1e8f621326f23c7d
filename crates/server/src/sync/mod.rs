//! Historical sync drivers for orders and discounts.
//!
//! Both drivers page through the Admin API at the maximum page size,
//! pushing every item through the same normalize/link/write path as
//! webhooks. Per-item failures are collected and skipped; only a
//! page-fetch failure aborts the run, keeping already-written pages.

pub mod discounts;
pub mod orders;

pub use discounts::{
    AdminDiscountFetcher, DiscountPageFetcher, DiscountSink, DiscountsSyncOutcome,
    WriterDiscountSink, sync_discounts,
};
pub use orders::{
    AdminOrderFetcher, OrderPageFetcher, OrderSink, OrdersSyncOutcome, WriterOrderSink,
    sync_orders,
};

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Maximum items per page allowed by the Admin API.
pub const PAGE_SIZE: u32 = 250;

/// Courtesy delay between page fetches, skipped on the final page.
pub const INTER_PAGE_DELAY: Duration = Duration::from_millis(500);

/// Lookback bounds for a sync entity.
#[derive(Debug, Clone, Copy)]
pub struct LookbackBounds {
    pub default_days: u32,
    pub min_days: u32,
    pub max_days: u32,
}

/// Orders are high-volume transactional events: short default window.
pub const ORDERS_LOOKBACK: LookbackBounds = LookbackBounds {
    default_days: 60,
    min_days: 1,
    max_days: 365,
};

/// Discounts are long-lived configuration: long default window.
pub const DISCOUNTS_LOOKBACK: LookbackBounds = LookbackBounds {
    default_days: 365,
    min_days: 1,
    max_days: 730,
};

/// Validate a requested `daysBack` against the entity's bounds.
///
/// # Errors
///
/// Returns a human-readable rejection for out-of-bounds values; the caller
/// maps it to HTTP 400 before any fetch begins.
pub fn validate_days_back(requested: Option<i64>, bounds: LookbackBounds) -> Result<u32, String> {
    match requested {
        None => Ok(bounds.default_days),
        Some(days) if days >= i64::from(bounds.min_days) && days <= i64::from(bounds.max_days) => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Ok(days as u32)
        }
        Some(days) => Err(format!(
            "daysBack must be between {} and {}, got {days}",
            bounds.min_days, bounds.max_days
        )),
    }
}

/// The `[start, end]` window for a lookback, end being now.
#[must_use]
pub fn lookback_window(days_back: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = Utc::now();
    let start = end - chrono::Duration::days(i64::from(days_back));
    (start, end)
}

/// Partial success counts as success: the only unconditional failure is
/// zero items synced with at least one error.
#[must_use]
pub fn outcome_success(items_synced: u32, errors: &[String]) -> bool {
    errors.is_empty() || items_synced > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_back_defaults() {
        assert_eq!(validate_days_back(None, ORDERS_LOOKBACK), Ok(60));
        assert_eq!(validate_days_back(None, DISCOUNTS_LOOKBACK), Ok(365));
    }

    #[test]
    fn test_days_back_bounds() {
        assert_eq!(validate_days_back(Some(1), ORDERS_LOOKBACK), Ok(1));
        assert_eq!(validate_days_back(Some(365), ORDERS_LOOKBACK), Ok(365));
        assert!(validate_days_back(Some(0), ORDERS_LOOKBACK).is_err());
        assert!(validate_days_back(Some(366), ORDERS_LOOKBACK).is_err());
        assert_eq!(validate_days_back(Some(730), DISCOUNTS_LOOKBACK), Ok(730));
        assert!(validate_days_back(Some(731), DISCOUNTS_LOOKBACK).is_err());
    }

    #[test]
    fn test_success_rules() {
        assert!(outcome_success(0, &[]));
        assert!(outcome_success(2, &["item 2 failed".to_string()]));
        assert!(!outcome_success(0, &["page fetch failed".to_string()]));
    }
}
