//! Order historical sync driver.

use chrono::{DateTime, Utc};
use promowell_core::{ShopId, extract_numeric_id};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::ingest::IngestionWriter;
use crate::shopify::{AdminClient, Page, ShopCredentials, ShopifyError};

use super::{INTER_PAGE_DELAY, PAGE_SIZE, lookback_window, outcome_success};

/// Result summary of one orders sync run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersSyncOutcome {
    pub success: bool,
    pub orders_synced: u32,
    pub errors: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Page-level access to the orders connection, injected for testability.
pub trait OrderPageFetcher {
    /// Fetch one page of orders matching `query`.
    fn fetch_page(
        &self,
        after: Option<&str>,
        query: &str,
    ) -> impl Future<Output = Result<Page, ShopifyError>> + Send;
}

/// Live fetcher backed by the Admin API.
pub struct AdminOrderFetcher<'a> {
    pub client: &'a AdminClient,
    pub creds: &'a ShopCredentials,
}

impl OrderPageFetcher for AdminOrderFetcher<'_> {
    async fn fetch_page(&self, after: Option<&str>, query: &str) -> Result<Page, ShopifyError> {
        self.client
            .orders_page(self.creds, PAGE_SIZE, after, Some(query))
            .await
    }
}

/// Per-item storage, injected so the driver can be tested without a store.
pub trait OrderSink {
    /// Normalize, link, and store one order node.
    fn store_order(&self, node: &Value) -> impl Future<Output = Result<(), String>> + Send;
}

/// Live sink writing through the ingestion pipeline.
pub struct WriterOrderSink<'a> {
    pub writer: &'a IngestionWriter<'a>,
    pub shop_id: ShopId,
}

impl OrderSink for WriterOrderSink<'_> {
    async fn store_order(&self, node: &Value) -> Result<(), String> {
        self.writer
            .upsert_order_from_node(self.shop_id, node)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Run a historical orders sync over the given lookback window.
///
/// Per-item failures are recorded and skipped; a page-fetch failure stops
/// pagination but keeps everything already written.
pub async fn sync_orders<F, S>(fetcher: &F, sink: &S, days_back: u32) -> OrdersSyncOutcome
where
    F: OrderPageFetcher,
    S: OrderSink,
{
    let (start_date, end_date) = lookback_window(days_back);
    let query = format!("created_at:>={}", start_date.format("%Y-%m-%dT%H:%M:%SZ"));

    let mut orders_synced: u32 = 0;
    let mut errors: Vec<String> = Vec::new();
    let mut after: Option<String> = None;

    loop {
        let page = match fetcher.fetch_page(after.as_deref(), &query).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "orders page fetch failed, aborting sync");
                errors.push(format!("page fetch failed: {e}"));
                break;
            }
        };

        for node in &page.nodes {
            match sink.store_order(node).await {
                Ok(()) => orders_synced += 1,
                Err(e) => {
                    let id = extract_numeric_id(&node["id"]);
                    errors.push(format!("order {id}: {e}"));
                }
            }
        }

        if !page.has_next_page {
            break;
        }
        after = page.end_cursor;
        tokio::time::sleep(INTER_PAGE_DELAY).await;
    }

    let success = outcome_success(orders_synced, &errors);
    info!(orders_synced, error_count = errors.len(), success, "orders sync finished");

    OrdersSyncOutcome {
        success,
        orders_synced,
        errors,
        start_date,
        end_date,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    struct StaticFetcher {
        pages: Mutex<Vec<Result<Page, ShopifyError>>>,
    }

    impl OrderPageFetcher for StaticFetcher {
        async fn fetch_page(&self, _after: Option<&str>, _query: &str) -> Result<Page, ShopifyError> {
            self.pages.lock().unwrap().remove(0)
        }
    }

    struct FailOnId {
        fail_id: i64,
        stored: Mutex<Vec<i64>>,
    }

    impl OrderSink for FailOnId {
        async fn store_order(&self, node: &Value) -> Result<(), String> {
            let id = extract_numeric_id(&node["id"]);
            if id == self.fail_id {
                return Err("malformed order".to_string());
            }
            self.stored.lock().unwrap().push(id);
            Ok(())
        }
    }

    fn page(ids: &[i64], has_next: bool) -> Page {
        Page {
            nodes: ids.iter().map(|id| json!({ "id": id })).collect(),
            has_next_page: has_next,
            end_cursor: has_next.then(|| "cursor".to_string()),
        }
    }

    #[tokio::test]
    async fn test_partial_success_counts_as_success() {
        let fetcher = StaticFetcher {
            pages: Mutex::new(vec![Ok(page(&[1, 2, 3], false))]),
        };
        let sink = FailOnId {
            fail_id: 2,
            stored: Mutex::new(Vec::new()),
        };

        let outcome = sync_orders(&fetcher, &sink, 60).await;
        assert!(outcome.success);
        assert_eq!(outcome.orders_synced, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("order 2"));
        assert_eq!(*sink.stored.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_page_fetch_failure_aborts_but_keeps_prior_pages() {
        let fetcher = StaticFetcher {
            pages: Mutex::new(vec![
                Ok(page(&[1, 2], true)),
                Err(ShopifyError::RateLimited(30)),
            ]),
        };
        let sink = FailOnId {
            fail_id: -1,
            stored: Mutex::new(Vec::new()),
        };

        let outcome = sync_orders(&fetcher, &sink, 60).await;
        assert_eq!(outcome.orders_synced, 2);
        assert_eq!(outcome.errors.len(), 1);
        // Partial success: two orders landed before the abort.
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_fetch_failure_before_any_item_is_failure() {
        let fetcher = StaticFetcher {
            pages: Mutex::new(vec![Err(ShopifyError::Unauthorized("expired".to_string()))]),
        };
        let sink = FailOnId {
            fail_id: -1,
            stored: Mutex::new(Vec::new()),
        };

        let outcome = sync_orders(&fetcher, &sink, 60).await;
        assert!(!outcome.success);
        assert_eq!(outcome.orders_synced, 0);
        assert_eq!(outcome.errors.len(), 1);
    }
}
