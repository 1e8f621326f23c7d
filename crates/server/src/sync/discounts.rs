//! Discount historical sync driver (code and automatic connections).

use chrono::{DateTime, Utc};
use promowell_core::{ShopId, extract_numeric_id};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::ingest::IngestionWriter;
use crate::shopify::{AdminClient, Page, ShopCredentials, ShopifyError};

use super::{INTER_PAGE_DELAY, PAGE_SIZE, lookback_window, outcome_success};

/// Result summary of one discounts sync run, split by discount kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountsSyncOutcome {
    pub success: bool,
    pub code_discounts_synced: u32,
    pub automatic_discounts_synced: u32,
    pub errors: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Page-level access to both discount connections.
pub trait DiscountPageFetcher {
    /// Fetch one page of code discounts matching `query`.
    fn fetch_code_page(
        &self,
        after: Option<&str>,
        query: &str,
    ) -> impl Future<Output = Result<Page, ShopifyError>> + Send;

    /// Fetch one page of automatic discounts matching `query`.
    fn fetch_automatic_page(
        &self,
        after: Option<&str>,
        query: &str,
    ) -> impl Future<Output = Result<Page, ShopifyError>> + Send;
}

/// Live fetcher backed by the Admin API.
pub struct AdminDiscountFetcher<'a> {
    pub client: &'a AdminClient,
    pub creds: &'a ShopCredentials,
}

impl DiscountPageFetcher for AdminDiscountFetcher<'_> {
    async fn fetch_code_page(&self, after: Option<&str>, query: &str) -> Result<Page, ShopifyError> {
        self.client
            .code_discounts_page(self.creds, PAGE_SIZE, after, Some(query))
            .await
    }

    async fn fetch_automatic_page(
        &self,
        after: Option<&str>,
        query: &str,
    ) -> Result<Page, ShopifyError> {
        self.client
            .automatic_discounts_page(self.creds, PAGE_SIZE, after, Some(query))
            .await
    }
}

/// Per-item storage for discount nodes.
pub trait DiscountSink {
    /// Normalize and store one discount node (either union wrapper).
    fn store_discount(&self, node: &Value) -> impl Future<Output = Result<(), String>> + Send;
}

/// Live sink writing through the ingestion pipeline.
pub struct WriterDiscountSink<'a> {
    pub writer: &'a IngestionWriter<'a>,
    pub shop_id: ShopId,
}

impl DiscountSink for WriterDiscountSink<'_> {
    async fn store_discount(&self, node: &Value) -> Result<(), String> {
        self.writer
            .upsert_discount_from_node(self.shop_id, node)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Run a historical discounts sync over the given lookback window.
///
/// The code connection is drained first, then the automatic connection;
/// a page-fetch failure aborts only the connection it occurred in.
pub async fn sync_discounts<F, S>(fetcher: &F, sink: &S, days_back: u32) -> DiscountsSyncOutcome
where
    F: DiscountPageFetcher,
    S: DiscountSink,
{
    let (start_date, end_date) = lookback_window(days_back);
    let query = format!("created_at:>={}", start_date.format("%Y-%m-%dT%H:%M:%SZ"));

    let mut errors: Vec<String> = Vec::new();

    let code_discounts_synced =
        drain_connection(fetcher, Connection::Code, &query, sink, &mut errors).await;
    let automatic_discounts_synced =
        drain_connection(fetcher, Connection::Automatic, &query, sink, &mut errors).await;

    let success = outcome_success(code_discounts_synced + automatic_discounts_synced, &errors);
    info!(
        code_discounts_synced,
        automatic_discounts_synced,
        error_count = errors.len(),
        success,
        "discounts sync finished"
    );

    DiscountsSyncOutcome {
        success,
        code_discounts_synced,
        automatic_discounts_synced,
        errors,
        start_date,
        end_date,
    }
}

#[derive(Clone, Copy)]
enum Connection {
    Code,
    Automatic,
}

impl Connection {
    const fn kind(self) -> &'static str {
        match self {
            Self::Code => "code discount",
            Self::Automatic => "automatic discount",
        }
    }
}

async fn drain_connection<F, S>(
    fetcher: &F,
    conn: Connection,
    query: &str,
    sink: &S,
    errors: &mut Vec<String>,
) -> u32
where
    F: DiscountPageFetcher,
    S: DiscountSink,
{
    let kind = conn.kind();
    let mut synced: u32 = 0;
    let mut after: Option<String> = None;

    loop {
        let fetched = match conn {
            Connection::Code => fetcher.fetch_code_page(after.as_deref(), query).await,
            Connection::Automatic => fetcher.fetch_automatic_page(after.as_deref(), query).await,
        };
        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                warn!(kind, error = %e, "discount page fetch failed, aborting connection");
                errors.push(format!("{kind} page fetch failed: {e}"));
                break;
            }
        };

        for node in &page.nodes {
            match sink.store_discount(node).await {
                Ok(()) => synced += 1,
                Err(e) => {
                    let id = extract_numeric_id(&node["id"]);
                    errors.push(format!("{kind} {id}: {e}"));
                }
            }
        }

        if !page.has_next_page {
            break;
        }
        after = page.end_cursor;
        tokio::time::sleep(INTER_PAGE_DELAY).await;
    }

    synced
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    struct StaticFetcher {
        code_pages: Mutex<Vec<Result<Page, ShopifyError>>>,
        automatic_pages: Mutex<Vec<Result<Page, ShopifyError>>>,
    }

    impl DiscountPageFetcher for StaticFetcher {
        async fn fetch_code_page(
            &self,
            _after: Option<&str>,
            _query: &str,
        ) -> Result<Page, ShopifyError> {
            self.code_pages.lock().unwrap().remove(0)
        }

        async fn fetch_automatic_page(
            &self,
            _after: Option<&str>,
            _query: &str,
        ) -> Result<Page, ShopifyError> {
            self.automatic_pages.lock().unwrap().remove(0)
        }
    }

    struct CountingSink {
        fail_id: i64,
        stored: Mutex<Vec<i64>>,
    }

    impl DiscountSink for CountingSink {
        async fn store_discount(&self, node: &Value) -> Result<(), String> {
            let id = extract_numeric_id(&node["id"]);
            if id == self.fail_id {
                return Err("malformed discount".to_string());
            }
            self.stored.lock().unwrap().push(id);
            Ok(())
        }
    }

    fn page(ids: &[i64]) -> Page {
        Page {
            nodes: ids
                .iter()
                .map(|id| json!({ "id": format!("gid://shopify/DiscountCodeNode/{id}") }))
                .collect(),
            has_next_page: false,
            end_cursor: None,
        }
    }

    #[tokio::test]
    async fn test_both_connections_counted_separately() {
        let fetcher = StaticFetcher {
            code_pages: Mutex::new(vec![Ok(page(&[1, 2]))]),
            automatic_pages: Mutex::new(vec![Ok(page(&[3]))]),
        };
        let sink = CountingSink {
            fail_id: -1,
            stored: Mutex::new(Vec::new()),
        };

        let outcome = sync_discounts(&fetcher, &sink, 365).await;
        assert!(outcome.success);
        assert_eq!(outcome.code_discounts_synced, 2);
        assert_eq!(outcome.automatic_discounts_synced, 1);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn test_code_connection_failure_still_syncs_automatic() {
        let fetcher = StaticFetcher {
            code_pages: Mutex::new(vec![Err(ShopifyError::RateLimited(30))]),
            automatic_pages: Mutex::new(vec![Ok(page(&[9]))]),
        };
        let sink = CountingSink {
            fail_id: -1,
            stored: Mutex::new(Vec::new()),
        };

        let outcome = sync_discounts(&fetcher, &sink, 365).await;
        assert!(outcome.success);
        assert_eq!(outcome.code_discounts_synced, 0);
        assert_eq!(outcome.automatic_discounts_synced, 1);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_item_failure_is_recorded_and_skipped() {
        let fetcher = StaticFetcher {
            code_pages: Mutex::new(vec![Ok(page(&[1, 2, 3]))]),
            automatic_pages: Mutex::new(vec![Ok(page(&[]))]),
        };
        let sink = CountingSink {
            fail_id: 2,
            stored: Mutex::new(Vec::new()),
        };

        let outcome = sync_discounts(&fetcher, &sink, 365).await;
        assert!(outcome.success);
        assert_eq!(outcome.code_discounts_synced, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("code discount 2"));
    }
}
