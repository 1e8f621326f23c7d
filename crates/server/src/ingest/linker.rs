//! Cross-reference linker: attach stored discount IDs to an order's
//! discount applications and line-item allocations.
//!
//! Code applications match on exact code; automatic applications match on
//! exact title against automatic-only records. Title matching is
//! best-effort - titles are not unique, so the first match wins. A lookup
//! failure never aborts order ingestion; the order is stored with zero
//! cross-references resolved instead.

use std::collections::HashMap;

use promowell_core::ShopId;
use tracing::warn;

use crate::db::{DiscountRepository, RepositoryError, ResolvedDiscount};

use super::order::{DiscountApplication, LineItemAllocation, ResolvedDiscountRef};

/// Read access to stored discounts, injected so the linker can be exercised
/// without a database.
pub trait DiscountLookup {
    /// Find discounts by exact code match, scoped to the shop.
    fn find_by_codes(
        &self,
        shop_id: ShopId,
        codes: &[String],
    ) -> impl Future<Output = Result<Vec<ResolvedDiscount>, RepositoryError>> + Send;

    /// Find automatic discounts by exact title match, scoped to the shop.
    fn find_automatic_by_titles(
        &self,
        shop_id: ShopId,
        titles: &[String],
    ) -> impl Future<Output = Result<Vec<ResolvedDiscount>, RepositoryError>> + Send;
}

impl DiscountLookup for DiscountRepository<'_> {
    async fn find_by_codes(
        &self,
        shop_id: ShopId,
        codes: &[String],
    ) -> Result<Vec<ResolvedDiscount>, RepositoryError> {
        Self::find_by_codes(self, shop_id, codes).await
    }

    async fn find_automatic_by_titles(
        &self,
        shop_id: ShopId,
        titles: &[String],
    ) -> Result<Vec<ResolvedDiscount>, RepositoryError> {
        Self::find_automatic_by_titles(self, shop_id, titles).await
    }
}

/// Resolve and attach discount references in place.
pub async fn link_discount_references<L: DiscountLookup>(
    lookup: &L,
    shop_id: ShopId,
    applications: &mut [DiscountApplication],
    allocations: &mut [LineItemAllocation],
) {
    let codes = dedupe(applications.iter().filter_map(|a| a.code()));
    let titles = dedupe(applications.iter().filter_map(|a| a.automatic_title()));

    let by_code = match batch_lookup(lookup, shop_id, &codes, &titles).await {
        Ok(maps) => maps,
        Err(e) => {
            warn!(error = %e, "discount reference lookup failed, storing order unresolved");
            return;
        }
    };
    let (code_map, title_map) = by_code;

    for app in applications.iter_mut() {
        let hit = app
            .code()
            .and_then(|c| code_map.get(c))
            .or_else(|| app.automatic_title().and_then(|t| title_map.get(t)));
        if let Some(resolved) = hit {
            app.resolved = Some(*resolved);
        }
    }

    for alloc in allocations.iter_mut() {
        let hit = alloc
            .code
            .as_deref()
            .and_then(|c| code_map.get(c))
            .or_else(|| alloc.title.as_deref().and_then(|t| title_map.get(t)));
        if let Some(resolved) = hit {
            alloc.resolved = Some(*resolved);
        }
    }
}

type RefMap = HashMap<String, ResolvedDiscountRef>;

async fn batch_lookup<L: DiscountLookup>(
    lookup: &L,
    shop_id: ShopId,
    codes: &[String],
    titles: &[String],
) -> Result<(RefMap, RefMap), RepositoryError> {
    let mut code_map = RefMap::new();
    if !codes.is_empty() {
        for row in lookup.find_by_codes(shop_id, codes).await? {
            if let Some(code) = row.code {
                code_map.insert(
                    code,
                    ResolvedDiscountRef {
                        discount_record_id: row.id,
                        shopify_discount_id: row.shopify_discount_id,
                    },
                );
            }
        }
    }

    let mut title_map = RefMap::new();
    if !titles.is_empty() {
        for row in lookup.find_automatic_by_titles(shop_id, titles).await? {
            if let Some(title) = row.title {
                // First match wins; duplicate titles are a known precision
                // limit of title-based matching.
                title_map.entry(title).or_insert(ResolvedDiscountRef {
                    discount_record_id: row.id,
                    shopify_discount_id: row.shopify_discount_id,
                });
            }
        }
    }

    Ok((code_map, title_map))
}

fn dedupe<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        if !out.iter().any(|existing| existing == v) {
            out.push(v.to_string());
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use promowell_core::DiscountRecordId;

    use super::*;
    use crate::ingest::order::ApplicationKind;

    struct InMemoryLookup {
        rows: Vec<ResolvedDiscount>,
        fail: bool,
    }

    impl DiscountLookup for InMemoryLookup {
        async fn find_by_codes(
            &self,
            _shop_id: ShopId,
            codes: &[String],
        ) -> Result<Vec<ResolvedDiscount>, RepositoryError> {
            if self.fail {
                return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
            }
            Ok(self
                .rows
                .iter()
                .filter(|r| r.code.as_ref().is_some_and(|c| codes.contains(c)))
                .cloned()
                .collect())
        }

        async fn find_automatic_by_titles(
            &self,
            _shop_id: ShopId,
            titles: &[String],
        ) -> Result<Vec<ResolvedDiscount>, RepositoryError> {
            if self.fail {
                return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
            }
            Ok(self
                .rows
                .iter()
                .filter(|r| r.title.as_ref().is_some_and(|t| titles.contains(t)))
                .cloned()
                .collect())
        }
    }

    fn code_app(code: &str) -> DiscountApplication {
        DiscountApplication {
            kind: ApplicationKind::Code {
                code: code.to_string(),
            },
            allocation_method: None,
            target_selection: None,
            target_type: None,
            value: None,
            resolved: None,
        }
    }

    fn auto_app(title: &str) -> DiscountApplication {
        DiscountApplication {
            kind: ApplicationKind::Automatic {
                title: title.to_string(),
            },
            allocation_method: None,
            target_selection: None,
            target_type: None,
            value: None,
            resolved: None,
        }
    }

    #[tokio::test]
    async fn test_code_application_gets_resolved() {
        let record_id = DiscountRecordId::new(uuid::Uuid::new_v4());
        let lookup = InMemoryLookup {
            rows: vec![ResolvedDiscount {
                id: record_id,
                shopify_discount_id: 555,
                code: Some("SAVE20".to_string()),
                title: None,
            }],
            fail: false,
        };

        let mut apps = vec![code_app("SAVE20"), code_app("MISSING")];
        link_discount_references(&lookup, ShopId::new(uuid::Uuid::new_v4()), &mut apps, &mut []).await;

        let resolved = apps[0].resolved.unwrap();
        assert_eq!(resolved.discount_record_id, record_id);
        assert_eq!(resolved.shopify_discount_id, 555);
        assert!(apps[1].resolved.is_none());
    }

    #[tokio::test]
    async fn test_automatic_application_matches_by_title() {
        let record_id = DiscountRecordId::new(uuid::Uuid::new_v4());
        let lookup = InMemoryLookup {
            rows: vec![ResolvedDiscount {
                id: record_id,
                shopify_discount_id: 777,
                code: None,
                title: Some("Summer Sale".to_string()),
            }],
            fail: false,
        };

        let mut apps = vec![auto_app("Summer Sale")];
        let mut allocs = vec![LineItemAllocation {
            line_item_id: Some("li-1".to_string()),
            allocated_amount: None,
            code: None,
            title: Some("Summer Sale".to_string()),
            resolved: None,
        }];
        link_discount_references(&lookup, ShopId::new(uuid::Uuid::new_v4()), &mut apps, &mut allocs).await;

        assert_eq!(apps[0].resolved.unwrap().shopify_discount_id, 777);
        assert_eq!(allocs[0].resolved.unwrap().shopify_discount_id, 777);
    }

    #[tokio::test]
    async fn test_lookup_failure_leaves_everything_unresolved() {
        let lookup = InMemoryLookup {
            rows: vec![],
            fail: true,
        };

        let mut apps = vec![code_app("SAVE20")];
        link_discount_references(&lookup, ShopId::new(uuid::Uuid::new_v4()), &mut apps, &mut []).await;

        assert!(apps[0].resolved.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_titles_first_match_wins() {
        let first = DiscountRecordId::new(uuid::Uuid::new_v4());
        let lookup = InMemoryLookup {
            rows: vec![
                ResolvedDiscount {
                    id: first,
                    shopify_discount_id: 1,
                    code: None,
                    title: Some("Sale".to_string()),
                },
                ResolvedDiscount {
                    id: DiscountRecordId::new(uuid::Uuid::new_v4()),
                    shopify_discount_id: 2,
                    code: None,
                    title: Some("Sale".to_string()),
                },
            ],
            fail: false,
        };

        let mut apps = vec![auto_app("Sale")];
        link_discount_references(&lookup, ShopId::new(uuid::Uuid::new_v4()), &mut apps, &mut []).await;

        assert_eq!(apps[0].resolved.unwrap().discount_record_id, first);
    }
}
