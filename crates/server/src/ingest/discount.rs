//! Discount payload normalization.
//!
//! Discounts arrive as GraphQL union variants (code or automatic, each with
//! basic/BXGY/free-shipping/app members) or as sparse REST webhook payloads
//! with no discriminator at all. The REST case is enriched by a node fetch
//! when possible; otherwise it degrades to a lossy record with only
//! title/status/timestamps and an inferred type tag.

use chrono::{DateTime, Utc};
use promowell_core::{ShopId, decimal_from_value, extract_numeric_id};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use crate::db::{DiscountClass, DiscountPatch, DiscountRecord, DiscountType, MinimumRequirement};

/// Canonical discount shape, independent of the source payload variant.
///
/// Fields are optional where the source may not carry them, so the same
/// shape serves both full upserts and partial patches.
#[derive(Debug, Clone)]
pub struct NormalizedDiscount {
    pub shopify_discount_id: i64,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub code: Option<String>,
    pub codes: Vec<String>,
    /// Total code count from `codesCount`, which can exceed the fetched
    /// `codes` page.
    pub codes_count: Option<i64>,
    pub discount_class: DiscountClass,
    pub discount_type: DiscountType,
    pub is_automatic: bool,
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
    pub prerequisite_customers: Vec<Value>,
    pub entitled_products: Vec<String>,
    pub entitled_collections: Vec<String>,
    pub entitled_countries: Vec<String>,
    /// (order, product, shipping) combinability, when the payload says.
    pub combines_with: Option<(bool, bool, bool)>,
    pub shopify_created_at: Option<DateTime<Utc>>,
    pub shopify_updated_at: Option<DateTime<Utc>>,
    pub raw: Value,
}

/// If the payload is REST-shaped (no union object and no discriminator),
/// return the structured identifier to fetch the typed node by.
#[must_use]
pub fn enrichment_gid(payload: &Value) -> Option<&str> {
    if payload.get("codeDiscount").is_some()
        || payload.get("automaticDiscount").is_some()
        || payload.get("__typename").is_some()
    {
        return None;
    }
    payload
        .get("admin_graphql_api_id")
        .or_else(|| payload.get("id"))
        .and_then(Value::as_str)
        .filter(|s| s.starts_with("gid://"))
}

/// Normalize a discount payload of any shape.
///
/// `payload` is the outer webhook/sync body (kept for REST field fallbacks
/// and the external ID); when a node fetch produced a typed union object,
/// pass it as `node`.
#[must_use]
pub fn normalize_discount(payload: &Value, node: Option<&Value>) -> NormalizedDiscount {
    let shopify_discount_id = extract_numeric_id(
        payload
            .get("admin_graphql_api_id")
            .unwrap_or(&payload["id"]),
    );

    // Unwrap the union object: prefer the fetched node, then the inline
    // union fields, then the payload itself.
    let (discount, automatic_hint) = match node {
        Some(n) => {
            if let Some(code) = n.get("codeDiscount") {
                (code, false)
            } else if let Some(auto) = n.get("automaticDiscount") {
                (auto, true)
            } else {
                unwrap_union(n)
            }
        }
        None => unwrap_union(payload),
    };

    let typename = discount.get("__typename").and_then(Value::as_str);
    let mut normalized = classify(discount, typename, automatic_hint);

    normalized.shopify_discount_id = shopify_discount_id;
    normalized.raw = payload.clone();

    // REST field fallbacks for timestamps and status.
    if normalized.starts_at.is_none() {
        normalized.starts_at = datetime_field(payload, &["starts_at", "start_at"]);
    }
    if normalized.ends_at.is_none() {
        normalized.ends_at = datetime_field(payload, &["ends_at", "end_at"]);
    }
    if normalized.status.is_none() {
        normalized.status = string_field(payload, &["status"]);
    }
    if normalized.title.is_none() {
        normalized.title = string_field(payload, &["title"]);
    }
    if normalized.shopify_created_at.is_none() {
        normalized.shopify_created_at = datetime_field(payload, &["created_at"]);
    }
    if normalized.shopify_updated_at.is_none() {
        normalized.shopify_updated_at = datetime_field(payload, &["updated_at"]);
    }
    if normalized.used_count.is_none() {
        normalized.used_count = payload.get("usage_count").and_then(Value::as_i64);
    }

    // REST price-rule value, when no union branch set one.
    if normalized.amount.is_none() && normalized.percentage.is_none() {
        if let (Some(value), Some(value_type)) = (
            payload.get("value").and_then(decimal_from_value),
            payload.get("value_type").and_then(Value::as_str),
        ) {
            match value_type {
                "fixed_amount" => normalized.amount = Some(value.abs()),
                "percentage" => normalized.percentage = Some(value.abs()),
                _ => {}
            }
        }
    }

    // Type tag is never left empty: infer from the value shape, then the
    // class, then fall back to app.
    if typename.is_none() {
        normalized.discount_type = if normalized.amount.is_some() {
            DiscountType::BasicAmount
        } else if normalized.percentage.is_some() {
            DiscountType::BasicPercentage
        } else if normalized.discount_class == DiscountClass::Shipping {
            DiscountType::FreeShipping
        } else {
            DiscountType::App
        };
    }

    // A free-shipping discount is always shipping class, and vice versa.
    if normalized.discount_type == DiscountType::FreeShipping {
        normalized.discount_class = DiscountClass::Shipping;
    } else if normalized.discount_class == DiscountClass::Shipping {
        normalized.discount_type = DiscountType::FreeShipping;
    }

    normalized
}

impl NormalizedDiscount {
    /// Build a full storage record for creation-type events and sync.
    #[must_use]
    pub fn to_record(&self, shop_id: ShopId) -> DiscountRecord {
        DiscountRecord {
            shop_id,
            shopify_discount_id: self.shopify_discount_id,
            title: self.title.clone().unwrap_or_default(),
            summary: self.summary.clone(),
            code: self.code.clone(),
            codes_count: self
                .codes_count
                .and_then(|c| i32::try_from(c).ok())
                .or_else(|| i32::try_from(self.codes.len()).ok())
                .unwrap_or(i32::MAX),
            discount_class: self.discount_class,
            discount_type: self.discount_type,
            is_automatic: self.is_automatic,
            amount: self.amount,
            percentage: self.percentage,
            minimum_requirement: self.minimum_requirement,
            minimum_amount: self.minimum_amount,
            usage_limit: self.usage_limit,
            used_count: self.used_count.unwrap_or(0),
            async_usage_count: self.async_usage_count.unwrap_or(0),
            total_sales: self.total_sales,
            applies_once_per_customer: self.applies_once_per_customer.unwrap_or(false),
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            status: self.status.clone().unwrap_or_else(|| "ACTIVE".to_string()),
            customer_selection: self
                .customer_selection
                .clone()
                .unwrap_or_else(|| "all".to_string()),
            prerequisite_customers: json!(self.prerequisite_customers),
            entitled_products: json!(self.entitled_products),
            entitled_collections: json!(self.entitled_collections),
            entitled_countries: json!(self.entitled_countries),
            combines_with_order_discounts: self.combines_with.is_some_and(|c| c.0),
            combines_with_product_discounts: self.combines_with.is_some_and(|c| c.1),
            combines_with_shipping_discounts: self.combines_with.is_some_and(|c| c.2),
            shopify_created_at: self.shopify_created_at,
            shopify_updated_at: self.shopify_updated_at,
            raw_data: self.raw.clone(),
        }
    }

    /// Build a partial patch for update-type events: only fields the payload
    /// actually carried are set.
    #[must_use]
    pub fn to_patch(&self) -> DiscountPatch {
        DiscountPatch {
            title: self.title.clone(),
            summary: self.summary.clone(),
            code: self.code.clone(),
            codes_count: self
                .codes_count
                .and_then(|c| i32::try_from(c).ok())
                .or_else(|| {
                    if self.codes.is_empty() {
                        None
                    } else {
                        i32::try_from(self.codes.len()).ok()
                    }
                }),
            discount_class: Some(self.discount_class),
            discount_type: Some(self.discount_type),
            is_automatic: Some(self.is_automatic),
            amount: self.amount,
            percentage: self.percentage,
            minimum_requirement: self.minimum_requirement,
            minimum_amount: self.minimum_amount,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
            async_usage_count: self.async_usage_count,
            total_sales: self.total_sales,
            applies_once_per_customer: self.applies_once_per_customer,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            status: self.status.clone(),
            customer_selection: self.customer_selection.clone(),
            prerequisite_customers: if self.prerequisite_customers.is_empty() {
                None
            } else {
                Some(json!(self.prerequisite_customers))
            },
            entitled_products: if self.entitled_products.is_empty() {
                None
            } else {
                Some(json!(self.entitled_products))
            },
            entitled_collections: if self.entitled_collections.is_empty() {
                None
            } else {
                Some(json!(self.entitled_collections))
            },
            entitled_countries: if self.entitled_countries.is_empty() {
                None
            } else {
                Some(json!(self.entitled_countries))
            },
            combines_with_order_discounts: self.combines_with.map(|c| c.0),
            combines_with_product_discounts: self.combines_with.map(|c| c.1),
            combines_with_shipping_discounts: self.combines_with.map(|c| c.2),
            shopify_created_at: self.shopify_created_at,
            shopify_updated_at: self.shopify_updated_at,
            raw_data: Some(self.raw.clone()),
        }
    }
}

fn unwrap_union(payload: &Value) -> (&Value, bool) {
    if let Some(code) = payload.get("codeDiscount") {
        (code, false)
    } else if let Some(auto) = payload.get("automaticDiscount") {
        (auto, true)
    } else {
        (payload, false)
    }
}

fn empty(raw: Value, is_automatic: bool) -> NormalizedDiscount {
    NormalizedDiscount {
        shopify_discount_id: 0,
        title: None,
        summary: None,
        code: None,
        codes: Vec::new(),
        codes_count: None,
        discount_class: DiscountClass::Product,
        discount_type: DiscountType::App,
        is_automatic,
        amount: None,
        percentage: None,
        minimum_requirement: None,
        minimum_amount: None,
        usage_limit: None,
        used_count: None,
        async_usage_count: None,
        total_sales: None,
        applies_once_per_customer: None,
        starts_at: None,
        ends_at: None,
        status: None,
        customer_selection: None,
        prerequisite_customers: Vec::new(),
        entitled_products: Vec::new(),
        entitled_collections: Vec::new(),
        entitled_countries: Vec::new(),
        combines_with: None,
        shopify_created_at: None,
        shopify_updated_at: None,
        raw,
    }
}

fn classify(discount: &Value, typename: Option<&str>, automatic_hint: bool) -> NormalizedDiscount {
    let is_automatic = automatic_hint || typename.is_some_and(|t| t.starts_with("DiscountAutomatic"));
    let mut n = empty(Value::Null, is_automatic);

    n.title = string_field(discount, &["title"]);
    n.summary = string_field(discount, &["summary"]);
    n.status = string_field(discount, &["status"]);
    n.starts_at = datetime_field(discount, &["startsAt"]);
    n.ends_at = datetime_field(discount, &["endsAt"]);
    n.shopify_created_at = datetime_field(discount, &["createdAt"]);
    n.shopify_updated_at = datetime_field(discount, &["updatedAt"]);
    n.usage_limit = discount.get("usageLimit").and_then(Value::as_i64);
    n.async_usage_count = discount.get("asyncUsageCount").and_then(Value::as_i64);
    n.total_sales = discount.get("totalSales").and_then(decimal_from_value);
    n.applies_once_per_customer = discount
        .get("appliesOncePerCustomer")
        .and_then(Value::as_bool);
    n.codes = parse_codes(discount);
    n.code = n.codes.first().cloned();
    n.codes_count = discount["codesCount"].get("count").and_then(Value::as_i64);
    n.combines_with = discount.get("combinesWith").map(|c| {
        (
            c.get("orderDiscounts").and_then(Value::as_bool).unwrap_or(false),
            c.get("productDiscounts").and_then(Value::as_bool).unwrap_or(false),
            c.get("shippingDiscounts").and_then(Value::as_bool).unwrap_or(false),
        )
    });

    match typename {
        Some("DiscountCodeBasic" | "DiscountAutomaticBasic") => {
            n.discount_class = DiscountClass::Product;
            parse_basic_value(discount, &mut n);
            parse_minimum_requirement(discount, &mut n);
            parse_customer_selection(discount, &mut n);
            parse_entitled_items(discount, &mut n);
        }
        Some("DiscountCodeBxgy" | "DiscountAutomaticBxgy") => {
            n.discount_class = DiscountClass::Product;
            n.discount_type = DiscountType::Bxgy;
        }
        Some("DiscountCodeFreeShipping" | "DiscountAutomaticFreeShipping") => {
            n.discount_class = DiscountClass::Shipping;
            n.discount_type = DiscountType::FreeShipping;
            parse_minimum_requirement(discount, &mut n);
            parse_customer_selection(discount, &mut n);
            if let Some(countries) = discount
                .get("destinationSelection")
                .and_then(|d| d.get("countries"))
                .and_then(Value::as_array)
            {
                n.entitled_countries = countries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect();
            }
        }
        Some("DiscountCodeApp" | "DiscountAutomaticApp") => {
            n.discount_class = DiscountClass::Product;
            n.discount_type = DiscountType::App;
        }
        _ => {
            // No discriminator: the caller infers the type tag from the
            // REST fields after the fact.
        }
    }

    n
}

fn parse_basic_value(discount: &Value, n: &mut NormalizedDiscount) {
    let value = &discount["customerGets"]["value"];
    match value.get("__typename").and_then(Value::as_str) {
        Some("DiscountAmount") => {
            n.amount = value.get("amount").and_then(decimal_from_value);
            n.discount_type = DiscountType::BasicAmount;
        }
        Some("DiscountPercentage") => {
            n.percentage = value.get("percentage").and_then(decimal_from_value);
            n.discount_type = DiscountType::BasicPercentage;
        }
        // Discriminator-less node responses still carry exactly one of the
        // two value fields.
        _ => {
            if let Some(amount) = value.get("amount").and_then(decimal_from_value) {
                n.amount = Some(amount);
                n.discount_type = DiscountType::BasicAmount;
            } else if let Some(pct) = value.get("percentage").and_then(decimal_from_value) {
                n.percentage = Some(pct);
                n.discount_type = DiscountType::BasicPercentage;
            }
        }
    }
}

fn parse_minimum_requirement(discount: &Value, n: &mut NormalizedDiscount) {
    let req = &discount["minimumRequirement"];
    if let Some(subtotal) = req
        .get("greaterThanOrEqualToSubtotal")
        .and_then(decimal_from_value)
    {
        n.minimum_requirement = Some(MinimumRequirement::Subtotal);
        n.minimum_amount = Some(subtotal);
    } else if let Some(quantity) = req
        .get("greaterThanOrEqualToQuantity")
        .and_then(decimal_from_value)
    {
        n.minimum_requirement = Some(MinimumRequirement::Quantity);
        n.minimum_amount = Some(quantity);
    }
}

fn parse_customer_selection(discount: &Value, n: &mut NormalizedDiscount) {
    let selection = &discount["customerSelection"];
    if selection.is_null() {
        return;
    }
    let all = selection.get("__typename").and_then(Value::as_str) == Some("DiscountCustomerAll")
        || selection.get("allCustomers").and_then(Value::as_bool) == Some(true);
    if all {
        n.customer_selection = Some("all".to_string());
    } else if let Some(segments) = selection.get("segments").and_then(Value::as_array) {
        n.customer_selection = Some("prerequisite".to_string());
        n.prerequisite_customers = segments
            .iter()
            .map(|s| json!({ "id": s.get("id"), "name": s.get("name") }))
            .collect();
    }
}

fn parse_entitled_items(discount: &Value, n: &mut NormalizedDiscount) {
    let items = &discount["customerGets"]["items"];
    n.entitled_products = gid_list(&items["products"]);
    n.entitled_collections = gid_list(&items["collections"]);
}

/// Collect node GIDs from a connection, accepting both `nodes` and `edges`
/// pagination shapes.
fn gid_list(connection: &Value) -> Vec<String> {
    if let Some(nodes) = connection.get("nodes").and_then(Value::as_array) {
        return nodes
            .iter()
            .filter_map(|node| node.get("id").and_then(Value::as_str))
            .map(String::from)
            .collect();
    }
    connection
        .get("edges")
        .and_then(Value::as_array)
        .map(|edges| {
            edges
                .iter()
                .filter_map(|e| e["node"].get("id").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_codes(discount: &Value) -> Vec<String> {
    let codes = &discount["codes"];
    if let Some(nodes) = codes.get("nodes").and_then(Value::as_array) {
        return nodes
            .iter()
            .filter_map(|node| node.get("code").and_then(Value::as_str))
            .map(String::from)
            .collect();
    }
    codes
        .get("edges")
        .and_then(Value::as_array)
        .map(|edges| {
            edges
                .iter()
                .filter_map(|e| e["node"].get("code").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn string_field(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        payload
            .get(k)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    })
}

fn datetime_field(payload: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter().find_map(|k| {
        payload
            .get(k)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_code_basic_percentage() {
        let payload = serde_json::json!({
            "admin_graphql_api_id": "gid://shopify/DiscountCodeNode/123",
            "codeDiscount": {
                "__typename": "DiscountCodeBasic",
                "title": "Welcome",
                "summary": "10% off",
                "status": "ACTIVE",
                "startsAt": "2025-01-01T00:00:00Z",
                "codes": { "nodes": [{ "code": "WELCOME10" }] },
                "customerGets": { "value": { "__typename": "DiscountPercentage", "percentage": 0.1 } },
                "combinesWith": { "orderDiscounts": false, "productDiscounts": true, "shippingDiscounts": false },
            },
        });

        let d = normalize_discount(&payload, None);
        assert_eq!(d.shopify_discount_id, 123);
        assert_eq!(d.discount_type, DiscountType::BasicPercentage);
        assert_eq!(d.discount_class, DiscountClass::Product);
        assert_eq!(d.percentage, Some(dec("0.1")));
        assert!(d.amount.is_none());
        assert_eq!(d.code.as_deref(), Some("WELCOME10"));
        assert!(!d.is_automatic);
        assert_eq!(d.combines_with, Some((false, true, false)));
    }

    #[test]
    fn test_code_basic_amount_is_exclusive() {
        let payload = serde_json::json!({
            "id": "gid://shopify/DiscountCodeNode/5",
            "codeDiscount": {
                "__typename": "DiscountCodeBasic",
                "title": "Five off",
                "codes": { "edges": [{ "node": { "code": "FIVE" } }] },
                "customerGets": { "value": {
                    "__typename": "DiscountAmount",
                    "amount": { "amount": "5.00", "currencyCode": "USD" },
                }},
            },
        });

        let d = normalize_discount(&payload, None);
        assert_eq!(d.amount, Some(dec("5.00")));
        assert!(d.percentage.is_none());
        assert_eq!(d.discount_type, DiscountType::BasicAmount);
    }

    #[test]
    fn test_automatic_free_shipping() {
        let payload = serde_json::json!({
            "id": "gid://shopify/DiscountAutomaticNode/77",
            "automaticDiscount": {
                "__typename": "DiscountAutomaticFreeShipping",
                "title": "Free shipping over 50",
                "minimumRequirement": {
                    "greaterThanOrEqualToSubtotal": { "amount": "50.0" },
                },
                "destinationSelection": { "countries": ["US", "CA"] },
            },
        });

        let d = normalize_discount(&payload, None);
        assert!(d.is_automatic);
        assert_eq!(d.discount_class, DiscountClass::Shipping);
        assert_eq!(d.discount_type, DiscountType::FreeShipping);
        assert_eq!(d.minimum_requirement, Some(MinimumRequirement::Subtotal));
        assert_eq!(d.minimum_amount, Some(dec("50.0")));
        assert_eq!(d.entitled_countries, vec!["US", "CA"]);
    }

    #[test]
    fn test_minimum_quantity_is_exclusive_with_subtotal() {
        let payload = serde_json::json!({
            "id": "gid://shopify/DiscountCodeNode/9",
            "codeDiscount": {
                "__typename": "DiscountCodeBasic",
                "title": "Bulk",
                "customerGets": { "value": { "__typename": "DiscountPercentage", "percentage": 0.2 } },
                "minimumRequirement": { "greaterThanOrEqualToQuantity": "3" },
            },
        });

        let d = normalize_discount(&payload, None);
        assert_eq!(d.minimum_requirement, Some(MinimumRequirement::Quantity));
        assert_eq!(d.minimum_amount, Some(dec("3")));
    }

    #[test]
    fn test_rest_payload_without_fetch_is_lossy_but_tagged() {
        let payload = serde_json::json!({
            "id": 4242,
            "title": "Legacy rule",
            "status": "ACTIVE",
            "starts_at": "2025-02-01T00:00:00Z",
            "created_at": "2025-02-01T00:00:00Z",
        });

        let d = normalize_discount(&payload, None);
        assert_eq!(d.shopify_discount_id, 4242);
        assert_eq!(d.title.as_deref(), Some("Legacy rule"));
        assert_eq!(d.discount_type, DiscountType::App);
        assert_eq!(d.discount_class, DiscountClass::Product);
        assert!(d.starts_at.is_some());
    }

    #[test]
    fn test_rest_value_type_infers_basic_type() {
        let payload = serde_json::json!({
            "id": 10,
            "title": "Price rule",
            "value": "-15.0",
            "value_type": "percentage",
        });

        let d = normalize_discount(&payload, None);
        assert_eq!(d.percentage, Some(dec("15.0")));
        assert!(d.amount.is_none());
        assert_eq!(d.discount_type, DiscountType::BasicPercentage);
    }

    #[test]
    fn test_shipping_class_forces_free_shipping_type() {
        // A node fetch that returned a free-shipping union member keeps the
        // invariant even though the outer payload said nothing.
        let payload = serde_json::json!({ "id": 11, "admin_graphql_api_id": "gid://shopify/DiscountCodeNode/11" });
        let node = serde_json::json!({
            "codeDiscount": {
                "__typename": "DiscountCodeFreeShipping",
                "title": "Ship free",
                "codes": { "nodes": [{ "code": "SHIPFREE" }] },
            },
        });

        let d = normalize_discount(&payload, Some(&node));
        assert_eq!(d.discount_class, DiscountClass::Shipping);
        assert_eq!(d.discount_type, DiscountType::FreeShipping);
        assert_eq!(d.code.as_deref(), Some("SHIPFREE"));
    }

    #[test]
    fn test_customer_segments_populate_prerequisites() {
        let payload = serde_json::json!({
            "id": "gid://shopify/DiscountCodeNode/31",
            "codeDiscount": {
                "__typename": "DiscountCodeBasic",
                "title": "VIP only",
                "customerGets": { "value": { "__typename": "DiscountPercentage", "percentage": 0.25 } },
                "customerSelection": {
                    "__typename": "DiscountCustomerSegments",
                    "segments": [
                        { "id": "gid://shopify/Segment/1", "name": "VIP" },
                        { "id": "gid://shopify/Segment/2", "name": "Wholesale" },
                    ],
                },
            },
        });

        let d = normalize_discount(&payload, None);
        assert_eq!(d.customer_selection.as_deref(), Some("prerequisite"));
        assert_eq!(d.prerequisite_customers.len(), 2);
        assert_eq!(
            d.prerequisite_customers[0].get("name").and_then(Value::as_str),
            Some("VIP")
        );
    }

    #[test]
    fn test_free_shipping_customer_selection_all() {
        let payload = serde_json::json!({
            "id": "gid://shopify/DiscountCodeNode/32",
            "codeDiscount": {
                "__typename": "DiscountCodeFreeShipping",
                "title": "Members ship free",
                "customerSelection": { "__typename": "DiscountCustomerAll", "allCustomers": true },
            },
        });

        let d = normalize_discount(&payload, None);
        assert_eq!(d.customer_selection.as_deref(), Some("all"));
        assert!(d.prerequisite_customers.is_empty());
    }

    #[test]
    fn test_codes_count_beats_fetched_code_page() {
        let payload = serde_json::json!({
            "id": "gid://shopify/DiscountCodeNode/40",
            "codeDiscount": {
                "__typename": "DiscountCodeBasic",
                "title": "Bulk codes",
                "codesCount": { "count": 120 },
                "codes": { "nodes": [{ "code": "BULK-001" }] },
                "customerGets": { "value": { "__typename": "DiscountPercentage", "percentage": 0.1 } },
            },
        });

        let d = normalize_discount(&payload, None);
        assert_eq!(d.codes_count, Some(120));
        assert_eq!(d.code.as_deref(), Some("BULK-001"));

        let shop_id = ShopId::new(uuid::Uuid::new_v4());
        assert_eq!(d.to_record(shop_id).codes_count, 120);
        assert_eq!(d.to_patch().codes_count, Some(120));
    }

    #[test]
    fn test_rest_usage_count_populates_used_count() {
        let payload = serde_json::json!({
            "id": 55,
            "title": "Price rule",
            "usage_count": 7,
            "value": "-5.0",
            "value_type": "fixed_amount",
        });

        let d = normalize_discount(&payload, None);
        assert_eq!(d.used_count, Some(7));

        let shop_id = ShopId::new(uuid::Uuid::new_v4());
        assert_eq!(d.to_record(shop_id).used_count, 7);
        assert_eq!(d.to_patch().used_count, Some(7));

        // GraphQL payloads carry no used count; the stored value must be
        // preserved on update, so the patch leaves it unset.
        let graphql = serde_json::json!({
            "id": "gid://shopify/DiscountCodeNode/56",
            "codeDiscount": { "__typename": "DiscountCodeApp", "title": "App deal" },
        });
        assert_eq!(normalize_discount(&graphql, None).to_patch().used_count, None);
    }

    #[test]
    fn test_enrichment_gid() {
        let rest = serde_json::json!({
            "id": 1,
            "admin_graphql_api_id": "gid://shopify/DiscountCodeNode/1",
        });
        assert_eq!(
            enrichment_gid(&rest),
            Some("gid://shopify/DiscountCodeNode/1")
        );

        let graphql = serde_json::json!({
            "id": "gid://shopify/DiscountCodeNode/1",
            "codeDiscount": { "__typename": "DiscountCodeBasic" },
        });
        assert!(enrichment_gid(&graphql).is_none());

        let numeric_only = serde_json::json!({ "id": 1 });
        assert!(enrichment_gid(&numeric_only).is_none());
    }
}
