//! Order payload normalization.
//!
//! Orders arrive in two shapes: REST-style webhook payloads (snake_case
//! fields, string money) and GraphQL-style nodes (camelCase fields, money
//! sets with `shopMoney`). Both collapse into [`NormalizedOrder`]; payloads
//! that carry neither shape yield nulled monetary fields rather than an
//! error.

use chrono::{DateTime, Utc};
use promowell_core::{DiscountRecordId, ShopId, decimal_from_value, extract_numeric_id};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};

use crate::db::{OrderPatch, OrderRecord};

/// Which kind of discount application produced an order-level discount.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplicationKind {
    /// Customer entered a code at checkout.
    Code { code: String },
    /// Applied automatically by an automatic discount.
    Automatic { title: String },
    /// Staff-applied manual discount.
    Manual { title: Option<String> },
    /// Legacy script-applied discount.
    Script { title: Option<String> },
    /// Unrecognized application shape, kept for the raw payload only.
    Unknown,
}

/// The value a discount application contributed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppliedValue {
    FixedAmount { amount: Decimal },
    Percentage { percentage: Decimal },
}

/// A resolved cross-reference to a stored discount record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedDiscountRef {
    pub discount_record_id: DiscountRecordId,
    pub shopify_discount_id: i64,
}

/// One discount application on an order.
#[derive(Debug, Clone, Serialize)]
pub struct DiscountApplication {
    #[serde(flatten)]
    pub kind: ApplicationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_selection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<AppliedValue>,
    /// Set by the linker when the application matches a stored discount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedDiscountRef>,
}

impl DiscountApplication {
    /// The code, for code-kind applications.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match &self.kind {
            ApplicationKind::Code { code } => Some(code),
            _ => None,
        }
    }

    /// The title, for automatic-kind applications only (manual and script
    /// titles are free text, not discount references).
    #[must_use]
    pub fn automatic_title(&self) -> Option<&str> {
        match &self.kind {
            ApplicationKind::Automatic { title } => Some(title),
            _ => None,
        }
    }
}

/// A per-line-item discount allocation, back-referencing the application
/// that produced it by code or title.
#[derive(Debug, Clone, Serialize)]
pub struct LineItemAllocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedDiscountRef>,
}

/// Canonical order shape, independent of the source payload variant.
#[derive(Debug, Clone)]
pub struct NormalizedOrder {
    pub shopify_order_id: i64,
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
    pub discount_codes: Vec<String>,
    /// `None` when the payload carried no applications field at all, which
    /// is distinct from an explicitly empty list for partial updates.
    pub applications: Option<Vec<DiscountApplication>>,
    pub allocations: Option<Vec<LineItemAllocation>>,
    pub shopify_created_at: Option<DateTime<Utc>>,
    pub shopify_updated_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// The structured identifier carried by REST payloads, used for node
    /// enrichment when the applications lack type discriminators.
    pub admin_graphql_api_id: Option<String>,
    pub raw: Value,
}

/// Normalize an order payload of either shape.
#[must_use]
pub fn normalize_order(payload: &Value) -> NormalizedOrder {
    let applications = parse_applications(payload);
    let allocations = parse_allocations(payload, applications.as_deref());

    NormalizedOrder {
        shopify_order_id: extract_numeric_id(&payload["id"]),
        order_name: string_field(payload, &["name"]).or_else(|| order_number_field(payload)),
        currency: string_field(payload, &["currencyCode", "currency"]),
        total_price: first_decimal(payload, &["totalPrice", "totalPriceSet", "total_price"]),
        subtotal_price: first_decimal(
            payload,
            &["subtotalPrice", "subtotalPriceSet", "subtotal_price"],
        ),
        total_discounts: first_decimal(
            payload,
            &[
                "totalDiscounts",
                "totalDiscountsSet",
                "total_discounts",
                "current_total_discounts",
            ],
        ),
        total_tax: first_decimal(payload, &["totalTax", "totalTaxSet", "total_tax"]),
        financial_status: string_field(
            payload,
            &["displayFinancialStatus", "financial_status"],
        ),
        fulfillment_status: string_field(
            payload,
            &["displayFulfillmentStatus", "fulfillment_status"],
        ),
        customer_id: numeric_ref(&payload["customer"]["id"]),
        customer_email: string_field(payload, &["email", "contact_email"]),
        channel_source_name: string_field(payload, &["sourceName", "source_name"]),
        channel_app_id: numeric_ref(&payload["app"]["id"]).or_else(|| numeric_ref(&payload["app_id"])),
        discount_codes: parse_discount_codes(payload),
        applications,
        allocations,
        shopify_created_at: datetime_field(payload, &["createdAt", "created_at"]),
        shopify_updated_at: datetime_field(payload, &["updatedAt", "updated_at"]),
        processed_at: datetime_field(payload, &["processedAt", "processed_at"]),
        cancelled_at: datetime_field(payload, &["cancelledAt", "cancelled_at"]),
        admin_graphql_api_id: payload
            .get("admin_graphql_api_id")
            .and_then(Value::as_str)
            .map(String::from),
        raw: payload.clone(),
    }
}

impl NormalizedOrder {
    /// True when the applications carry no kind discriminators, meaning the
    /// payload was REST-shaped and a node fetch could enrich it.
    #[must_use]
    pub fn needs_application_enrichment(&self) -> bool {
        self.admin_graphql_api_id.is_some()
            && self
                .applications
                .as_ref()
                .is_none_or(|apps| apps.iter().all(|a| a.kind == ApplicationKind::Unknown))
    }

    /// Build a full storage record for creation-type events.
    #[must_use]
    pub fn to_record(&self, shop_id: ShopId) -> OrderRecord {
        OrderRecord {
            shop_id,
            shopify_order_id: self.shopify_order_id,
            order_name: self.order_name.clone(),
            currency: self.currency.clone(),
            total_price: self.total_price,
            subtotal_price: self.subtotal_price,
            total_discounts: self.total_discounts,
            total_tax: self.total_tax,
            financial_status: self.financial_status.clone(),
            fulfillment_status: self.fulfillment_status.clone(),
            customer_id: self.customer_id,
            customer_email: self.customer_email.clone(),
            channel_source_name: self.channel_source_name.clone(),
            channel_app_id: self.channel_app_id,
            discount_codes: json!(self.discount_codes),
            discount_applications: json!(self.applications.as_deref().unwrap_or_default()),
            line_items: json!(self.allocations.as_deref().unwrap_or_default()),
            shopify_created_at: self.shopify_created_at,
            shopify_updated_at: self.shopify_updated_at,
            processed_at: self.processed_at,
            cancelled_at: self.cancelled_at,
            raw_data: self.raw.clone(),
        }
    }

    /// Build a partial patch for update-type events: only fields the payload
    /// actually carried are set, everything else stays untouched.
    #[must_use]
    pub fn to_patch(&self) -> OrderPatch {
        OrderPatch {
            order_name: self.order_name.clone(),
            currency: self.currency.clone(),
            total_price: self.total_price,
            subtotal_price: self.subtotal_price,
            total_discounts: self.total_discounts,
            total_tax: self.total_tax,
            financial_status: self.financial_status.clone(),
            fulfillment_status: self.fulfillment_status.clone(),
            customer_id: self.customer_id,
            customer_email: self.customer_email.clone(),
            channel_source_name: self.channel_source_name.clone(),
            channel_app_id: self.channel_app_id,
            discount_codes: if self.discount_codes.is_empty() {
                None
            } else {
                Some(json!(self.discount_codes))
            },
            discount_applications: self.applications.as_ref().map(|apps| json!(apps)),
            line_items: self.allocations.as_ref().map(|allocs| json!(allocs)),
            shopify_updated_at: self.shopify_updated_at,
            processed_at: self.processed_at,
            cancelled_at: self.cancelled_at,
            raw_data: Some(self.raw.clone()),
        }
    }
}

/// Replace the parsed applications/allocations with ones from a fetched
/// order node (used when the webhook payload lacked discriminators).
pub fn apply_node_enrichment(order: &mut NormalizedOrder, node: &Value) {
    if let Some(apps) = parse_applications(node) {
        order.applications = Some(apps);
    }
    let allocs = parse_allocations(node, order.applications.as_deref());
    if allocs.is_some() {
        order.allocations = allocs;
    }
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

/// REST payloads carry `order_number` as a JSON number, not a string.
fn order_number_field(payload: &Value) -> Option<String> {
    match payload.get("order_number")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn first_decimal(payload: &Value, keys: &[&str]) -> Option<Decimal> {
    keys.iter()
        .find_map(|k| payload.get(k).and_then(decimal_from_value))
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

/// Numeric reference that may arrive as a number, numeric string, or GID.
/// Zero means "unknown" and is mapped to `None` here.
fn numeric_ref(value: &Value) -> Option<i64> {
    match extract_numeric_id(value) {
        0 => None,
        id => Some(id),
    }
}

fn parse_discount_codes(payload: &Value) -> Vec<String> {
    // GraphQL: ["SAVE20"]; REST: [{"code": "SAVE20", ...}]
    let entries = payload
        .get("discountCodes")
        .or_else(|| payload.get("discount_codes"))
        .and_then(Value::as_array);

    entries
        .map(|arr| {
            arr.iter()
                .filter_map(|e| {
                    e.as_str()
                        .or_else(|| e.get("code").and_then(Value::as_str))
                        .map(String::from)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Pull out the application list, returning `None` when the payload carries
/// no applications field at all.
fn parse_applications(payload: &Value) -> Option<Vec<DiscountApplication>> {
    let entries = payload
        .get("discountApplications")
        .map(|da| da.get("nodes").unwrap_or(da))
        .or_else(|| payload.get("discount_applications"))?;

    let entries = entries.as_array()?;
    Some(entries.iter().map(parse_application).collect())
}

fn parse_application(entry: &Value) -> DiscountApplication {
    let kind = application_kind(entry);
    DiscountApplication {
        kind,
        allocation_method: string_field(entry, &["allocationMethod", "allocation_method"]),
        target_selection: string_field(entry, &["targetSelection", "target_selection"]),
        target_type: string_field(entry, &["targetType", "target_type"]),
        value: applied_value(entry),
        resolved: None,
    }
}

fn application_kind(entry: &Value) -> ApplicationKind {
    let title = || string_field(entry, &["title", "description"]);

    // GraphQL discriminator first, then the REST `type` tag.
    let tag = entry
        .get("__typename")
        .or_else(|| entry.get("type"))
        .and_then(Value::as_str);

    match tag {
        Some("DiscountCodeApplication" | "discount_code") => entry
            .get("code")
            .and_then(Value::as_str)
            .map_or(ApplicationKind::Unknown, |code| ApplicationKind::Code {
                code: code.to_string(),
            }),
        Some("AutomaticDiscountApplication" | "automatic") => title()
            .map_or(ApplicationKind::Unknown, |title| {
                ApplicationKind::Automatic { title }
            }),
        Some("ManualDiscountApplication" | "manual") => ApplicationKind::Manual { title: title() },
        Some("ScriptDiscountApplication" | "script") => ApplicationKind::Script { title: title() },
        _ => ApplicationKind::Unknown,
    }
}

fn applied_value(entry: &Value) -> Option<AppliedValue> {
    // GraphQL: value is MoneyV2 or PricingPercentageValue.
    if let Some(value) = entry.get("value") {
        if let Some(pct) = value.get("percentage").and_then(decimal_from_value) {
            return Some(AppliedValue::Percentage { percentage: pct });
        }
        if let Some(amount) = decimal_from_value(value) {
            // REST: flat value string plus a value_type tag.
            if entry.get("value_type").and_then(Value::as_str) == Some("percentage") {
                return Some(AppliedValue::Percentage { percentage: amount });
            }
            return Some(AppliedValue::FixedAmount { amount });
        }
    }
    None
}

/// Pull out per-line-item allocations. REST allocations reference their
/// application by index; the code/title is copied over so the linker can
/// match allocations independently of application order.
fn parse_allocations(
    payload: &Value,
    applications: Option<&[DiscountApplication]>,
) -> Option<Vec<LineItemAllocation>> {
    let line_items = payload
        .get("lineItems")
        .map(|li| li.get("nodes").unwrap_or(li))
        .or_else(|| payload.get("line_items"))?
        .as_array()?;

    let mut out = Vec::new();
    for li in line_items {
        let line_item_id = li
            .get("id")
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .filter(|s| !s.is_empty());

        let allocs = li
            .get("discountAllocations")
            .or_else(|| li.get("discount_allocations"))
            .and_then(Value::as_array);

        for alloc in allocs.into_iter().flatten() {
            let amount = alloc
                .get("allocatedAmountSet")
                .or_else(|| alloc.get("allocatedAmount"))
                .or_else(|| alloc.get("amount"))
                .and_then(decimal_from_value);

            let application = alloc.get("discountApplication").or_else(|| alloc.get("application"));
            let mut code = application
                .and_then(|a| a.get("code"))
                .and_then(Value::as_str)
                .map(String::from);
            let mut title = application
                .and_then(|a| a.get("title"))
                .and_then(Value::as_str)
                .map(String::from);

            if code.is_none() && title.is_none() {
                let idx = alloc
                    .get("discount_application_index")
                    .and_then(Value::as_u64)
                    .and_then(|i| usize::try_from(i).ok());
                if let Some(app) = idx.and_then(|i| applications.and_then(|apps| apps.get(i))) {
                    code = app.code().map(String::from);
                    title = app.automatic_title().map(String::from);
                }
            }

            out.push(LineItemAllocation {
                line_item_id: line_item_id.clone(),
                allocated_amount: amount,
                code,
                title,
                resolved: None,
            });
        }
    }

    Some(out)
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
    fn test_graphql_payload_passes_through() {
        let payload = json!({
            "id": "gid://shopify/Order/820982911946154508",
            "name": "#1001",
            "totalPrice": "199.95",
            "subtotalPrice": "180.00",
            "totalTax": "19.95",
            "totalDiscounts": "20.00",
            "currencyCode": "USD",
        });

        let order = normalize_order(&payload);
        assert_eq!(order.shopify_order_id, 820_982_911_946_154_508);
        assert_eq!(order.order_name.as_deref(), Some("#1001"));
        assert_eq!(order.total_price, Some(dec("199.95")));
        assert_eq!(order.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_rest_payload_maps_snake_case() {
        let payload = json!({
            "id": 5_551_234,
            "name": "#1002",
            "total_price": "50.00",
            "subtotal_price": "45.00",
            "total_tax": "5.00",
            "current_total_discounts": "10.00",
            "currency": "EUR",
            "source_name": "web",
            "app_id": 12345,
            "financial_status": "paid",
        });

        let order = normalize_order(&payload);
        assert_eq!(order.shopify_order_id, 5_551_234);
        assert_eq!(order.total_price, Some(dec("50.00")));
        assert_eq!(order.total_discounts, Some(dec("10.00")));
        assert_eq!(order.currency.as_deref(), Some("EUR"));
        assert_eq!(order.channel_source_name.as_deref(), Some("web"));
        assert_eq!(order.channel_app_id, Some(12345));
        assert_eq!(order.financial_status.as_deref(), Some("paid"));
    }

    #[test]
    fn test_numeric_order_number_becomes_order_name() {
        let payload = json!({
            "id": 5_551_235,
            "order_number": 1003,
            "total_price": "20.00",
        });

        let order = normalize_order(&payload);
        assert_eq!(order.order_name.as_deref(), Some("1003"));

        // A display name still wins over the bare counter.
        let named = json!({ "id": 5_551_236, "name": "#1004", "order_number": 1004 });
        assert_eq!(normalize_order(&named).order_name.as_deref(), Some("#1004"));
    }

    #[test]
    fn test_money_set_shape_is_unwrapped() {
        let payload = json!({
            "id": "gid://shopify/Order/1",
            "totalPriceSet": { "shopMoney": { "amount": "42.50", "currencyCode": "USD" } },
        });

        let order = normalize_order(&payload);
        assert_eq!(order.total_price, Some(dec("42.50")));
    }

    #[test]
    fn test_unknown_shape_yields_nulled_fields() {
        let payload = json!({ "id": 99, "something_else": true });

        let order = normalize_order(&payload);
        assert_eq!(order.shopify_order_id, 99);
        assert!(order.total_price.is_none());
        assert!(order.currency.is_none());
        assert!(order.applications.is_none());
    }

    #[test]
    fn test_graphql_applications_are_tagged() {
        let payload = json!({
            "id": 1,
            "discountApplications": { "nodes": [
                { "__typename": "DiscountCodeApplication", "code": "SAVE20",
                  "allocationMethod": "ACROSS", "value": { "percentage": 20.0 } },
                { "__typename": "AutomaticDiscountApplication", "title": "Summer Sale",
                  "value": { "amount": "5.00", "currencyCode": "USD" } },
                { "__typename": "ManualDiscountApplication", "title": "Staff" },
            ]},
        });

        let order = normalize_order(&payload);
        let apps = order.applications.unwrap();
        assert_eq!(apps.len(), 3);
        assert_eq!(apps[0].code(), Some("SAVE20"));
        assert_eq!(
            apps[0].value,
            Some(AppliedValue::Percentage { percentage: dec("20") })
        );
        assert_eq!(apps[1].automatic_title(), Some("Summer Sale"));
        assert_eq!(
            apps[1].value,
            Some(AppliedValue::FixedAmount { amount: dec("5.00") })
        );
        assert!(matches!(apps[2].kind, ApplicationKind::Manual { .. }));
    }

    #[test]
    fn test_rest_applications_use_type_tag() {
        let payload = json!({
            "id": 1,
            "discount_applications": [
                { "type": "discount_code", "code": "WELCOME10",
                  "value": "10.0", "value_type": "percentage" },
                { "type": "manual", "title": "Price match", "value": "3.00",
                  "value_type": "fixed_amount" },
            ],
        });

        let order = normalize_order(&payload);
        let apps = order.applications.unwrap();
        assert_eq!(apps[0].code(), Some("WELCOME10"));
        assert_eq!(
            apps[0].value,
            Some(AppliedValue::Percentage { percentage: dec("10.0") })
        );
        assert_eq!(
            apps[1].value,
            Some(AppliedValue::FixedAmount { amount: dec("3.00") })
        );
    }

    #[test]
    fn test_rest_allocation_index_copies_code() {
        let payload = json!({
            "id": 1,
            "discount_applications": [
                { "type": "discount_code", "code": "SAVE20" },
            ],
            "line_items": [
                { "id": 777, "discount_allocations": [
                    { "amount": "4.00", "discount_application_index": 0 },
                ]},
            ],
        });

        let order = normalize_order(&payload);
        let allocs = order.allocations.unwrap();
        assert_eq!(allocs.len(), 1);
        assert_eq!(allocs[0].code.as_deref(), Some("SAVE20"));
        assert_eq!(allocs[0].allocated_amount, Some(dec("4.00")));
    }

    #[test]
    fn test_enrichment_needed_only_without_discriminators() {
        let rest = normalize_order(&json!({
            "id": 1,
            "admin_graphql_api_id": "gid://shopify/Order/1",
        }));
        assert!(rest.needs_application_enrichment());

        let graphql = normalize_order(&json!({
            "id": 1,
            "admin_graphql_api_id": "gid://shopify/Order/1",
            "discountApplications": { "nodes": [
                { "__typename": "DiscountCodeApplication", "code": "X" },
            ]},
        }));
        assert!(!graphql.needs_application_enrichment());
    }

    #[test]
    fn test_patch_omits_absent_fields() {
        let order = normalize_order(&json!({ "id": 1, "total_price": "50" }));
        let patch = order.to_patch();
        assert_eq!(patch.total_price, Some(dec("50")));
        assert!(patch.subtotal_price.is_none());
        assert!(patch.currency.is_none());
        assert!(patch.discount_applications.is_none());
        assert!(patch.raw_data.is_some());
    }
}
