//! Platform global identifier (GID) parsing.
//!
//! Shopify identifies resources with opaque strings of the form
//! `gid://shopify/Order/5678901234`. Webhook payloads are inconsistent about
//! which form they carry: REST-shaped events use bare numeric IDs (as JSON
//! numbers or strings), GraphQL-shaped events use GIDs.

use serde_json::Value;

/// Extract the numeric ID embedded in a GID or bare identifier.
///
/// Accepts a bare number, a numeric string, or a `gid://shopify/<Type>/<id>`
/// string. Returns `0` when no numeric component can be located - callers
/// treat `0` as "unknown", never as an error.
#[must_use]
pub fn extract_numeric_id(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => extract_numeric_id_str(s),
        _ => 0,
    }
}

/// String form of [`extract_numeric_id`].
#[must_use]
pub fn extract_numeric_id_str(raw: &str) -> i64 {
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse().unwrap_or(0);
    }

    if raw.starts_with("gid://shopify/") {
        if let Some(last) = raw.rsplit('/').next() {
            if !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()) {
                return last.parse().unwrap_or(0);
            }
        }
    }

    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_number() {
        assert_eq!(extract_numeric_id(&json!(5_678_901_234_i64)), 5_678_901_234);
    }

    #[test]
    fn test_numeric_string() {
        assert_eq!(extract_numeric_id(&json!("123456")), 123_456);
    }

    #[test]
    fn test_order_gid() {
        assert_eq!(
            extract_numeric_id(&json!("gid://shopify/Order/5678901234")),
            5_678_901_234
        );
    }

    #[test]
    fn test_discount_gid() {
        assert_eq!(
            extract_numeric_id_str("gid://shopify/DiscountCodeNode/987654"),
            987_654
        );
    }

    #[test]
    fn test_unknown_yields_zero() {
        assert_eq!(extract_numeric_id(&json!("not-an-id")), 0);
        assert_eq!(extract_numeric_id(&json!(null)), 0);
        assert_eq!(extract_numeric_id_str("gid://shopify/Order/"), 0);
        assert_eq!(extract_numeric_id_str(""), 0);
    }
}
