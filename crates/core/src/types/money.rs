//! Loose monetary parsing for heterogeneous payloads.
//!
//! Shopify payloads carry monetary amounts as strings (`"24.99"`), as bare
//! JSON numbers, or nested inside `MoneyV2`/`shopMoney` objects depending on
//! which API surface produced them. These helpers extract a [`Decimal`] from
//! whatever shape is present.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Parse a decimal from a JSON value that may be a string, a number, or a
/// money object (`{"amount": ..}` or `{"shopMoney": {"amount": ..}}`).
///
/// Returns `None` for anything unparseable; malformed money is treated as
/// absent, not as an error.
#[must_use]
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::Object(map) => {
            if let Some(inner) = map.get("shopMoney") {
                return decimal_from_value(inner);
            }
            map.get("amount").and_then(decimal_from_value)
        }
        _ => None,
    }
}

/// Parse a decimal from a named field of a JSON object.
#[must_use]
pub fn decimal_field(payload: &Value, field: &str) -> Option<Decimal> {
    payload.get(field).and_then(decimal_from_value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_string_amount() {
        assert_eq!(decimal_from_value(&json!("24.99")), Some(dec("24.99")));
    }

    #[test]
    fn test_number_amount() {
        assert_eq!(decimal_from_value(&json!(100)), Some(dec("100")));
    }

    #[test]
    fn test_money_v2_object() {
        let v = json!({"amount": "12.50", "currencyCode": "USD"});
        assert_eq!(decimal_from_value(&v), Some(dec("12.50")));
    }

    #[test]
    fn test_shop_money_set() {
        let v = json!({"shopMoney": {"amount": "99.00", "currencyCode": "USD"}});
        assert_eq!(decimal_from_value(&v), Some(dec("99.00")));
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(decimal_from_value(&json!("free")), None);
        assert_eq!(decimal_from_value(&json!(null)), None);
        assert_eq!(decimal_from_value(&json!([1, 2])), None);
    }

    #[test]
    fn test_field_helper() {
        let payload = json!({"total_price": "50.00"});
        assert_eq!(decimal_field(&payload, "total_price"), Some(dec("50.00")));
        assert_eq!(decimal_field(&payload, "subtotal_price"), None);
    }
}
