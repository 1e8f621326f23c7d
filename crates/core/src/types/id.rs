//! Newtype IDs for type-safe entity references.
//!
//! Internal row identifiers are UUIDs (assigned by Postgres); the newtypes
//! prevent accidentally mixing IDs from different entity types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        #[cfg_attr(feature = "postgres", derive(sqlx::Type))]
        #[cfg_attr(feature = "postgres", sqlx(transparent))]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Get the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_uuid_id!(ShopId);
define_uuid_id!(DiscountRecordId);
define_uuid_id!(OrderRecordId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_types() {
        let raw = Uuid::new_v4();
        let shop = ShopId::new(raw);
        let discount = DiscountRecordId::new(raw);

        assert_eq!(shop.as_uuid(), discount.as_uuid());
        assert_eq!(shop.to_string(), raw.to_string());
    }

    #[test]
    fn test_serde_transparent() {
        let raw = Uuid::new_v4();
        let shop = ShopId::new(raw);
        let json = serde_json::to_string(&shop).expect("serialize");
        assert_eq!(json, format!("\"{raw}\""));

        let back: ShopId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, shop);
    }
}
