//! Shared type definitions.

pub mod gid;
pub mod id;
pub mod money;

pub use gid::extract_numeric_id;
pub use id::{DiscountRecordId, OrderRecordId, ShopId};
pub use money::{decimal_field, decimal_from_value};
