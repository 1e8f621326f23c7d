//! Ingestion pipeline: normalize, link, write.
//!
//! Webhooks and historical sync feed the same path: a payload is normalized
//! into a canonical shape ([`order`], [`discount`]), its discount references
//! are resolved against stored discounts ([`linker`]), and the result is
//! written idempotently ([`writer`]).

pub mod discount;
pub mod linker;
pub mod order;
pub mod writer;

pub use discount::NormalizedDiscount;
pub use linker::DiscountLookup;
pub use order::{AppliedValue, ApplicationKind, DiscountApplication, LineItemAllocation, NormalizedOrder};
pub use writer::IngestionWriter;

use thiserror::Error;

use crate::db::RepositoryError;
use crate::shopify::ShopifyError;

/// Errors from the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// No shop record exists for the delivering domain. Fatal for the
    /// triggering event; upstream redelivery cannot fix it.
    #[error("shop not found for domain: {0}")]
    ShopNotFound(String),

    /// Store error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Admin API error during payload enrichment.
    #[error(transparent)]
    Shopify(#[from] ShopifyError),

    /// The payload is missing the external entity ID.
    #[error("payload has no usable entity id")]
    MissingEntityId,
}
