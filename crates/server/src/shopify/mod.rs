//! Shopify Admin API GraphQL client.
//!
//! Promowell is multi-tenant: every call is made on behalf of a shop whose
//! access token lives in the `shops` table, so the client takes credentials
//! per call instead of holding a single store's token.
//!
//! Webhook and node payloads are treated as schema-less JSON on purpose -
//! the normalization layer must tolerate whatever shape Shopify sends, so
//! queries are raw documents and responses are `serde_json::Value`.

mod client;
pub mod queries;

pub use client::{AdminClient, Page, ShopCredentials};

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shopify_error_display() {
        let err = ShopifyError::NotFound("discount-123".to_string());
        assert_eq!(err.to_string(), "Not found: discount-123");
    }

    #[test]
    fn test_graphql_error_formatting() {
        let errors = vec![
            GraphQLError {
                message: "Field not found".to_string(),
                path: vec![],
            },
            GraphQLError {
                message: "Invalid ID".to_string(),
                path: vec![],
            },
        ];
        let err = ShopifyError::GraphQL(errors);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Invalid ID"
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ShopifyError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
