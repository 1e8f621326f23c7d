//! HTTP routes.

pub mod dashboard;
pub mod shops;
pub mod sync;
pub mod webhooks;

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/webhooks", webhooks::router())
        .nest("/api/sync", sync::router())
        .nest("/api", dashboard::router().merge(shops::router()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// The delivering shop's domain, from the platform header. Signature
/// verification happens upstream; this is the authentication context the
/// handlers rely on.
pub(crate) fn shop_domain(headers: &HeaderMap) -> Result<String, StatusCode> {
    headers
        .get("x-shopify-shop-domain")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or(StatusCode::BAD_REQUEST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shop_domain_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(shop_domain(&headers), Err(StatusCode::BAD_REQUEST));

        headers.insert("x-shopify-shop-domain", "test.myshopify.com".parse().expect("header"));
        assert_eq!(shop_domain(&headers), Ok("test.myshopify.com".to_string()));
    }
}
