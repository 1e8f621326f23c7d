//! Shop install/session sync endpoint.
//!
//! The embedded app calls this after OAuth completes (and on app open) so
//! the backend holds a current Admin API token for the shop. The upsert
//! creates the row on first install and reactivates it on reinstall.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use secrecy::SecretString;
use serde_json::json;
use tracing::{info, instrument};

use crate::db::ShopRepository;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/shops/sync", get(sync_shop).post(sync_shop))
}

/// The install context carried by the session headers: the shop's domain
/// and the Admin API token minted for it.
fn install_context(headers: &HeaderMap) -> Result<(String, SecretString), AppError> {
    let domain = headers
        .get("x-shopify-shop-domain")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| AppError::Unauthorized("Missing shop session".to_string()))?;

    let token = headers
        .get("x-shopify-access-token")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| SecretString::from(s.to_string()))
        .ok_or_else(|| AppError::Unauthorized("Missing access token".to_string()))?;

    Ok((domain, token))
}

#[instrument(skip(state, headers))]
async fn sync_shop(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let (domain, token) = install_context(&headers)?;

    let shops = ShopRepository::new(state.pool());
    let shop_id = shops.upsert_install(&domain, &token).await?;

    info!(shop = %domain, "shop session synced");
    Ok(Json(json!({ "ok": true, "shop": domain, "shopId": shop_id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_context_requires_both_headers() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            install_context(&headers),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert(
            "x-shopify-shop-domain",
            "test.myshopify.com".parse().expect("header"),
        );
        assert!(matches!(
            install_context(&headers),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert("x-shopify-access-token", "shpat_abc".parse().expect("header"));
        let (domain, _token) = install_context(&headers).expect("context");
        assert_eq!(domain, "test.myshopify.com");
    }
}
