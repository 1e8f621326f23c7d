//! Webhook receivers.
//!
//! Processing failures are acknowledged with HTTP 200 and an
//! "Error processed" body: the upstream retries on non-200, and redelivery
//! cannot fix a non-recoverable condition like a missing shop record. Only
//! a missing authentication context yields a non-200.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::Value;
use tracing::{error, info};

use crate::ingest::{IngestError, IngestionWriter};
use crate::state::AppState;

use super::shop_domain;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders/create", post(orders_create))
        .route("/orders/updated", post(orders_updated))
        .route("/discounts/create", post(discounts_create))
        .route("/discounts/update", post(discounts_update))
        .route("/discounts/delete", post(discounts_delete))
        .route("/app/uninstalled", post(app_uninstalled))
}

/// Map a processing result to the always-acknowledge response policy.
fn acknowledge(topic: &str, domain: &str, result: Result<(), IngestError>) -> Response {
    match result {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            error!(topic, shop = %domain, error = %e, "webhook processing failed");
            sentry::capture_error(&e);
            // Acknowledge anyway to prevent redelivery storms.
            (StatusCode::OK, "Error processed").into_response()
        }
    }
}

async fn orders_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let domain = match shop_domain(&headers) {
        Ok(domain) => domain,
        Err(status) => return (status, "Missing shop domain").into_response(),
    };
    info!(topic = "orders/create", shop = %domain, "webhook received");

    let writer = IngestionWriter::new(state.pool(), state.shopify());
    let result = writer.handle_order_created(&domain, &payload).await;
    acknowledge("orders/create", &domain, result)
}

async fn orders_updated(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let domain = match shop_domain(&headers) {
        Ok(domain) => domain,
        Err(status) => return (status, "Missing shop domain").into_response(),
    };
    info!(topic = "orders/updated", shop = %domain, "webhook received");

    let writer = IngestionWriter::new(state.pool(), state.shopify());
    let result = writer.handle_order_updated(&domain, &payload).await;
    acknowledge("orders/updated", &domain, result)
}

async fn discounts_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let domain = match shop_domain(&headers) {
        Ok(domain) => domain,
        Err(status) => return (status, "Missing shop domain").into_response(),
    };
    info!(topic = "discounts/create", shop = %domain, "webhook received");

    let writer = IngestionWriter::new(state.pool(), state.shopify());
    let result = writer.handle_discount_created(&domain, &payload).await;
    acknowledge("discounts/create", &domain, result)
}

async fn discounts_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let domain = match shop_domain(&headers) {
        Ok(domain) => domain,
        Err(status) => return (status, "Missing shop domain").into_response(),
    };
    info!(topic = "discounts/update", shop = %domain, "webhook received");

    let writer = IngestionWriter::new(state.pool(), state.shopify());
    let result = writer.handle_discount_updated(&domain, &payload).await;
    acknowledge("discounts/update", &domain, result)
}

async fn discounts_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let domain = match shop_domain(&headers) {
        Ok(domain) => domain,
        Err(status) => return (status, "Missing shop domain").into_response(),
    };
    info!(topic = "discounts/delete", shop = %domain, "webhook received");

    let writer = IngestionWriter::new(state.pool(), state.shopify());
    let result = writer.handle_discount_deleted(&domain, &payload).await;
    acknowledge("discounts/delete", &domain, result)
}

async fn app_uninstalled(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let domain = match shop_domain(&headers) {
        Ok(domain) => domain,
        Err(status) => return (status, "Missing shop domain").into_response(),
    };
    info!(topic = "app/uninstalled", shop = %domain, "webhook received");

    let writer = IngestionWriter::new(state.pool(), state.shopify());
    let result = writer.handle_app_uninstalled(&domain).await;
    acknowledge("app/uninstalled", &domain, result)
}
