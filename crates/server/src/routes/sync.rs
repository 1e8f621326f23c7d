//! Historical sync trigger endpoints.

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use promowell_core::ShopId;
use serde::Deserialize;
use tracing::instrument;

use crate::db::{RepositoryError, ShopRepository};
use crate::error::AppError;
use crate::ingest::IngestionWriter;
use crate::shopify::ShopCredentials;
use crate::state::AppState;
use crate::sync::{
    AdminDiscountFetcher, AdminOrderFetcher, DISCOUNTS_LOOKBACK, LookbackBounds, ORDERS_LOOKBACK,
    WriterDiscountSink, WriterOrderSink, sync_discounts, sync_orders, validate_days_back,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(trigger_orders_sync).post(trigger_orders_sync))
        .route(
            "/discounts",
            get(trigger_discounts_sync).post(trigger_discounts_sync),
        )
}

#[derive(Debug, Deserialize)]
struct SyncParams {
    #[serde(rename = "daysBack")]
    days_back: Option<i64>,
}

/// Resolve the session context for a sync trigger: shop ID plus the stored
/// Admin API credentials.
async fn sync_context(
    state: &AppState,
    headers: &HeaderMap,
    params: &SyncParams,
    bounds: LookbackBounds,
) -> Result<(ShopId, ShopCredentials, u32), AppError> {
    let domain = headers
        .get("x-shopify-shop-domain")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing shop session".to_string()))?;

    let days_back = validate_days_back(params.days_back, bounds).map_err(AppError::BadRequest)?;

    let shops = ShopRepository::new(state.pool());
    let shop_id = match shops.resolve_shop_id(domain).await {
        Ok(id) => id,
        Err(RepositoryError::NotFound) => {
            return Err(AppError::Unauthorized(format!("Unknown shop: {domain}")));
        }
        Err(e) => return Err(e.into()),
    };

    let access_token = shops
        .access_token(domain)
        .await?
        .ok_or_else(|| AppError::Unauthorized(format!("No credentials for shop: {domain}")))?;

    Ok((
        shop_id,
        ShopCredentials {
            domain: domain.to_string(),
            access_token,
        },
        days_back,
    ))
}

#[instrument(skip(state, headers))]
async fn trigger_orders_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SyncParams>,
) -> Result<Response, AppError> {
    let (shop_id, creds, days_back) =
        sync_context(&state, &headers, &params, ORDERS_LOOKBACK).await?;

    let writer = IngestionWriter::new(state.pool(), state.shopify());
    let fetcher = AdminOrderFetcher {
        client: state.shopify(),
        creds: &creds,
    };
    let sink = WriterOrderSink {
        writer: &writer,
        shop_id,
    };

    let outcome = sync_orders(&fetcher, &sink, days_back).await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(outcome)).into_response())
}

#[instrument(skip(state, headers))]
async fn trigger_discounts_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SyncParams>,
) -> Result<Response, AppError> {
    let (shop_id, creds, days_back) =
        sync_context(&state, &headers, &params, DISCOUNTS_LOOKBACK).await?;

    let writer = IngestionWriter::new(state.pool(), state.shopify());
    let fetcher = AdminDiscountFetcher {
        client: state.shopify(),
        creds: &creds,
    };
    let sink = WriterDiscountSink {
        writer: &writer,
        shop_id,
    };

    let outcome = sync_discounts(&fetcher, &sink, days_back).await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(outcome)).into_response())
}
