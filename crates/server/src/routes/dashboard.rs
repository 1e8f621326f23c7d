//! Dashboard metrics API.

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use chrono::Utc;
use promowell_core::DiscountRecordId;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    DiscountRepository, DiscountSummary, PerformanceRepository, RepositoryError, ShopRepository,
};
use crate::error::AppError;
use crate::metrics::{
    Lookback, MetricChanges, PeriodTotals, SeriesPoint, aggregate, chart_series, compare_periods,
    period_windows,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[derive(Debug, Deserialize)]
struct DashboardParams {
    /// Lookback period in days (`7`, `30`, `90`) or `all`.
    period: Option<String>,
    /// Discount record ID to scope the metrics to, or `all`.
    discount: Option<String>,
}

/// Dashboard payload: discount menu, headline totals with
/// period-over-period changes, and the chart series.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardResponse {
    discounts: Vec<DiscountSummary>,
    totals: Option<PeriodTotals>,
    previous_totals: Option<PeriodTotals>,
    changes: MetricChanges,
    series: Vec<SeriesPoint>,
}

#[instrument(skip(state, headers))]
async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardResponse>, AppError> {
    let domain = headers
        .get("x-shopify-shop-domain")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing shop session".to_string()))?;

    let shops = ShopRepository::new(state.pool());
    let shop_id = match shops.resolve_shop_id(domain).await {
        Ok(id) => id,
        Err(RepositoryError::NotFound) => {
            return Err(AppError::Unauthorized(format!("Unknown shop: {domain}")));
        }
        Err(e) => return Err(e.into()),
    };

    let discount_id = params
        .discount
        .as_deref()
        .filter(|raw| *raw != "all")
        .map(|raw| {
            raw.parse::<Uuid>()
                .map(DiscountRecordId::new)
                .map_err(|_| AppError::BadRequest(format!("Invalid discount id: {raw}")))
        })
        .transpose()?;

    let lookback = Lookback::parse(params.period.as_deref().unwrap_or("7"));
    let today = Utc::now().date_naive();
    let (current, previous) = period_windows(lookback, today);

    let performance = PerformanceRepository::new(state.pool());
    let current_rows = performance
        .daily_rows(shop_id, discount_id, current.start, current.end)
        .await?;
    let previous_rows = performance
        .daily_rows(shop_id, discount_id, previous.start, previous.end)
        .await?;

    let totals = aggregate(&current_rows);
    let previous_totals = aggregate(&previous_rows);
    let changes = compare_periods(totals.as_ref(), previous_totals.as_ref());
    let series = chart_series(&current_rows, today);

    let discounts = DiscountRepository::new(state.pool())
        .list_for_shop(shop_id)
        .await?;

    Ok(Json(DashboardResponse {
        discounts,
        totals,
        previous_totals,
        changes,
        series,
    }))
}
