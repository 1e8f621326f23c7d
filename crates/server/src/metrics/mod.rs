//! Metrics aggregation over daily performance rows.
//!
//! Pure functions: the dashboard route fetches rows for the current and
//! previous windows and this module does the summation, weighted averages,
//! period-over-period deltas, and chart-series shaping.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::DailyPerformanceRow;

/// Requested lookback for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    /// Last N days up to today.
    Days(u32),
    /// Entire history, approximated by a multi-year window.
    All,
}

/// The "entire history" sentinel start date.
const ALL_HISTORY_START: NaiveDate = match NaiveDate::from_ymd_opt(2000, 1, 1) {
    Some(d) => d,
    None => unreachable!(),
};

impl Lookback {
    /// Parse the dashboard's period query value (`7`, `30`, `90`, or
    /// `all`). Unknown values fall back to 7 days.
    #[must_use]
    pub fn parse(period: &str) -> Self {
        if period == "all" {
            return Self::All;
        }
        match period.parse::<u32>() {
            Ok(days) if days > 0 => Self::Days(days),
            _ => Self::Days(7),
        }
    }
}

/// An inclusive `[start, end]` date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Derive the current window and the immediately preceding equal-length
/// window for period-over-period comparison.
#[must_use]
pub fn period_windows(lookback: Lookback, today: NaiveDate) -> (DateWindow, DateWindow) {
    let start = match lookback {
        Lookback::Days(days) => today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(ALL_HISTORY_START),
        Lookback::All => ALL_HISTORY_START,
    };

    let current = DateWindow { start, end: today };

    let length = u64::try_from((today - start).num_days()).unwrap_or(0);
    let previous_end = start.checked_sub_days(Days::new(1)).unwrap_or(start);
    let previous_start = start.checked_sub_days(Days::new(length)).unwrap_or(start);

    (
        current,
        DateWindow {
            start: previous_start,
            end: previous_end,
        },
    )
}

/// Summed totals for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotals {
    pub orders_count: i64,
    pub total_orders_value: Decimal,
    pub total_discount_expense: Decimal,
    /// Order value net of discount spend, summed over the period.
    pub revenue_uplift: Decimal,
    /// Weighted: total value over total count, never a mean of daily
    /// averages (which would bias toward low-volume days).
    pub average_order_value: Decimal,
}

/// Sum a row set into period totals.
///
/// Returns `None` for an empty set so callers can render "no data" rather
/// than "$0" - a zero-valued day still aggregates to zero totals.
#[must_use]
pub fn aggregate(rows: &[DailyPerformanceRow]) -> Option<PeriodTotals> {
    if rows.is_empty() {
        return None;
    }

    let orders_count: i64 = rows.iter().map(|r| r.orders_count).sum();
    let total_orders_value: Decimal = rows.iter().map(|r| r.total_orders_value).sum();
    let total_discount_expense: Decimal = rows.iter().map(|r| r.total_discount_expense).sum();

    let average_order_value = if orders_count == 0 {
        Decimal::ZERO
    } else {
        total_orders_value / Decimal::from(orders_count)
    };

    Some(PeriodTotals {
        orders_count,
        total_orders_value,
        total_discount_expense,
        revenue_uplift: total_orders_value - total_discount_expense,
        average_order_value,
    })
}

/// A period-over-period delta, with a sentinel for "no baseline".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricChange {
    /// No previous-period baseline (missing or zero) - rendering a
    /// percentage would be misleading.
    New,
    /// Percentage change relative to the previous period.
    Percent(Decimal),
}

impl Serialize for MetricChange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::New => serializer.serialize_str("new"),
            Self::Percent(p) => Serialize::serialize(p, serializer),
        }
    }
}

/// `(current - previous) / previous * 100`, or [`MetricChange::New`] when
/// the baseline is absent or zero.
#[must_use]
pub fn period_over_period(current: Decimal, previous: Option<Decimal>) -> MetricChange {
    match previous {
        None => MetricChange::New,
        Some(p) if p == Decimal::ZERO => MetricChange::New,
        Some(p) => MetricChange::Percent((current - p) / p * Decimal::ONE_HUNDRED),
    }
}

/// Deltas for the four headline metrics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricChanges {
    pub orders_count: MetricChange,
    pub total_orders_value: MetricChange,
    pub total_discount_expense: MetricChange,
    pub revenue_uplift: MetricChange,
    pub average_order_value: MetricChange,
}

/// Compare two period aggregates metric by metric.
#[must_use]
pub fn compare_periods(
    current: Option<&PeriodTotals>,
    previous: Option<&PeriodTotals>,
) -> MetricChanges {
    let cur = |f: fn(&PeriodTotals) -> Decimal| current.map(f).unwrap_or_default();
    let prev = |f: fn(&PeriodTotals) -> Decimal| previous.map(f);

    MetricChanges {
        orders_count: period_over_period(
            current.map(|t| Decimal::from(t.orders_count)).unwrap_or_default(),
            previous.map(|t| Decimal::from(t.orders_count)),
        ),
        total_orders_value: period_over_period(
            cur(|t| t.total_orders_value),
            prev(|t| t.total_orders_value),
        ),
        total_discount_expense: period_over_period(
            cur(|t| t.total_discount_expense),
            prev(|t| t.total_discount_expense),
        ),
        revenue_uplift: period_over_period(cur(|t| t.revenue_uplift), prev(|t| t.revenue_uplift)),
        average_order_value: period_over_period(
            cur(|t| t.average_order_value),
            prev(|t| t.average_order_value),
        ),
    }
}

/// One chart point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub orders_count: i64,
    pub total_orders_value: Decimal,
    pub total_discount_expense: Decimal,
}

/// Build a day-by-day chart series from daily rows, padding a zero point
/// for today when the ETL has not landed same-day data yet, and keeping
/// the series sorted ascending by date.
#[must_use]
pub fn chart_series(rows: &[DailyPerformanceRow], today: NaiveDate) -> Vec<SeriesPoint> {
    let mut series: Vec<SeriesPoint> = rows
        .iter()
        .map(|r| SeriesPoint {
            date: r.metric_date,
            orders_count: r.orders_count,
            total_orders_value: r.total_orders_value,
            total_discount_expense: r.total_discount_expense,
        })
        .collect();

    if !series.iter().any(|p| p.date == today) {
        series.push(SeriesPoint {
            date: today,
            orders_count: 0,
            total_orders_value: Decimal::ZERO,
            total_discount_expense: Decimal::ZERO,
        });
    }

    series.sort_by_key(|p| p.date);
    series
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn row(d: &str, orders: i64, value: &str, discount: &str) -> DailyPerformanceRow {
        DailyPerformanceRow {
            metric_date: date(d),
            discount_id: None,
            orders_count: orders,
            total_orders_value: dec(value),
            total_discount_expense: dec(discount),
            revenue_uplift: dec(value) - dec(discount),
            average_order_value: if orders == 0 {
                Decimal::ZERO
            } else {
                dec(value) / Decimal::from(orders)
            },
        }
    }

    #[test]
    fn test_empty_set_is_null_not_zero() {
        assert!(aggregate(&[]).is_none());

        let zero_day = aggregate(&[row("2025-08-01", 0, "0", "0")]).unwrap();
        assert_eq!(zero_day.orders_count, 0);
        assert_eq!(zero_day.total_orders_value, Decimal::ZERO);
    }

    #[test]
    fn test_weighted_average_order_value() {
        let totals = aggregate(&[
            row("2025-08-01", 10, "1000", "50"),
            row("2025-08-02", 5, "250", "25"),
        ])
        .unwrap();

        assert_eq!(totals.orders_count, 15);
        assert_eq!(totals.total_orders_value, dec("1250"));
        assert_eq!(totals.revenue_uplift, dec("1175"));
        // 1250 / 15, not the mean of 100 and 50.
        let expected = dec("1250") / dec("15");
        assert_eq!(totals.average_order_value, expected);
        assert!(totals.average_order_value > dec("83.33"));
        assert!(totals.average_order_value < dec("83.34"));
    }

    #[test]
    fn test_change_sentinel() {
        assert_eq!(period_over_period(dec("100"), Some(Decimal::ZERO)), MetricChange::New);
        assert_eq!(period_over_period(dec("100"), None), MetricChange::New);
        assert_eq!(
            period_over_period(dec("150"), Some(dec("100"))),
            MetricChange::Percent(dec("50"))
        );
        assert_eq!(
            period_over_period(dec("50"), Some(dec("100"))),
            MetricChange::Percent(dec("-50"))
        );
    }

    #[test]
    fn test_change_serializes_as_string_or_number() {
        let new = serde_json::to_value(MetricChange::New).unwrap();
        assert_eq!(new, serde_json::json!("new"));

        let pct = serde_json::to_value(MetricChange::Percent(dec("50"))).unwrap();
        assert_eq!(pct, serde_json::json!("50"));
    }

    #[test]
    fn test_period_windows() {
        let today = date("2025-08-23");
        let (current, previous) = period_windows(Lookback::Days(30), today);

        assert_eq!(current.end, today);
        assert_eq!(current.start, date("2025-07-24"));
        assert_eq!(previous.end, date("2025-07-23"));
        assert_eq!(previous.start, date("2025-06-24"));
    }

    #[test]
    fn test_all_history_window() {
        let today = date("2025-08-23");
        let (current, _previous) = period_windows(Lookback::All, today);
        assert_eq!(current.start, date("2000-01-01"));
        assert_eq!(current.end, today);
    }

    #[test]
    fn test_lookback_parse() {
        assert_eq!(Lookback::parse("7"), Lookback::Days(7));
        assert_eq!(Lookback::parse("30"), Lookback::Days(30));
        assert_eq!(Lookback::parse("90"), Lookback::Days(90));
        assert_eq!(Lookback::parse("all"), Lookback::All);
        assert_eq!(Lookback::parse("garbage"), Lookback::Days(7));
        assert_eq!(Lookback::parse("0"), Lookback::Days(7));
    }

    #[test]
    fn test_series_pads_today_and_sorts() {
        let today = date("2025-08-23");
        let rows = [
            row("2025-08-21", 3, "300", "10"),
            row("2025-08-19", 1, "80", "0"),
        ];

        let series = chart_series(&rows, today);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].date, date("2025-08-19"));
        assert_eq!(series[1].date, date("2025-08-21"));
        assert_eq!(series[2].date, today);
        assert_eq!(series[2].orders_count, 0);
        assert_eq!(series[2].total_orders_value, Decimal::ZERO);
    }

    #[test]
    fn test_series_does_not_duplicate_today() {
        let today = date("2025-08-23");
        let rows = [row("2025-08-23", 2, "100", "5")];

        let series = chart_series(&rows, today);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].orders_count, 2);
    }

    #[test]
    fn test_compare_periods_no_baseline() {
        let current = aggregate(&[row("2025-08-01", 10, "1000", "50")]);
        let changes = compare_periods(current.as_ref(), None);
        assert_eq!(changes.orders_count, MetricChange::New);
        assert_eq!(changes.total_orders_value, MetricChange::New);
    }

    #[test]
    fn test_compare_periods_with_baseline() {
        let current = aggregate(&[row("2025-08-10", 15, "1500", "60")]);
        let previous = aggregate(&[row("2025-08-01", 10, "1000", "50")]);
        let changes = compare_periods(current.as_ref(), previous.as_ref());
        assert_eq!(changes.orders_count, MetricChange::Percent(dec("50")));
        assert_eq!(changes.total_orders_value, MetricChange::Percent(dec("50")));
        assert_eq!(changes.total_discount_expense, MetricChange::Percent(dec("20")));
    }
}
