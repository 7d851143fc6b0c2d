//! # Customer Insights
//!
//! Dashboard rollups derived from the customer set. Pure: the same customers
//! and the same `now` always produce the same insights, and nothing here
//! writes anywhere.
//!
//! ## What Gets Computed
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  active customers ──┬──► segment distribution (ladder order)            │
//! │                     ├──► revenue: total, average per buyer              │
//! │                     ├──► median of per-customer average tickets         │
//! │                     ├──► retention: % with at least one purchase        │
//! │                     ├──► growth: new this month vs last month           │
//! │                     ├──► top N by spend                                 │
//! │                     └──► alerts: inactive, low value, churn risk        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::customer::{Customer, CustomerSegment};
use crate::money::Money;
use crate::TOP_CUSTOMERS;

// =============================================================================
// Parameters
// =============================================================================

/// Thresholds the aggregation depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightsParams {
    /// How many customers the top-spenders list holds.
    pub top_customers: usize,
    /// Days without purchase after which a buyer counts as inactive.
    pub inactivity_alert_days: i64,
    /// Churn risk strictly above this raises an alert.
    pub churn_alert_threshold: u8,
    /// Buyers whose lifetime spend is below this are low value.
    pub low_value_threshold: Money,
}

impl Default for InsightsParams {
    fn default() -> Self {
        InsightsParams {
            top_customers: TOP_CUSTOMERS,
            inactivity_alert_days: 60,
            churn_alert_threshold: 70,
            low_value_threshold: Money::from_major(100),
        }
    }
}

// =============================================================================
// Result Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SegmentCount {
    pub segment: CustomerSegment,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
    pub id: String,
    pub name: String,
    pub total_spent: Money,
    pub total_purchases: i64,
    pub segment: CustomerSegment,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InsightAlerts {
    /// Buyers with no purchase for longer than the inactivity window.
    pub inactive: usize,
    /// Buyers below the low-value spend threshold.
    pub low_value: usize,
    /// Buyers whose churn risk is above the alert threshold.
    pub high_churn_risk: usize,
}

/// Customer analytics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInsights {
    pub total_customers: usize,
    pub customers_with_purchases: usize,
    pub segments: Vec<SegmentCount>,
    pub total_revenue: Money,
    /// Revenue per customer with at least one purchase.
    pub average_revenue: Money,
    pub median_ticket: Money,
    /// Percentage (0-100) of customers with at least one purchase.
    pub retention_rate: f64,
    /// Month-over-month change in new registrations, percent.
    pub growth_rate: f64,
    pub new_customers_this_month: usize,
    pub new_customers_last_month: usize,
    pub top_customers: Vec<TopCustomer>,
    pub alerts: InsightAlerts,
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
}

// =============================================================================
// Computation
// =============================================================================

/// Builds insights over the active customers in `customers`.
///
/// Inactive customers are skipped entirely, so passing an unfiltered list is
/// fine.
pub fn compute(customers: &[Customer], now: DateTime<Utc>, params: &InsightsParams) -> CustomerInsights {
    let active: Vec<&Customer> = customers.iter().filter(|c| c.is_active()).collect();
    let buyers: Vec<&Customer> = active
        .iter()
        .copied()
        .filter(|c| c.metrics.total_purchases > 0)
        .collect();

    let segments = CustomerSegment::ALL
        .iter()
        .map(|segment| SegmentCount {
            segment: *segment,
            count: active.iter().filter(|c| c.metrics.segment == *segment).count(),
        })
        .collect();

    let total_revenue: Money = active.iter().map(|c| c.metrics.total_spent).sum();
    let average_revenue = total_revenue.divide_rounded(buyers.len() as i64);
    let median_ticket = median(buyers.iter().map(|c| c.metrics.average_ticket).collect());
    let retention_rate = percentage(buyers.len(), active.len());

    let (this_month, last_month) = month_keys(now);
    let new_customers_this_month = active
        .iter()
        .filter(|c| month_key(c.created_at) == this_month)
        .count();
    let new_customers_last_month = active
        .iter()
        .filter(|c| month_key(c.created_at) == last_month)
        .count();
    let growth_rate = growth(new_customers_this_month, new_customers_last_month);

    let mut ranked = buyers.clone();
    ranked.sort_by(|a, b| {
        b.metrics
            .total_spent
            .cmp(&a.metrics.total_spent)
            .then_with(|| a.name.cmp(&b.name))
    });
    let top_customers = ranked
        .into_iter()
        .take(params.top_customers)
        .map(|c| TopCustomer {
            id: c.id.clone(),
            name: c.name.clone(),
            total_spent: c.metrics.total_spent,
            total_purchases: c.metrics.total_purchases,
            segment: c.metrics.segment,
        })
        .collect();

    let mut alerts = InsightAlerts::default();
    for customer in &buyers {
        let days = customer.metrics.days_since_last_purchase(now).unwrap_or(0);
        if days > params.inactivity_alert_days {
            alerts.inactive += 1;
        }
        if customer.metrics.total_spent < params.low_value_threshold {
            alerts.low_value += 1;
        }
        if customer.metrics.current_risk(now) > params.churn_alert_threshold {
            alerts.high_churn_risk += 1;
        }
    }

    CustomerInsights {
        total_customers: active.len(),
        customers_with_purchases: buyers.len(),
        segments,
        total_revenue,
        average_revenue,
        median_ticket,
        retention_rate,
        growth_rate,
        new_customers_this_month,
        new_customers_last_month,
        top_customers,
        alerts,
        generated_at: now,
    }
}

/// Standard median; the mean of the two middle values for even lengths.
pub fn median(mut values: Vec<Money>) -> Money {
    if values.is_empty() {
        return Money::zero();
    }
    values.sort();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]).divide_rounded(2)
    }
}

/// Month-over-month growth in percent.
///
/// ```text
/// previous == 0, current == 0 → 0
/// previous == 0, current  > 0 → 100
/// otherwise                   → (current - previous) / previous × 100
/// ```
pub fn growth(current: usize, previous: usize) -> f64 {
    if previous == 0 {
        return if current > 0 { 100.0 } else { 0.0 };
    }
    round2((current as f64 - previous as f64) / previous as f64 * 100.0)
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn month_key(at: DateTime<Utc>) -> (i32, u32) {
    (at.year(), at.month())
}

fn month_keys(now: DateTime<Utc>) -> ((i32, u32), (i32, u32)) {
    let current = month_key(now);
    let previous = if current.1 == 1 {
        (current.0 - 1, 12)
    } else {
        (current.0, current.1 - 1)
    };
    (current, previous)
}

// =============================================================================
// Unit Tests
// =============================================================================
