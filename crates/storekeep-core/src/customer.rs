//! # Customer Types & Statistics
//!
//! The customer record and the pure half of the Customer Statistics Engine:
//! how one completed sale folds into a customer's cumulative metrics.
//!
//! ## Purchase Fold
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CustomerMetrics (before)  +  Sale (completed)                          │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  total_purchases  += 1                                                  │
//! │  total_spent      += sale.total                                         │
//! │  average_ticket    = total_spent / total_purchases                      │
//! │  loyalty_points   += floor(sale.total / 10.00)                          │
//! │  first_purchase    = first_purchase OR now                              │
//! │  last_purchase     = now                                                │
//! │  favorites         = merge per-item quantities, sort desc, truncate     │
//! │  segment           = segmentation::segment(updated totals)              │
//! │  risk_score        = 0 (just purchased)                                 │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  CustomerMetrics (after)                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::segmentation;
use crate::types::Sale;
use crate::{TOP_FAVORITE_CATEGORIES, TOP_FAVORITE_PRODUCTS};

/// One loyalty point per this much spent.
pub const POINTS_STEP: Money = Money::from_major(10);

// =============================================================================
// Status & Segment
// =============================================================================

/// Customer lifecycle status. Customers are never physically removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
}

/// Customer classification tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CustomerSegment {
    #[default]
    New,
    Bronze,
    Regular,
    Premium,
    Vip,
    Inactive,
}

impl CustomerSegment {
    /// All segments, in ladder order.
    pub const ALL: [CustomerSegment; 6] = [
        CustomerSegment::New,
        CustomerSegment::Bronze,
        CustomerSegment::Regular,
        CustomerSegment::Premium,
        CustomerSegment::Vip,
        CustomerSegment::Inactive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerSegment::New => "new",
            CustomerSegment::Bronze => "bronze",
            CustomerSegment::Regular => "regular",
            CustomerSegment::Premium => "premium",
            CustomerSegment::Vip => "vip",
            CustomerSegment::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for CustomerSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Ranked Favorites
// =============================================================================

/// An entry in a frequency-ranked favorites list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    /// Stable key (category name, product id).
    pub key: String,
    /// Display label (category name, product name).
    pub label: String,
    /// Accumulated quantity.
    pub count: i64,
}

/// Merges `(key, label, quantity)` increments into `existing`, re-sorts by
/// count descending (ties by label, then key) and keeps the top `limit`.
///
/// Entries that fell off a truncated list start again from zero when they
/// reappear; the list is bounded, not a full history.
pub fn merge_ranked<'a, I>(existing: &[RankedEntry], increments: I, limit: usize) -> Vec<RankedEntry>
where
    I: IntoIterator<Item = (&'a str, &'a str, i64)>,
{
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, RankedEntry> = HashMap::new();

    for entry in existing {
        order.push(entry.key.clone());
        merged.insert(entry.key.clone(), entry.clone());
    }

    for (key, label, quantity) in increments {
        match merged.get_mut(key) {
            Some(entry) => {
                entry.count += quantity;
                entry.label = label.to_string();
            }
            None => {
                order.push(key.to_string());
                merged.insert(
                    key.to_string(),
                    RankedEntry {
                        key: key.to_string(),
                        label: label.to_string(),
                        count: quantity,
                    },
                );
            }
        }
    }

    let mut ranked: Vec<RankedEntry> = order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| a.key.cmp(&b.key))
    });
    ranked.truncate(limit);
    ranked
}

// =============================================================================
// Customer Metrics
// =============================================================================

/// Cumulative purchase metrics.
///
/// Owned exclusively by the Customer Statistics Engine; contact-editing
/// paths never write these fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerMetrics {
    pub total_purchases: i64,
    pub total_spent: Money,
    /// `total_spent / total_purchases`, or zero without purchases.
    pub average_ticket: Money,
    pub loyalty_points: i64,
    /// Churn risk 0-100.
    pub risk_score: u8,
    pub segment: CustomerSegment,
    pub favorite_categories: Vec<RankedEntry>,
    pub favorite_products: Vec<RankedEntry>,
    #[ts(as = "Option<String>")]
    pub first_purchase_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub last_purchase_date: Option<DateTime<Utc>>,
}

impl CustomerMetrics {
    /// Folds one completed sale into the metrics.
    ///
    /// ## Example
    /// ```rust
    /// use storekeep_core::customer::{CustomerMetrics, CustomerSegment};
    /// use storekeep_core::money::Money;
    /// # use storekeep_core::types::{Actor, Sale, SaleLineItem};
    /// # use chrono::Utc;
    ///
    /// let before = CustomerMetrics {
    ///     total_purchases: 4,
    ///     total_spent: Money::from_major(1800),
    ///     ..CustomerMetrics::default()
    /// };
    /// # let item = SaleLineItem { product_id: "p".into(), name: "Kit".into(), quantity: 1,
    /// #     unit_price: Money::from_major(400), category: "Kits".into() };
    /// # let sale = Sale::completed("s", &Actor::system(), vec![item], None, Utc::now());
    /// let after = before.record_purchase(&sale, Utc::now());
    ///
    /// assert_eq!(after.total_purchases, 5);
    /// assert_eq!(after.total_spent, Money::from_major(2200));
    /// assert_eq!(after.average_ticket, Money::from_major(440));
    /// assert_eq!(after.segment, CustomerSegment::Premium);
    /// ```
    pub fn record_purchase(&self, sale: &Sale, now: DateTime<Utc>) -> CustomerMetrics {
        let total_purchases = self.total_purchases + 1;
        let total_spent = self.total_spent + sale.total;
        let average_ticket = total_spent.divide_rounded(total_purchases);
        let loyalty_points = self.loyalty_points + sale.total.count_whole(POINTS_STEP);

        let favorite_categories = merge_ranked(
            &self.favorite_categories,
            sale.items
                .iter()
                .map(|i| (i.category.as_str(), i.category.as_str(), i.quantity)),
            TOP_FAVORITE_CATEGORIES,
        );
        let favorite_products = merge_ranked(
            &self.favorite_products,
            sale.items
                .iter()
                .map(|i| (i.product_id.as_str(), i.name.as_str(), i.quantity)),
            TOP_FAVORITE_PRODUCTS,
        );

        CustomerMetrics {
            total_purchases,
            total_spent,
            average_ticket,
            loyalty_points,
            risk_score: segmentation::inactivity_risk(0, total_purchases),
            segment: segmentation::segment(total_purchases, total_spent),
            favorite_categories,
            favorite_products,
            first_purchase_date: self.first_purchase_date.or(Some(now)),
            last_purchase_date: Some(now),
        }
    }

    /// Whole days since the last purchase, if any purchase was made.
    pub fn days_since_last_purchase(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_purchase_date
            .map(|last| (now - last).num_days().max(0))
    }

    /// Churn risk as of `now`. Customers without purchases carry no risk.
    pub fn current_risk(&self, now: DateTime<Utc>) -> u8 {
        match self.days_since_last_purchase(now) {
            Some(days) => segmentation::inactivity_risk(days, self.total_purchases),
            None => 0,
        }
    }

    /// Loyalty score as of `now`.
    pub fn loyalty_score(&self, now: DateTime<Utc>) -> u8 {
        let days = self.days_since_last_purchase(now).unwrap_or(i64::MAX);
        segmentation::loyalty_score(
            self.total_purchases,
            self.total_spent,
            self.loyalty_points,
            days,
        )
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Digits only; natural dedup key.
    pub phone: String,
    pub email: Option<String>,
    /// Brazilian taxpayer id, digits only.
    pub cpf: Option<String>,
    pub status: CustomerStatus,
    pub metrics: CustomerMetrics,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }

    /// The segment to persist for the current status and metrics.
    ///
    /// Inactive customers are pinned to `inactive`; everyone else follows
    /// the ladder.
    pub fn effective_segment(&self) -> CustomerSegment {
        match self.status {
            CustomerStatus::Inactive => CustomerSegment::Inactive,
            CustomerStatus::Active => {
                segmentation::segment(self.metrics.total_purchases, self.metrics.total_spent)
            }
        }
    }

    /// Applies a completed sale and returns the updated customer.
    pub fn with_purchase(&self, sale: &Sale, now: DateTime<Utc>) -> Customer {
        let mut updated = self.clone();
        updated.metrics = self.metrics.record_purchase(sale, now);
        updated.metrics.segment = updated.effective_segment();
        updated.updated_at = now;
        updated
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Actor, SaleLineItem};
    use chrono::Duration;

    fn line(product_id: &str, name: &str, category: &str, qty: i64, cents: i64) -> SaleLineItem {
        SaleLineItem {
            product_id: product_id.to_string(),
            name: name.to_string(),
            quantity: qty,
            unit_price: Money::from_cents(cents),
            category: category.to_string(),
        }
    }

    fn sale(items: Vec<SaleLineItem>) -> Sale {
        Sale::completed("s-1", &Actor::system(), items, Some("c-1".into()), Utc::now())
    }

    fn customer(metrics: CustomerMetrics) -> Customer {
        Customer {
            id: "c-1".to_string(),
            name: "Ana".to_string(),
            phone: "11999990000".to_string(),
            email: None,
            cpf: None,
            status: CustomerStatus::Active,
            metrics,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_first_purchase_sets_dates_and_points() {
        let now = Utc::now();
        let s = sale(vec![line("p-1", "Caneca", "Cozinha", 2, 2_350)]);
        let after = CustomerMetrics::default().record_purchase(&s, now);

        assert_eq!(after.total_purchases, 1);
        assert_eq!(after.total_spent.cents(), 4_700);
        assert_eq!(after.average_ticket.cents(), 4_700);
        assert_eq!(after.loyalty_points, 4);
        assert_eq!(after.first_purchase_date, Some(now));
        assert_eq!(after.last_purchase_date, Some(now));
        assert_eq!(after.segment, CustomerSegment::Bronze);
    }

    #[test]
    fn test_first_purchase_date_is_kept() {
        let first = Utc::now() - Duration::days(90);
        let before = CustomerMetrics {
            total_purchases: 1,
            total_spent: Money::from_major(50),
            average_ticket: Money::from_major(50),
            first_purchase_date: Some(first),
            last_purchase_date: Some(first),
            ..CustomerMetrics::default()
        };
        let now = Utc::now();
        let after = before.record_purchase(&sale(vec![line("p", "X", "Y", 1, 100)]), now);

        assert_eq!(after.first_purchase_date, Some(first));
        assert_eq!(after.last_purchase_date, Some(now));
    }

    #[test]
    fn test_promotion_to_premium() {
        let before = CustomerMetrics {
            total_purchases: 4,
            total_spent: Money::from_major(1800),
            average_ticket: Money::from_major(450),
            loyalty_points: 180,
            segment: CustomerSegment::Bronze,
            ..CustomerMetrics::default()
        };
        let after = before.record_purchase(&sale(vec![line("p", "Kit", "Kits", 1, 40_000)]), Utc::now());

        assert_eq!(after.total_purchases, 5);
        assert_eq!(after.total_spent, Money::from_major(2200));
        assert_eq!(after.average_ticket, Money::from_major(440));
        assert_eq!(after.loyalty_points, 220);
        assert_eq!(after.segment, CustomerSegment::Premium);
    }

    #[test]
    fn test_rounded_average_does_not_promote() {
        let before = CustomerMetrics {
            total_purchases: 1,
            total_spent: Money::from_cents(49_999),
            average_ticket: Money::from_cents(49_999),
            ..CustomerMetrics::default()
        };
        let after = before.record_purchase(&sale(vec![line("p", "Kit", "Kits", 1, 50_000)]), Utc::now());

        // 999.99 / 2 = 499.995: stored as 500.00, classified below VIP
        assert_eq!(after.average_ticket.cents(), 50_000);
        assert_eq!(after.segment, CustomerSegment::Premium);

        let mut reactivated = customer(after);
        reactivated.metrics.segment = CustomerSegment::Inactive;
        assert_eq!(reactivated.effective_segment(), CustomerSegment::Premium);
    }

    #[test]
    fn test_favorites_merge_and_rank() {
        let existing = vec![
            RankedEntry { key: "Cozinha".into(), label: "Cozinha".into(), count: 3 },
            RankedEntry { key: "Banho".into(), label: "Banho".into(), count: 2 },
        ];
        let merged = merge_ranked(
            &existing,
            vec![("Banho", "Banho", 4), ("Jardim", "Jardim", 1)],
            5,
        );

        let keys: Vec<&str> = merged.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["Banho", "Cozinha", "Jardim"]);
        assert_eq!(merged[0].count, 6);
    }

    #[test]
    fn test_favorites_truncated() {
        let increments: Vec<(String, i64)> = (0..12).map(|i| (format!("p-{:02}", i), i + 1)).collect();
        let merged = merge_ranked(
            &[],
            increments.iter().map(|(k, q)| (k.as_str(), k.as_str(), *q)),
            TOP_FAVORITE_PRODUCTS,
        );

        assert_eq!(merged.len(), TOP_FAVORITE_PRODUCTS);
        assert_eq!(merged[0].key, "p-11");
        assert!(merged.iter().all(|e| e.key != "p-00" && e.key != "p-01"));
    }

    #[test]
    fn test_categories_capped_at_five() {
        let items: Vec<SaleLineItem> = (0..7)
            .map(|i| line(&format!("p-{}", i), "X", &format!("cat-{}", i), 1, 100))
            .collect();
        let after = CustomerMetrics::default().record_purchase(&sale(items), Utc::now());
        assert_eq!(after.favorite_categories.len(), TOP_FAVORITE_CATEGORIES);
        assert_eq!(after.favorite_products.len(), 7);
    }

    #[test]
    fn test_inactive_customer_keeps_inactive_segment() {
        let mut c = customer(CustomerMetrics::default());
        c.status = CustomerStatus::Inactive;
        let updated = c.with_purchase(&sale(vec![line("p", "X", "Y", 1, 100_000)]), Utc::now());

        assert_eq!(updated.metrics.total_purchases, 1);
        assert_eq!(updated.metrics.segment, CustomerSegment::Inactive);
    }

    #[test]
    fn test_current_risk() {
        let now = Utc::now();
        let metrics = CustomerMetrics {
            total_purchases: 1,
            last_purchase_date: Some(now - Duration::days(180)),
            ..CustomerMetrics::default()
        };
        assert_eq!(metrics.current_risk(now), 100);
        assert_eq!(CustomerMetrics::default().current_risk(now), 0);
    }
}
