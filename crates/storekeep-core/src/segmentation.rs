//! # Segmentation & Risk Engine
//!
//! Pure functions mapping accumulated customer metrics to a segment, an
//! inactivity (churn) risk score and a loyalty score.
//!
//! ## Segment Ladder
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Evaluated top to bottom, first match wins                              │
//! │                                                                         │
//! │  purchases == 0                              → new                      │
//! │  spent ≥ 5000.00   OR  avg ticket ≥ 500.00   → vip                      │
//! │  spent ≥ 2000.00   OR  avg ticket ≥ 300.00   → premium                  │
//! │  purchases ≥ 5                               → regular                  │
//! │  otherwise                                   → bronze                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `inactive` is never produced here; it comes from the customer's
//! lifecycle status (see [`crate::customer::Customer::effective_segment`]).

use crate::customer::CustomerSegment;
use crate::money::Money;

/// Lifetime spend at which a customer becomes VIP.
pub const VIP_SPENT: Money = Money::from_major(5000);
/// Average ticket at which a customer becomes VIP.
pub const VIP_TICKET: Money = Money::from_major(500);
/// Lifetime spend at which a customer becomes premium.
pub const PREMIUM_SPENT: Money = Money::from_major(2000);
/// Average ticket at which a customer becomes premium.
pub const PREMIUM_TICKET: Money = Money::from_major(300);
/// Purchases at which a customer becomes regular.
pub const REGULAR_PURCHASES: i64 = 5;

/// Days without purchase before any churn risk accrues.
pub const RISK_GRACE_DAYS: i64 = 30;
/// Days without purchase at which raw risk saturates at 100.
pub const RISK_SATURATION_DAYS: f64 = 180.0;

/// Classifies a customer from accumulated totals.
///
/// The average ticket is `total_spent / total_purchases` taken exactly;
/// the cent-rounded figure stored on the metrics never decides a tier.
///
/// ## Example
/// ```rust
/// use storekeep_core::customer::CustomerSegment;
/// use storekeep_core::money::Money;
/// use storekeep_core::segmentation::segment;
///
/// assert_eq!(segment(0, Money::zero()), CustomerSegment::New);
/// assert_eq!(segment(6, Money::zero()), CustomerSegment::Regular);
/// assert_eq!(segment(1, Money::from_major(5000)), CustomerSegment::Vip);
/// // 999.99 over two purchases averages 499.995, short of 500.00
/// assert_eq!(segment(2, Money::from_cents(99_999)), CustomerSegment::Premium);
/// ```
pub fn segment(total_purchases: i64, total_spent: Money) -> CustomerSegment {
    if total_purchases <= 0 {
        CustomerSegment::New
    } else if total_spent >= VIP_SPENT || ticket_reaches(total_purchases, total_spent, VIP_TICKET) {
        CustomerSegment::Vip
    } else if total_spent >= PREMIUM_SPENT
        || ticket_reaches(total_purchases, total_spent, PREMIUM_TICKET)
    {
        CustomerSegment::Premium
    } else if total_purchases >= REGULAR_PURCHASES {
        CustomerSegment::Regular
    } else {
        CustomerSegment::Bronze
    }
}

/// `total_spent / total_purchases >= threshold`, cross-multiplied in i128.
fn ticket_reaches(total_purchases: i64, total_spent: Money, threshold: Money) -> bool {
    i128::from(total_spent.cents()) >= i128::from(threshold.cents()) * i128::from(total_purchases)
}

/// Churn risk (0-100) from days since the last purchase.
///
/// ```text
/// days ≤ 30      → 0
/// otherwise      → min(days / 180 × 100, 100) × loyalty discount
///
/// loyalty discount: ≥10 purchases ×0.7, ≥5 ×0.8, ≥3 ×0.9, else ×1.0
/// ```
pub fn inactivity_risk(days_since_last_purchase: i64, total_purchases: i64) -> u8 {
    if days_since_last_purchase <= RISK_GRACE_DAYS {
        return 0;
    }

    let raw = (days_since_last_purchase as f64 / RISK_SATURATION_DAYS * 100.0).min(100.0);
    let discount = if total_purchases >= 10 {
        0.7
    } else if total_purchases >= 5 {
        0.8
    } else if total_purchases >= 3 {
        0.9
    } else {
        1.0
    };

    (raw * discount).round().clamp(0.0, 100.0) as u8
}

/// Loyalty score (0-100).
///
/// ```text
/// min(purchases × 4, 40)        frequency
/// + min(spent / 100, 30)         value (whole units)
/// + min(points / 50, 20)         program engagement
/// + recency bonus                10 if ≤ 30 days, 5 if ≤ 60 days
/// capped at 100, rounded
/// ```
pub fn loyalty_score(
    total_purchases: i64,
    total_spent: Money,
    loyalty_points: i64,
    days_since_last_purchase: i64,
) -> u8 {
    let frequency = (total_purchases.max(0) as f64 * 4.0).min(40.0);
    let value = (total_spent.as_major_f64().max(0.0) / 100.0).min(30.0);
    let engagement = (loyalty_points.max(0) as f64 / 50.0).min(20.0);
    let recency = if days_since_last_purchase <= 30 {
        10.0
    } else if days_since_last_purchase <= 60 {
        5.0
    } else {
        0.0
    };

    (frequency + value + engagement + recency).min(100.0).round() as u8
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_ladder() {
        assert_eq!(segment(0, Money::from_major(9999)), CustomerSegment::New);
        assert_eq!(segment(6, Money::zero()), CustomerSegment::Regular);
        assert_eq!(segment(9, Money::from_major(5000)), CustomerSegment::Vip);
        assert_eq!(segment(1, Money::from_major(500)), CustomerSegment::Vip);
        assert_eq!(segment(5, Money::from_major(2200)), CustomerSegment::Premium);
        assert_eq!(segment(2, Money::from_major(600)), CustomerSegment::Premium);
        assert_eq!(segment(4, Money::from_major(100)), CustomerSegment::Bronze);
    }

    #[test]
    fn test_segment_boundaries_just_below() {
        let below_vip = Money::from_cents(VIP_SPENT.cents() - 1);
        assert_eq!(segment(20, below_vip), CustomerSegment::Premium);

        let below_premium = Money::from_cents(PREMIUM_SPENT.cents() - 1);
        assert_eq!(segment(20, below_premium), CustomerSegment::Regular);
    }

    #[test]
    fn test_ticket_threshold_compared_exactly() {
        // 999.99 / 2 = 499.995 rounds to 500.00 but is still below VIP
        assert_eq!(segment(2, Money::from_cents(99_999)), CustomerSegment::Premium);
        assert_eq!(segment(2, Money::from_cents(100_000)), CustomerSegment::Vip);

        // 599.99 / 2 = 299.995 rounds to 300.00 but is still below premium
        assert_eq!(segment(2, Money::from_cents(59_999)), CustomerSegment::Bronze);
        assert_eq!(segment(2, Money::from_cents(60_000)), CustomerSegment::Premium);
    }

    #[test]
    fn test_inactivity_risk_grace_period() {
        assert_eq!(inactivity_risk(0, 0), 0);
        assert_eq!(inactivity_risk(15, 20), 0);
        assert_eq!(inactivity_risk(30, 0), 0);
    }

    #[test]
    fn test_inactivity_risk_scaling() {
        assert_eq!(inactivity_risk(180, 0), 100);
        assert_eq!(inactivity_risk(365, 0), 100);
        assert_eq!(inactivity_risk(90, 0), 50);
        assert_eq!(inactivity_risk(180, 3), 90);
        assert_eq!(inactivity_risk(180, 5), 80);
        assert_eq!(inactivity_risk(180, 10), 70);
        // 45/180 × 100 = 25 → × 0.9 = 22.5 → 23
        assert_eq!(inactivity_risk(45, 4), 23);
    }

    #[test]
    fn test_loyalty_score_components() {
        assert_eq!(loyalty_score(0, Money::zero(), 0, 365), 0);
        // 5 × 4 = 20, 2200 / 100 = 22, 220 / 50 = 4.4, recency 10 → 56.4
        assert_eq!(loyalty_score(5, Money::from_major(2200), 220, 10), 56);
        // 8 × 4 = 32, 500 / 100 = 5, 0, recency 5 → 42
        assert_eq!(loyalty_score(8, Money::from_major(500), 0, 45), 42);
    }

    #[test]
    fn test_loyalty_score_capped() {
        assert_eq!(loyalty_score(100, Money::from_major(100_000), 100_000, 1), 100);
    }
}
