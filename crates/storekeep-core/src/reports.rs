//! # Reports
//!
//! Stock health and sales summaries built from plain lists. Like insights,
//! these never touch the store; the engine feeds them cached snapshots.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Product, Sale, SaleStatus, StockLevel};

// =============================================================================
// Stock Health
// =============================================================================

/// A product that needs attention (low or out of stock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub product_id: String,
    pub name: String,
    pub stock: i64,
    pub low_stock_alert: i64,
}

impl From<&Product> for StockAlert {
    fn from(p: &Product) -> Self {
        StockAlert {
            product_id: p.id.clone(),
            name: p.name.clone(),
            stock: p.stock,
            low_stock_alert: p.low_stock_alert,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockHealthReport {
    pub total_products: usize,
    pub in_stock: usize,
    /// Sorted by stock ascending, then name.
    pub low_stock: Vec<StockAlert>,
    /// Sorted by name.
    pub out_of_stock: Vec<StockAlert>,
    /// Σ price × stock over active products.
    pub inventory_value: Money,
}

impl StockHealthReport {
    /// Classifies every active product. Inactive products are ignored.
    pub fn from_products(products: &[Product]) -> Self {
        let mut report = StockHealthReport {
            total_products: 0,
            in_stock: 0,
            low_stock: Vec::new(),
            out_of_stock: Vec::new(),
            inventory_value: Money::zero(),
        };

        for product in products.iter().filter(|p| p.is_active) {
            report.total_products += 1;
            report.inventory_value += product.stock_value();
            match product.stock_level() {
                StockLevel::InStock => report.in_stock += 1,
                StockLevel::Low => report.low_stock.push(product.into()),
                StockLevel::Out => report.out_of_stock.push(product.into()),
            }
        }

        report
            .low_stock
            .sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
        report.out_of_stock.sort_by(|a, b| a.name.cmp(&b.name));
        report
    }
}

// =============================================================================
// Sales Summary
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub completed: usize,
    pub cancelled: usize,
    /// Revenue of completed sales only.
    pub gross_revenue: Money,
    /// Average completed sale total.
    pub average_ticket: Money,
    /// Units across completed sales.
    pub units_sold: i64,
}

impl SalesSummary {
    pub fn from_sales(sales: &[Sale]) -> Self {
        let mut summary = SalesSummary::default();

        for sale in sales {
            match sale.status {
                SaleStatus::Completed => {
                    summary.completed += 1;
                    summary.gross_revenue += sale.total;
                    summary.units_sold += sale.units();
                }
                SaleStatus::Cancelled => summary.cancelled += 1,
            }
        }

        summary.average_ticket = summary.gross_revenue.divide_rounded(summary.completed as i64);
        summary
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Actor, SaleLineItem};
    use chrono::Utc;

    fn product(name: &str, stock: i64, alert: i64, cents: i64, active: bool) -> Product {
        Product {
            id: format!("id-{name}"),
            name: name.to_string(),
            category: "Geral".to_string(),
            price: Money::from_cents(cents),
            stock,
            low_stock_alert: alert,
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_stock_health() {
        let products = vec![
            product("caneca", 20, 5, 1_000, true),
            product("prato", 3, 5, 2_000, true),
            product("copo", 1, 5, 500, true),
            product("jarra", 0, 5, 9_900, true),
            product("velho", 0, 5, 100, false),
        ];
        let report = StockHealthReport::from_products(&products);

        assert_eq!(report.total_products, 4);
        assert_eq!(report.in_stock, 1);
        let low: Vec<&str> = report.low_stock.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(low, vec!["copo", "prato"]);
        assert_eq!(report.out_of_stock.len(), 1);
        assert_eq!(report.out_of_stock[0].name, "jarra");
        // 20×10.00 + 3×20.00 + 1×5.00
        assert_eq!(report.inventory_value, Money::from_cents(26_500));
    }

    #[test]
    fn test_sales_summary() {
        let line = |quantity| SaleLineItem {
            product_id: "caneca".to_string(),
            name: "caneca".to_string(),
            quantity,
            unit_price: Money::from_cents(1_500),
            category: "Geral".to_string(),
        };
        let a = Sale::completed("a", &Actor::system(), vec![line(2)], None, Utc::now());
        let b = Sale::completed("b", &Actor::system(), vec![line(1)], None, Utc::now());
        let mut c = Sale::completed("c", &Actor::system(), vec![line(4)], None, Utc::now());
        c.status = SaleStatus::Cancelled;

        let summary = SalesSummary::from_sales(&[a, b, c]);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.gross_revenue, Money::from_cents(4_500));
        assert_eq!(summary.average_ticket, Money::from_cents(2_250));
        assert_eq!(summary.units_sold, 3);
    }

    #[test]
    fn test_empty_summary() {
        let summary = SalesSummary::from_sales(&[]);
        assert_eq!(summary, SalesSummary::default());
    }
}
