//! # Domain Types
//!
//! Catalog and ledger types used throughout Storekeep.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │  SaleLineItem   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  product_id     │       │
//! │  │  name, category │   │  seller         │   │  name snapshot  │       │
//! │  │  price          │   │  items[]        │   │  quantity > 0   │       │
//! │  │  stock ≥ 0      │   │  total (frozen) │   │  unit_price ≥ 0 │       │
//! │  │  low_stock_alert│   │  status         │   │  category snap. │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   StockLevel    │   │   SaleStatus    │   │ ActivityRecord  │       │
//! │  │  InStock        │   │  Completed      │   │  append-only    │       │
//! │  │  Low            │   │  Cancelled      │   │  audit trail    │       │
//! │  │  Out            │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Line items copy the product's name, price and category at commit time.
//! A sale total is computed once and never recomputed from the catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Actor
// =============================================================================

/// Who performed an action (seller, cancelling user, activity author).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    pub name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Actor used for work the engine does on its own behalf.
    pub fn system() -> Self {
        Actor::new("system", "System")
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Category used for favorite-category ranking.
    pub category: String,

    /// Unit price (never negative).
    pub price: Money,

    /// Units on hand (never negative).
    pub stock: i64,

    /// Stock at or below this value (and above zero) is "low".
    pub low_stock_alert: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Stock health classification of a single product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    InStock,
    Low,
    Out,
}

impl Product {
    /// Classifies current stock against the low-stock threshold.
    ///
    /// ```text
    /// stock == 0                     → Out
    /// 0 < stock ≤ low_stock_alert    → Low
    /// stock > low_stock_alert        → InStock
    /// ```
    pub fn stock_level(&self) -> StockLevel {
        if self.stock <= 0 {
            StockLevel::Out
        } else if self.stock <= self.low_stock_alert {
            StockLevel::Low
        } else {
            StockLevel::InStock
        }
    }

    /// Fails with `InsufficientStock` if `quantity` exceeds stock on hand.
    pub fn ensure_available(&self, quantity: i64) -> CoreResult<()> {
        if quantity > self.stock {
            return Err(CoreError::InsufficientStock {
                product_id: self.id.clone(),
                product_name: self.name.clone(),
                available: self.stock,
                requested: quantity,
            });
        }
        Ok(())
    }

    /// Value of the stock on hand at the current price.
    pub fn stock_value(&self) -> Money {
        self.price.multiply_quantity(self.stock.max(0))
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// A requested line of a sale before commit: which product, how many.
///
/// Price, name and category are snapshotted from the product inside the
/// commit transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            product_id: product_id.into(),
            quantity,
        }
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// There is no way back from `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Completed,
    Cancelled,
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaleStatus::Completed => write!(f, "completed"),
            SaleStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A line item in a sale (frozen product snapshot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineItem {
    pub product_id: String,
    /// Product name at time of sale.
    pub name: String,
    pub quantity: i64,
    /// Unit price at time of sale.
    pub unit_price: Money,
    /// Product category at time of sale.
    pub category: String,
}

impl SaleLineItem {
    /// Line total (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Who cancelled a sale, when and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    #[ts(as = "String")]
    pub cancelled_at: DateTime<Utc>,
    pub cancelled_by: String,
    pub reason: String,
}

/// A recorded sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
    pub seller_id: String,
    pub seller_name: String,
    pub items: Vec<SaleLineItem>,
    /// Σ quantity × unit_price, computed once at commit.
    pub total: Money,
    pub status: SaleStatus,
    pub customer_id: Option<String>,
    pub cancellation: Option<Cancellation>,
}

impl Sale {
    /// Computes the total of a set of line items.
    pub fn compute_total(items: &[SaleLineItem]) -> Money {
        items.iter().map(SaleLineItem::line_total).sum()
    }

    /// Builds a completed sale from snapshotted line items.
    pub fn completed(
        id: impl Into<String>,
        seller: &Actor,
        items: Vec<SaleLineItem>,
        customer_id: Option<String>,
        sold_at: DateTime<Utc>,
    ) -> Self {
        let total = Sale::compute_total(&items);
        Sale {
            id: id.into(),
            sold_at,
            seller_id: seller.id.clone(),
            seller_name: seller.name.clone(),
            items,
            total,
            status: SaleStatus::Completed,
            customer_id,
            cancellation: None,
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == SaleStatus::Cancelled
    }

    /// Total units across all line items.
    pub fn units(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

// =============================================================================
// Activity Records
// =============================================================================

/// A general system audit entry (`activities` collection).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: String,
    pub actor_id: String,
    pub actor_name: String,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    #[ts(type = "unknown")]
    pub metadata: serde_json::Value,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A customer-scoped audit entry (`customer_activities` collection).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerActivity {
    pub id: String,
    pub customer_id: String,
    pub actor_id: String,
    pub action: String,
    #[ts(type = "unknown")]
    pub metadata: serde_json::Value,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
