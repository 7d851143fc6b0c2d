//! # Ordering Policy Table
//!
//! Which column each collection is ordered by, with a fallback for stores
//! whose schema lacks the preferred column.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  collection   preferred                 fallback                       │
//! │  ──────────   ─────────────────────     ─────────────────              │
//! │  sales        sold_at DESC              created_at DESC                │
//! │  customers    last_purchase_date DESC   name ASC                       │
//! │                                                                         │
//! │  Resolved ONCE at Database::new from PRAGMA table_info.                │
//! │  Queries never discover a missing column at run time.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

use crate::error::DbResult;

/// A column and its sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderColumn {
    pub column: &'static str,
    pub descending: bool,
}

impl OrderColumn {
    pub const fn desc(column: &'static str) -> Self {
        OrderColumn {
            column,
            descending: true,
        }
    }

    pub const fn asc(column: &'static str) -> Self {
        OrderColumn {
            column,
            descending: false,
        }
    }

    /// The `ORDER BY` body, e.g. `sold_at DESC`.
    pub fn sql(&self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!("{} {}", self.column, direction)
    }
}

/// One row of the policy table.
#[derive(Debug, Clone, Copy)]
pub struct OrderingPolicy {
    pub collection: &'static str,
    pub preferred: OrderColumn,
    pub fallback: OrderColumn,
}

impl OrderingPolicy {
    /// Picks the preferred column when the table has it.
    pub fn resolve(&self, columns: &[String]) -> OrderColumn {
        if columns.iter().any(|c| c == self.preferred.column) {
            self.preferred
        } else {
            self.fallback
        }
    }
}

pub const SALES_POLICY: OrderingPolicy = OrderingPolicy {
    collection: "sales",
    preferred: OrderColumn::desc("sold_at"),
    fallback: OrderColumn::desc("created_at"),
};

pub const CUSTOMERS_POLICY: OrderingPolicy = OrderingPolicy {
    collection: "customers",
    preferred: OrderColumn::desc("last_purchase_date"),
    fallback: OrderColumn::asc("name"),
};

/// The resolved ordering for every collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orderings {
    pub sales: OrderColumn,
    pub customers: OrderColumn,
}

impl Default for Orderings {
    fn default() -> Self {
        Orderings {
            sales: SALES_POLICY.preferred,
            customers: CUSTOMERS_POLICY.preferred,
        }
    }
}

impl Orderings {
    /// Resolves every policy against the live schema.
    pub async fn resolve(pool: &SqlitePool) -> DbResult<Self> {
        let sales = resolve_one(pool, &SALES_POLICY).await?;
        let customers = resolve_one(pool, &CUSTOMERS_POLICY).await?;
        Ok(Orderings { sales, customers })
    }
}

async fn resolve_one(pool: &SqlitePool, policy: &OrderingPolicy) -> DbResult<OrderColumn> {
    // Table names come from the constant policy table, never from input.
    let rows = sqlx::query(&format!("PRAGMA table_info({})", policy.collection))
        .fetch_all(pool)
        .await?;

    let columns: Vec<String> = rows
        .iter()
        .filter_map(|row| row.try_get::<String, _>("name").ok())
        .collect();

    let resolved = policy.resolve(&columns);
    if resolved == policy.preferred {
        info!(collection = policy.collection, column = resolved.column, "Ordering resolved");
    } else {
        warn!(
            collection = policy.collection,
            preferred = policy.preferred.column,
            fallback = resolved.column,
            "Preferred ordering column missing, using fallback"
        );
    }
    Ok(resolved)
}

// =============================================================================
// Unit Tests
// =============================================================================
