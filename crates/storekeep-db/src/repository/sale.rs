//! # Sale Repository
//!
//! The ledger's storage half: atomic sale commit and cancellation, plus
//! sale reads.
//!
//! ## Commit Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    INSERT sales (total 0)          ← first statement writes, so this   │
//! │                                      transaction owns the write lock   │
//! │                                      and concurrent ledger work queues │
//! │    for each line, in order:                                            │
//! │      SELECT stock FROM products    ← re-read inside the transaction    │
//! │      new = stock - qty                                                 │
//! │      new < 0 ?  ──► ROLLBACK, InsufficientStock (nothing persisted)   │
//! │      UPDATE products SET stock = new                                   │
//! │      INSERT sale_items (snapshot of name, category, price)             │
//! │    UPDATE sales SET total = Σ qty × unit_price                         │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two lines for the same product see each other's decrement
//! (read-your-writes), so a cart can't oversell by splitting a quantity.
//!
//! ## Cancel Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE sales SET status = 'cancelled' ... WHERE status = 'completed'│
//! │      0 rows? ──► ROLLBACK, NotFound or AlreadyCancelled                │
//! │    for each line item:                                                 │
//! │      UPDATE products SET stock = stock + original qty                  │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The conditional status flip makes double cancellation impossible even
//! when two cancels race: only one of them sees a row change.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::ordering::OrderColumn;
use storekeep_core::{Actor, CartLine, Cancellation, Money, Sale, SaleLineItem, SaleStatus};

// =============================================================================
// Inputs & Outcomes
// =============================================================================

/// A sale ready to be committed.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub id: String,
    pub sold_at: DateTime<Utc>,
    pub seller: Actor,
    pub customer_id: Option<String>,
    pub lines: Vec<CartLine>,
}

/// Result of [`SaleRepository::commit_sale`].
///
/// Everything except `Committed` means the transaction rolled back.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed(Sale),
    ProductNotFound {
        product_id: String,
    },
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },
}

/// Result of [`SaleRepository::cancel_sale`].
#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Cancelled(Sale),
    NotFound,
    AlreadyCancelled,
}

// =============================================================================
// Row Mapping
// =============================================================================

const SALE_COLUMNS: &str = "id, sold_at, seller_id, seller_name, total_cents, status, \
     customer_id, cancelled_at, cancelled_by, cancel_reason";

const ITEM_COLUMNS: &str =
    "sale_id, product_id, name_snapshot, category_snapshot, quantity, unit_price_cents";

fn sale_from_row(row: &SqliteRow) -> DbResult<Sale> {
    let cancelled_at: Option<DateTime<Utc>> = row.try_get("cancelled_at")?;
    let cancellation = match cancelled_at {
        Some(cancelled_at) => Some(Cancellation {
            cancelled_at,
            cancelled_by: row
                .try_get::<Option<String>, _>("cancelled_by")?
                .unwrap_or_default(),
            reason: row
                .try_get::<Option<String>, _>("cancel_reason")?
                .unwrap_or_default(),
        }),
        None => None,
    };

    Ok(Sale {
        id: row.try_get("id")?,
        sold_at: row.try_get("sold_at")?,
        seller_id: row.try_get("seller_id")?,
        seller_name: row.try_get("seller_name")?,
        items: Vec::new(),
        total: Money::from_cents(row.try_get("total_cents")?),
        status: row.try_get("status")?,
        customer_id: row.try_get("customer_id")?,
        cancellation,
    })
}

fn item_from_row(row: &SqliteRow) -> DbResult<(String, SaleLineItem)> {
    let sale_id: String = row.try_get("sale_id")?;
    let item = SaleLineItem {
        product_id: row.try_get("product_id")?,
        name: row.try_get("name_snapshot")?,
        quantity: row.try_get("quantity")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        category: row.try_get("category_snapshot")?,
    };
    Ok((sale_id, item))
}

/// Which sales a read selects.
#[derive(Debug, Clone)]
enum SaleFilter {
    Id(String),
    Customer(String),
    Between(DateTime<Utc>, DateTime<Utc>),
    Recent(i64),
}

impl SaleFilter {
    /// `WHERE ... ORDER BY ... LIMIT ...` tail shared by the sale query and
    /// the item subquery.
    fn clause(&self, order: OrderColumn) -> String {
        match self {
            SaleFilter::Id(_) => "WHERE id = ?1".to_string(),
            SaleFilter::Customer(_) => {
                format!("WHERE customer_id = ?1 ORDER BY {}, id", order.sql())
            }
            SaleFilter::Between(..) => format!(
                "WHERE {col} >= ?1 AND {col} <= ?2 ORDER BY {}, id",
                order.sql(),
                col = order.column
            ),
            SaleFilter::Recent(_) => format!("ORDER BY {}, id LIMIT ?1", order.sql()),
        }
    }

    fn bind<'q>(
        &self,
        query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            SaleFilter::Id(id) | SaleFilter::Customer(id) => query.bind(id.clone()),
            SaleFilter::Between(from, to) => query.bind(*from).bind(*to),
            SaleFilter::Recent(limit) => query.bind(*limit),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    order: OrderColumn,
}

impl SaleRepository {
    /// Creates a new SaleRepository ordered by the resolved policy column.
    pub fn new(pool: SqlitePool, order: OrderColumn) -> Self {
        SaleRepository { pool, order }
    }

    /// Atomically records a sale and decrements stock.
    ///
    /// ## Returns
    /// * `Ok(CommitOutcome::Committed(sale))` - sale row, items and every
    ///   stock decrement are persisted
    /// * `Ok(other outcome)` - business rejection, nothing persisted
    /// * `Err(DbError)` - infrastructure failure, nothing persisted
    pub async fn commit_sale(&self, new_sale: &NewSale) -> DbResult<CommitOutcome> {
        debug!(sale_id = %new_sale.id, lines = new_sale.lines.len(), "Committing sale");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, sold_at, seller_id, seller_name, total_cents,
                status, customer_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7)
            "#,
        )
        .bind(&new_sale.id)
        .bind(new_sale.sold_at)
        .bind(&new_sale.seller.id)
        .bind(&new_sale.seller.name)
        .bind(SaleStatus::Completed)
        .bind(new_sale.customer_id.as_deref())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(new_sale.lines.len());

        for (position, line) in new_sale.lines.iter().enumerate() {
            let row = sqlx::query(
                r#"
                SELECT name, category, price_cents, current_stock, is_active
                FROM products
                WHERE id = ?1
                "#,
            )
            .bind(&line.product_id)
            .fetch_optional(&mut *tx)
            .await?;

            let active = match &row {
                Some(row) => row.try_get::<bool, _>("is_active")?,
                None => false,
            };
            let row = match row {
                Some(row) if active => row,
                _ => {
                    tx.rollback().await?;
                    debug!(product_id = %line.product_id, "Product missing, sale rolled back");
                    return Ok(CommitOutcome::ProductNotFound {
                        product_id: line.product_id.clone(),
                    });
                }
            };

            let name: String = row.try_get("name")?;
            let current_stock: i64 = row.try_get("current_stock")?;
            let new_stock = current_stock - line.quantity;

            if new_stock < 0 {
                tx.rollback().await?;
                debug!(
                    product_id = %line.product_id,
                    available = current_stock,
                    requested = line.quantity,
                    "Insufficient stock, sale rolled back"
                );
                return Ok(CommitOutcome::InsufficientStock {
                    product_id: line.product_id.clone(),
                    product_name: name,
                    available: current_stock,
                    requested: line.quantity,
                });
            }

            sqlx::query("UPDATE products SET current_stock = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(&line.product_id)
                .bind(new_stock)
                .bind(now)
                .execute(&mut *tx)
                .await?;

            let item = SaleLineItem {
                product_id: line.product_id.clone(),
                name,
                quantity: line.quantity,
                unit_price: Money::from_cents(row.try_get("price_cents")?),
                category: row.try_get("category")?,
            };

            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    sale_id, position, product_id, name_snapshot,
                    category_snapshot, quantity, unit_price_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&new_sale.id)
            .bind(position as i64)
            .bind(&item.product_id)
            .bind(&item.name)
            .bind(&item.category)
            .bind(item.quantity)
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await?;

            items.push(item);
        }

        let sale = Sale::completed(
            new_sale.id.clone(),
            &new_sale.seller,
            items,
            new_sale.customer_id.clone(),
            new_sale.sold_at,
        );

        sqlx::query("UPDATE sales SET total_cents = ?2 WHERE id = ?1")
            .bind(&sale.id)
            .bind(sale.total.cents())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(sale_id = %sale.id, total = %sale.total, "Sale committed");
        Ok(CommitOutcome::Committed(sale))
    }

    /// Atomically cancels a completed sale and restores its stock.
    ///
    /// Every line's original quantity goes back to its product, whatever
    /// happened to that product's stock since the sale.
    pub async fn cancel_sale(
        &self,
        sale_id: &str,
        actor: &Actor,
        reason: &str,
        at: DateTime<Utc>,
    ) -> DbResult<CancelOutcome> {
        debug!(sale_id = %sale_id, "Cancelling sale");

        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            r#"
            UPDATE sales SET
                status = ?2,
                cancelled_at = ?3,
                cancelled_by = ?4,
                cancel_reason = ?5
            WHERE id = ?1 AND status = ?6
            "#,
        )
        .bind(sale_id)
        .bind(SaleStatus::Cancelled)
        .bind(at)
        .bind(&actor.id)
        .bind(reason)
        .bind(SaleStatus::Completed)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            let status: Option<SaleStatus> =
                sqlx::query_scalar("SELECT status FROM sales WHERE id = ?1")
                    .bind(sale_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return Ok(match status {
                None => CancelOutcome::NotFound,
                Some(_) => CancelOutcome::AlreadyCancelled,
            });
        }

        let lines: Vec<(String, i64)> = sqlx::query_as(
            "SELECT product_id, quantity FROM sale_items WHERE sale_id = ?1 ORDER BY position",
        )
        .bind(sale_id)
        .fetch_all(&mut *tx)
        .await?;

        for (product_id, quantity) in &lines {
            let restored = sqlx::query(
                r#"
                UPDATE products
                SET current_stock = current_stock + ?2, updated_at = ?3
                WHERE id = ?1
                "#,
            )
            .bind(product_id)
            .bind(quantity)
            .bind(at)
            .execute(&mut *tx)
            .await?;

            if restored.rows_affected() == 0 {
                // Dropping the transaction rolls everything back.
                return Err(DbError::not_found("Product", product_id));
            }
        }

        tx.commit().await?;

        match self.get_by_id(sale_id).await? {
            Some(sale) => {
                debug!(sale_id = %sale_id, lines = lines.len(), "Sale cancelled, stock restored");
                Ok(CancelOutcome::Cancelled(sale))
            }
            None => Err(DbError::Internal(format!(
                "sale {sale_id} vanished after cancellation"
            ))),
        }
    }

    /// Gets a sale with its line items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut sales = self.fetch(SaleFilter::Id(id.to_string())).await?;
        Ok(sales.pop())
    }

    /// The `limit` most recent sales.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<Sale>> {
        self.fetch(SaleFilter::Recent(limit)).await
    }

    /// Every sale attached to a customer, most recent first.
    pub async fn for_customer(&self, customer_id: &str) -> DbResult<Vec<Sale>> {
        self.fetch(SaleFilter::Customer(customer_id.to_string())).await
    }

    /// Sales dated in `[from, to]`, both ends inclusive, most recent first.
    pub async fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<Sale>> {
        self.fetch(SaleFilter::Between(from, to)).await
    }

    /// Runs the header query and the item query for the same filter and
    /// stitches items onto their sales, preserving header order.
    async fn fetch(&self, filter: SaleFilter) -> DbResult<Vec<Sale>> {
        let clause = filter.clause(self.order);

        let sale_sql = format!("SELECT {SALE_COLUMNS} FROM sales {clause}");
        let rows = filter
            .bind(sqlx::query(&sale_sql))
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut sales: Vec<Sale> = rows.iter().map(sale_from_row).collect::<DbResult<_>>()?;

        let item_sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items \
             WHERE sale_id IN (SELECT id FROM sales {clause}) \
             ORDER BY sale_id, position"
        );
        let item_rows = filter
            .bind(sqlx::query(&item_sql))
            .fetch_all(&self.pool)
            .await?;

        let mut items: HashMap<String, Vec<SaleLineItem>> = HashMap::new();
        for row in &item_rows {
            let (sale_id, item) = item_from_row(row)?;
            items.entry(sale_id).or_default().push(item);
        }

        for sale in &mut sales {
            sale.items = items.remove(&sale.id).unwrap_or_default();
        }

        Ok(sales)
    }
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
