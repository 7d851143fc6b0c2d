//! # Customer Repository
//!
//! Database operations for the `customers` collection.
//!
//! ## Read Boundary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  customers row                      Customer                            │
//! │  ─────────────────────────          ─────────────────────────────       │
//! │  total_purchases     NULL    ──►    0                                   │
//! │  total_spent_cents   NULL    ──►    Money::zero()                       │
//! │  segment             NULL    ──►    CustomerSegment::New                │
//! │  favorite_products   NULL    ──►    vec![]                              │
//! │  favorite_products   '[...]' ──►    Vec<RankedEntry> (serde_json)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Past this function nothing special-cases a missing field.
//!
//! ## Write Paths
//! - Contact fields: [`CustomerRepository::update_contact`]
//! - Lifecycle: [`CustomerRepository::set_status`]
//! - Metrics: [`CustomerRepository::apply_metrics`] (statistics engine only)
//! - Risk: [`CustomerRepository::update_risk_scores`]

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::ordering::OrderColumn;
use storekeep_core::{
    Customer, CustomerMetrics, CustomerSegment, CustomerStatus, Money, RankedEntry,
};

const CUSTOMER_COLUMNS: &str = "id, name, phone, email, cpf, status, \
     total_purchases, total_spent_cents, average_ticket_cents, loyalty_points, \
     risk_score, segment, favorite_categories, favorite_products, \
     first_purchase_date, last_purchase_date, created_at, updated_at";

fn decode_ranked(raw: Option<String>) -> DbResult<Vec<RankedEntry>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(json) => Ok(serde_json::from_str(json)?),
    }
}

fn zero_if_null(row: &SqliteRow, column: &str) -> DbResult<i64> {
    Ok(row.try_get::<Option<i64>, _>(column)?.unwrap_or(0))
}

fn customer_from_row(row: &SqliteRow) -> DbResult<Customer> {
    let metrics = CustomerMetrics {
        total_purchases: zero_if_null(row, "total_purchases")?,
        total_spent: Money::from_cents(zero_if_null(row, "total_spent_cents")?),
        average_ticket: Money::from_cents(zero_if_null(row, "average_ticket_cents")?),
        loyalty_points: zero_if_null(row, "loyalty_points")?,
        risk_score: zero_if_null(row, "risk_score")?.clamp(0, 100) as u8,
        segment: row
            .try_get::<Option<CustomerSegment>, _>("segment")?
            .unwrap_or_default(),
        favorite_categories: decode_ranked(row.try_get("favorite_categories")?)?,
        favorite_products: decode_ranked(row.try_get("favorite_products")?)?,
        first_purchase_date: row.try_get("first_purchase_date")?,
        last_purchase_date: row.try_get("last_purchase_date")?,
    };

    Ok(Customer {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        cpf: row.try_get("cpf")?,
        status: row.try_get("status")?,
        metrics,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Rewrites a raw unique violation on `phone` with the offending value.
fn phone_conflict(err: DbError, phone: &str) -> DbError {
    match err {
        DbError::UniqueViolation { .. } => DbError::duplicate("phone", phone),
        other => other,
    }
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
    order: OrderColumn,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository ordered by the resolved policy column.
    pub fn new(pool: SqlitePool, order: OrderColumn) -> Self {
        CustomerRepository { pool, order }
    }

    /// Inserts a newly registered customer.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - phone already registered
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        let m = &customer.metrics;
        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, email, cpf, status,
                total_purchases, total_spent_cents, average_ticket_cents,
                loyalty_points, risk_score, segment,
                favorite_categories, favorite_products,
                first_purchase_date, last_purchase_date,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14,
                ?15, ?16,
                ?17, ?18
            )
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.email.as_deref())
        .bind(customer.cpf.as_deref())
        .bind(customer.status)
        .bind(m.total_purchases)
        .bind(m.total_spent.cents())
        .bind(m.average_ticket.cents())
        .bind(m.loyalty_points)
        .bind(i64::from(m.risk_score))
        .bind(m.segment)
        .bind(serde_json::to_string(&m.favorite_categories)?)
        .bind(serde_json::to_string(&m.favorite_products)?)
        .bind(m.first_purchase_date)
        .bind(m.last_purchase_date)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| phone_conflict(e.into(), &customer.phone))?;

        Ok(())
    }

    /// Gets a customer by ID (any status).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(customer_from_row).transpose()
    }

    /// Gets a customer by normalized (digits-only) phone.
    pub async fn find_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone = ?1");
        let row = sqlx::query(&sql)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(customer_from_row).transpose()
    }

    /// Lists active customers in policy order.
    pub async fn list_active(&self) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE status = ?1 ORDER BY {}, id",
            self.order.sql()
        );
        let rows = sqlx::query(&sql)
            .bind(CustomerStatus::Active)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(customer_from_row).collect()
    }

    /// Rewrites contact fields only.
    pub async fn update_contact(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Updating customer contact");

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = ?2,
                phone = ?3,
                email = ?4,
                cpf = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.email.as_deref())
        .bind(customer.cpf.as_deref())
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| phone_conflict(e.into(), &customer.phone))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", &customer.id));
        }

        Ok(())
    }

    /// Flips lifecycle status and stores the matching segment.
    pub async fn set_status(
        &self,
        id: &str,
        status: CustomerStatus,
        segment: CustomerSegment,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, ?status, "Setting customer status");

        let result = sqlx::query(
            "UPDATE customers SET status = ?2, segment = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(status)
        .bind(segment)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Read-modify-write of a customer's metrics under the write lock.
    ///
    /// The first statement is a no-op write so the transaction holds the
    /// lock before it reads; concurrent folds for the same customer queue
    /// instead of overwriting each other.
    ///
    /// ## Returns
    /// * `Ok(Some(updated))` - metrics persisted
    /// * `Ok(None)` - no such customer
    pub async fn apply_metrics<F>(&self, id: &str, fold: F) -> DbResult<Option<Customer>>
    where
        F: FnOnce(&Customer) -> Customer,
    {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query("UPDATE customers SET updated_at = updated_at WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if locked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        let row = sqlx::query(&sql).bind(id).fetch_one(&mut *tx).await?;
        let current = customer_from_row(&row)?;
        let updated = fold(&current);
        let m = &updated.metrics;

        sqlx::query(
            r#"
            UPDATE customers SET
                total_purchases = ?2,
                total_spent_cents = ?3,
                average_ticket_cents = ?4,
                loyalty_points = ?5,
                risk_score = ?6,
                segment = ?7,
                favorite_categories = ?8,
                favorite_products = ?9,
                first_purchase_date = ?10,
                last_purchase_date = ?11,
                updated_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(m.total_purchases)
        .bind(m.total_spent.cents())
        .bind(m.average_ticket.cents())
        .bind(m.loyalty_points)
        .bind(i64::from(m.risk_score))
        .bind(m.segment)
        .bind(serde_json::to_string(&m.favorite_categories)?)
        .bind(serde_json::to_string(&m.favorite_products)?)
        .bind(m.first_purchase_date)
        .bind(m.last_purchase_date)
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(id = %id, purchases = m.total_purchases, segment = %m.segment, "Customer metrics updated");
        Ok(Some(updated))
    }

    /// Stores recomputed risk scores in one transaction.
    ///
    /// Returns how many rows changed.
    pub async fn update_risk_scores(&self, scores: &[(String, u8)]) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut changed = 0;

        for (id, risk) in scores {
            let result = sqlx::query(
                "UPDATE customers SET risk_score = ?2 WHERE id = ?1 AND COALESCE(risk_score, 0) != ?2",
            )
            .bind(id)
            .bind(i64::from(*risk))
            .execute(&mut *tx)
            .await?;
            changed += result.rows_affected();
        }

        tx.commit().await?;
        debug!(changed = changed, "Risk scores refreshed");
        Ok(changed)
    }

    /// Counts active customers (for diagnostics).
    pub async fn count_active(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE status = ?1")
            .bind(CustomerStatus::Active)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new customer ID.
pub fn generate_customer_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
