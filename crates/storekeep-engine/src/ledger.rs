//! # Inventory Ledger
//!
//! Turns a cart into a recorded sale, and reverses it on cancellation.
//!
//! ## Recording a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_sale(lines, seller?, customer?)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. validate_cart_lines                     ──► Validation             │
//! │  2. customer exists?                        ──► NotFound               │
//! │  3. pre-check (outside the transaction)                                │
//! │     Σ quantity per product ≤ stock?         ──► InsufficientStock      │
//! │       │                                         NotFound               │
//! │       ▼                                                                 │
//! │  4. commit_sale (one transaction, retried on Busy)                     │
//! │     re-read stock, decrement, snapshot prices, insert sale             │
//! │       │   any line short ──► rollback ──► InsufficientStock            │
//! │       ▼                                                                 │
//! │  5. after commit (never fail the sale)                                 │
//! │     invalidate(Sales, Products)                                        │
//! │     activity: sale_recorded            (detached)                      │
//! │     customer statistics update         (detached)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two sales racing for the last units both pass step 3; the store
//! serializes their transactions and the second one sees the decremented
//! stock in step 4.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use storekeep_core::validation::{validate_cart_lines, validate_reason};
use storekeep_core::{Actor, CartLine, Sale, SalesSummary, ValidationError};
use storekeep_db::{generate_sale_id, CancelOutcome, CommitOutcome, Database, NewSale};

use crate::activity::{Action, ActivityLog, Entity};
use crate::cache::{Cache, CacheKind};
use crate::error::{EngineError, EngineResult};
use crate::identity::Identity;
use crate::retry::RetryPolicy;
use crate::stats::CustomerStatistics;

/// Cache scope for one customer's sale list.
pub(crate) fn customer_sales_scope(customer_id: &str) -> String {
    format!("customer:{customer_id}")
}

/// A committed sale plus the handle of its detached statistics update.
#[derive(Debug)]
pub struct RecordedSale {
    pub sale: Sale,
    /// `Some` when a customer was attached. Awaiting it is optional.
    pub customer_update: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct InventoryLedger {
    db: Database,
    cache: Arc<Cache>,
    retry: RetryPolicy,
    activity: ActivityLog,
    identity: Arc<dyn Identity>,
    stats: CustomerStatistics,
}

impl InventoryLedger {
    pub fn new(
        db: Database,
        cache: Arc<Cache>,
        retry: RetryPolicy,
        activity: ActivityLog,
        identity: Arc<dyn Identity>,
        stats: CustomerStatistics,
    ) -> Self {
        InventoryLedger {
            db,
            cache,
            retry,
            activity,
            identity,
            stats,
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Records a sale atomically.
    ///
    /// Without an explicit `seller` the current identity sells.
    pub async fn record_sale(
        &self,
        lines: Vec<CartLine>,
        seller: Option<Actor>,
        customer_id: Option<&str>,
    ) -> EngineResult<RecordedSale> {
        validate_cart_lines(&lines)?;
        let seller = seller.unwrap_or_else(|| self.identity.current_actor());

        if let Some(id) = customer_id {
            if self.db.customers().get_by_id(id).await?.is_none() {
                return Err(EngineError::not_found("Customer", id));
            }
        }

        self.precheck_stock(&lines).await?;

        let new_sale = NewSale {
            id: generate_sale_id(),
            sold_at: Utc::now(),
            seller: seller.clone(),
            customer_id: customer_id.map(str::to_string),
            lines,
        };

        let sales = self.db.sales();
        let outcome = self
            .retry
            .run("commit_sale", || sales.commit_sale(&new_sale))
            .await?;

        let sale = match outcome {
            CommitOutcome::Committed(sale) => sale,
            CommitOutcome::ProductNotFound { product_id } => {
                return Err(EngineError::not_found("Product", product_id));
            }
            CommitOutcome::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            } => {
                info!(product_id = %product_id, available, requested, "Sale aborted in transaction");
                return Err(EngineError::InsufficientStock {
                    product_id,
                    product_name,
                    available,
                    requested,
                });
            }
        };

        self.cache
            .invalidate_many(&[CacheKind::Sales, CacheKind::Products])
            .await;

        self.activity.record(
            &seller,
            Action::SaleRecorded,
            Entity::sale(&sale.id),
            json!({
                "total": sale.total.cents(),
                "items": sale.items.len(),
                "units": sale.units(),
                "customerId": sale.customer_id,
            }),
        );

        let customer_update = sale
            .customer_id
            .as_ref()
            .map(|_| self.stats.spawn_update(sale.clone(), seller.clone()));

        info!(
            sale_id = %sale.id,
            total = %sale.total,
            items = sale.items.len(),
            seller = %seller.id,
            "Sale recorded"
        );

        Ok(RecordedSale {
            sale,
            customer_update,
        })
    }

    /// Stock check before the transaction. Lines for the same product are
    /// summed so a split cart is checked against the real demand.
    async fn precheck_stock(&self, lines: &[CartLine]) -> EngineResult<()> {
        let mut demand: Vec<(&str, i64)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for line in lines {
            match index.get(line.product_id.as_str()) {
                Some(&i) => demand[i].1 += line.quantity,
                None => {
                    index.insert(line.product_id.as_str(), demand.len());
                    demand.push((line.product_id.as_str(), line.quantity));
                }
            }
        }

        let products = self.db.products();
        for (product_id, quantity) in demand {
            let product = products
                .get_by_id(product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| EngineError::not_found("Product", product_id))?;
            product.ensure_available(quantity)?;
        }

        debug!(lines = lines.len(), "Stock pre-check passed");
        Ok(())
    }

    /// Cancels a completed sale and restores every line's stock.
    ///
    /// Customer statistics accrued by the sale are left as they are.
    pub async fn cancel_sale(&self, sale_id: &str, reason: &str) -> EngineResult<Sale> {
        let reason = validate_reason(reason)?;
        let actor = self.identity.current_actor();
        let at = Utc::now();

        let sales = self.db.sales();
        let outcome = self
            .retry
            .run("cancel_sale", || sales.cancel_sale(sale_id, &actor, &reason, at))
            .await?;

        let sale = match outcome {
            CancelOutcome::Cancelled(sale) => sale,
            CancelOutcome::NotFound => return Err(EngineError::not_found("Sale", sale_id)),
            CancelOutcome::AlreadyCancelled => {
                return Err(EngineError::AlreadyCancelled {
                    sale_id: sale_id.to_string(),
                })
            }
        };

        self.cache
            .invalidate_many(&[CacheKind::Sales, CacheKind::Products])
            .await;

        self.activity.record(
            &actor,
            Action::SaleCancelled,
            Entity::sale(&sale.id),
            json!({
                "reason": reason,
                "total": sale.total.cents(),
                "units": sale.units(),
            }),
        );

        info!(sale_id = %sale.id, actor = %actor.id, "Sale cancelled");
        Ok(sale)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_sale(&self, sale_id: &str) -> EngineResult<Sale> {
        self.db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Sale", sale_id))
    }

    /// Latest sales in policy order.
    pub async fn recent_sales(&self, limit: i64) -> EngineResult<Vec<Sale>> {
        let sales = self.db.sales();
        self.cache
            .get_or_load(CacheKind::Sales, &format!("recent:{limit}"), || async {
                Ok::<_, EngineError>(sales.recent(limit).await?)
            })
            .await
    }

    pub async fn sales_for_customer(&self, customer_id: &str) -> EngineResult<Vec<Sale>> {
        let sales = self.db.sales();
        self.cache
            .get_or_load(CacheKind::Sales, &customer_sales_scope(customer_id), || async {
                Ok::<_, EngineError>(sales.for_customer(customer_id).await?)
            })
            .await
    }

    /// Sales whose date falls in `[from, to]`.
    pub async fn sales_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<Sale>> {
        if from > to {
            return Err(ValidationError::invalid_format("range", "from must not be after to").into());
        }

        let sales = self.db.sales();
        let scope = format!("between:{}:{}", from.to_rfc3339(), to.to_rfc3339());
        self.cache
            .get_or_load(CacheKind::Sales, &scope, || async {
                Ok::<_, EngineError>(sales.between(from, to).await?)
            })
            .await
    }

    pub async fn sales_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<SalesSummary> {
        let sales = self.sales_between(from, to).await?;
        Ok(SalesSummary::from_sales(&sales))
    }
}
