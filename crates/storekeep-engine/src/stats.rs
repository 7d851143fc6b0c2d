//! # Customer Statistics Engine
//!
//! Folds a completed sale into the buying customer's metrics. This is the
//! only writer of customer totals.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sale committed (customer attached)                                    │
//! │       │  spawn_update(sale)   ◄── detached, the sale is already final  │
//! │       ▼                                                                 │
//! │  customers.apply_metrics(id, |c| c.with_purchase(&sale, now))          │
//! │       │   purchases+1, spent+total, avg, points, favorites, segment    │
//! │       ▼                                                                 │
//! │  invalidate(Customers, Insights)                                       │
//! │  activity: purchase_recorded                                           │
//! │                                                                         │
//! │  Any failure ──► error! log. Never reaches the seller.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancelling a sale does not come back through here: accrued totals,
//! points and favorites stay as they were.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use storekeep_core::{Actor, Customer, Sale};
use storekeep_db::Database;

use crate::activity::{Action, ActivityLog};
use crate::cache::{Cache, CacheKind};
use crate::error::EngineResult;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct CustomerStatistics {
    db: Database,
    cache: Arc<Cache>,
    retry: RetryPolicy,
    activity: ActivityLog,
}

impl CustomerStatistics {
    pub fn new(db: Database, cache: Arc<Cache>, retry: RetryPolicy, activity: ActivityLog) -> Self {
        CustomerStatistics {
            db,
            cache,
            retry,
            activity,
        }
    }

    /// Applies `sale` to its customer and returns the updated record.
    ///
    /// `Ok(None)` when the sale has no customer, is not completed, or the
    /// customer no longer exists.
    pub async fn apply_sale(&self, sale: &Sale, actor: &Actor) -> EngineResult<Option<Customer>> {
        let Some(customer_id) = sale.customer_id.as_deref() else {
            return Ok(None);
        };
        if sale.is_cancelled() {
            debug!(sale_id = %sale.id, "Cancelled sale, statistics untouched");
            return Ok(None);
        }

        let now = Utc::now();
        let customers = self.db.customers();
        let updated = self
            .retry
            .run("apply_customer_metrics", || {
                customers.apply_metrics(customer_id, |current| current.with_purchase(sale, now))
            })
            .await?;

        let Some(customer) = updated else {
            warn!(customer_id = %customer_id, sale_id = %sale.id, "Customer vanished before statistics update");
            return Ok(None);
        };

        self.cache
            .invalidate_many(&[CacheKind::Customers, CacheKind::Insights])
            .await;

        self.activity.record_customer(
            actor,
            &customer.id,
            Action::PurchaseRecorded,
            json!({
                "saleId": sale.id,
                "total": sale.total.cents(),
                "totalPurchases": customer.metrics.total_purchases,
                "segment": customer.metrics.segment.as_str(),
            }),
        );

        info!(
            customer_id = %customer.id,
            purchases = customer.metrics.total_purchases,
            spent = %customer.metrics.total_spent,
            segment = %customer.metrics.segment,
            "Customer statistics updated"
        );

        Ok(Some(customer))
    }

    /// Runs [`apply_sale`](Self::apply_sale) on a detached task.
    pub fn spawn_update(&self, sale: Sale, actor: Actor) -> JoinHandle<()> {
        let stats = self.clone();
        tokio::spawn(async move {
            if let Err(e) = stats.apply_sale(&sale, &actor).await {
                error!(sale_id = %sale.id, error = %e, "Customer statistics update failed");
            }
        })
    }
}
