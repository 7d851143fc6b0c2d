//! # Activity Log
//!
//! Best-effort audit trail. Each record is written on a detached task; the
//! caller gets the `JoinHandle` back but nothing on the critical path waits
//! on it. Failures are logged, never returned.

use chrono::Utc;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::warn;

use storekeep_core::{ActivityRecord, Actor, CustomerActivity};
use storekeep_db::{generate_activity_id, Database};

/// Audit actions the engine records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SaleRecorded,
    SaleCancelled,
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
    StockAdjusted,
    CustomerRegistered,
    CustomerUpdated,
    CustomerDeactivated,
    CustomerReactivated,
    PurchaseRecorded,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::SaleRecorded => "sale_recorded",
            Action::SaleCancelled => "sale_cancelled",
            Action::ProductCreated => "product_created",
            Action::ProductUpdated => "product_updated",
            Action::ProductDeleted => "product_deleted",
            Action::StockAdjusted => "stock_adjusted",
            Action::CustomerRegistered => "customer_registered",
            Action::CustomerUpdated => "customer_updated",
            Action::CustomerDeactivated => "customer_deactivated",
            Action::CustomerReactivated => "customer_reactivated",
            Action::PurchaseRecorded => "purchase_recorded",
        }
    }
}

/// The record an activity is about.
#[derive(Debug, Clone, Copy)]
pub struct Entity<'a> {
    pub kind: &'static str,
    pub id: &'a str,
}

impl<'a> Entity<'a> {
    pub fn sale(id: &'a str) -> Self {
        Entity { kind: "sale", id }
    }

    pub fn product(id: &'a str) -> Self {
        Entity { kind: "product", id }
    }
}

#[derive(Debug, Clone)]
pub struct ActivityLog {
    db: Database,
}

impl ActivityLog {
    pub fn new(db: Database) -> Self {
        ActivityLog { db }
    }

    /// Appends a system activity on a detached task.
    pub fn record(
        &self,
        actor: &Actor,
        action: Action,
        entity: Entity<'_>,
        metadata: Value,
    ) -> JoinHandle<()> {
        let record = ActivityRecord {
            id: generate_activity_id(),
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            action: action.as_str().to_string(),
            entity_type: Some(entity.kind.to_string()),
            entity_id: Some(entity.id.to_string()),
            metadata,
            created_at: Utc::now(),
        };
        let db = self.db.clone();

        tokio::spawn(async move {
            if let Err(e) = db.activities().insert_activity(&record).await {
                warn!(action = %record.action, error = %e, "Failed to record activity");
            }
        })
    }

    /// Appends a customer-scoped activity on a detached task.
    pub fn record_customer(
        &self,
        actor: &Actor,
        customer_id: &str,
        action: Action,
        metadata: Value,
    ) -> JoinHandle<()> {
        let record = CustomerActivity {
            id: generate_activity_id(),
            customer_id: customer_id.to_string(),
            actor_id: actor.id.clone(),
            action: action.as_str().to_string(),
            metadata,
            created_at: Utc::now(),
        };
        let db = self.db.clone();

        tokio::spawn(async move {
            if let Err(e) = db.activities().insert_customer_activity(&record).await {
                warn!(
                    customer_id = %record.customer_id,
                    action = %record.action,
                    error = %e,
                    "Failed to record customer activity"
                );
            }
        })
    }
}
