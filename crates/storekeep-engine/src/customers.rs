//! # Customer Service
//!
//! Registration, contact edits and lifecycle for customers, plus the
//! read side used by the insights aggregator.
//!
//! ## Field Ownership
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────────────┐
//! │ Field                        │ Writer                                   │
//! ├──────────────────────────────┼──────────────────────────────────────────┤
//! │ name, phone, email, cpf      │ CustomerService::update_contact          │
//! │ status                       │ deactivate / reactivate                  │
//! │ segment                      │ lifecycle + statistics engine            │
//! │ purchases, spent, points ... │ statistics engine only                   │
//! │ risk_score                   │ refresh_risk_scores                      │
//! └──────────────────────────────┴──────────────────────────────────────────┘
//! ```
//!
//! Phone is the natural key: it is normalized to digits before every
//! lookup and must be unique across customers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use storekeep_core::validation::{
    normalize_phone, validate_cpf, validate_customer_name, validate_email,
};
use storekeep_core::{Customer, CustomerMetrics, CustomerStatus, Sale, ValidationError};
use storekeep_db::{generate_customer_id, Database};

use crate::activity::{Action, ActivityLog};
use crate::cache::{Cache, CacheKind};
use crate::error::{EngineError, EngineResult};
use crate::identity::Identity;
use crate::ledger::customer_sales_scope;

const ACTIVE_SCOPE: &str = "active";

/// Active customers through the `Customers` cache kind.
pub(crate) async fn active_customers(db: &Database, cache: &Cache) -> EngineResult<Vec<Customer>> {
    let customers = db.customers();
    cache
        .get_or_load(CacheKind::Customers, ACTIVE_SCOPE, || async {
            Ok::<_, EngineError>(customers.list_active().await?)
        })
        .await
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub cpf: Option<String>,
}

/// Contact edit. `None` keeps the current value; an empty string clears
/// the optional fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub cpf: Option<String>,
}

#[derive(Clone)]
pub struct CustomerService {
    db: Database,
    cache: Arc<Cache>,
    activity: ActivityLog,
    identity: Arc<dyn Identity>,
}

impl CustomerService {
    pub fn new(
        db: Database,
        cache: Arc<Cache>,
        activity: ActivityLog,
        identity: Arc<dyn Identity>,
    ) -> Self {
        CustomerService {
            db,
            cache,
            activity,
            identity,
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Registers a new active customer with zeroed metrics.
    pub async fn register_customer(&self, input: NewCustomer) -> EngineResult<Customer> {
        let name = validate_customer_name(&input.name)?;
        let phone = normalize_phone(&input.phone)?;
        let email = validate_email(input.email.as_deref())?;
        let cpf = validate_cpf(input.cpf.as_deref())?;

        self.ensure_phone_free(&phone, None).await?;

        let now = Utc::now();
        let customer = Customer {
            id: generate_customer_id(),
            name,
            phone,
            email,
            cpf,
            status: CustomerStatus::Active,
            metrics: CustomerMetrics::default(),
            created_at: now,
            updated_at: now,
        };

        self.db.customers().insert(&customer).await?;
        self.invalidate().await;

        self.activity.record_customer(
            &self.identity.current_actor(),
            &customer.id,
            Action::CustomerRegistered,
            json!({ "name": customer.name, "phone": customer.phone }),
        );

        info!(customer_id = %customer.id, "Customer registered");
        Ok(customer)
    }

    /// Edits contact fields. Metrics are never touched here.
    pub async fn update_contact(&self, id: &str, update: CustomerUpdate) -> EngineResult<Customer> {
        let mut customer = self.get_customer(id).await?;

        if let Some(name) = update.name.as_deref() {
            customer.name = validate_customer_name(name)?;
        }
        if let Some(phone) = update.phone.as_deref() {
            let phone = normalize_phone(phone)?;
            if phone != customer.phone {
                self.ensure_phone_free(&phone, Some(id)).await?;
                customer.phone = phone;
            }
        }
        if let Some(email) = update.email.as_deref() {
            customer.email = validate_email(Some(email))?;
        }
        if let Some(cpf) = update.cpf.as_deref() {
            customer.cpf = validate_cpf(Some(cpf))?;
        }
        customer.updated_at = Utc::now();

        self.db.customers().update_contact(&customer).await?;
        self.invalidate().await;

        self.activity.record_customer(
            &self.identity.current_actor(),
            &customer.id,
            Action::CustomerUpdated,
            json!({ "name": customer.name, "phone": customer.phone }),
        );

        Ok(customer)
    }

    pub async fn deactivate_customer(&self, id: &str) -> EngineResult<Customer> {
        self.set_status(id, CustomerStatus::Inactive, Action::CustomerDeactivated)
            .await
    }

    /// Reactivation puts the customer back on the segment ladder.
    pub async fn reactivate_customer(&self, id: &str) -> EngineResult<Customer> {
        self.set_status(id, CustomerStatus::Active, Action::CustomerReactivated)
            .await
    }

    async fn set_status(
        &self,
        id: &str,
        status: CustomerStatus,
        action: Action,
    ) -> EngineResult<Customer> {
        let mut customer = self.get_customer(id).await?;
        customer.status = status;
        customer.metrics.segment = customer.effective_segment();
        customer.updated_at = Utc::now();

        self.db
            .customers()
            .set_status(id, status, customer.metrics.segment, customer.updated_at)
            .await?;
        self.invalidate().await;

        self.activity.record_customer(
            &self.identity.current_actor(),
            id,
            action,
            json!({ "segment": customer.metrics.segment.as_str() }),
        );

        info!(customer_id = %id, ?status, segment = %customer.metrics.segment, "Customer status changed");
        Ok(customer)
    }

    /// Recomputes churn risk for every active customer with purchases and
    /// persists the ones that moved. Returns how many rows changed.
    pub async fn refresh_risk_scores(&self, now: DateTime<Utc>) -> EngineResult<u64> {
        let customers = self.db.customers().list_active().await?;
        let scores: Vec<(String, u8)> = customers
            .iter()
            .filter(|c| c.metrics.total_purchases > 0)
            .map(|c| (c.id.clone(), c.metrics.current_risk(now)))
            .collect();

        let changed = self.db.customers().update_risk_scores(&scores).await?;
        if changed > 0 {
            self.invalidate().await;
        }

        info!(scored = scores.len(), changed, "Risk scores refreshed");
        Ok(changed)
    }

    async fn ensure_phone_free(&self, phone: &str, except_id: Option<&str>) -> EngineResult<()> {
        match self.db.customers().find_by_phone(phone).await? {
            Some(existing) if Some(existing.id.as_str()) != except_id => {
                Err(ValidationError::Duplicate {
                    field: "phone".to_string(),
                    value: phone.to_string(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    async fn invalidate(&self) {
        self.cache
            .invalidate_many(&[CacheKind::Customers, CacheKind::Insights])
            .await;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_customer(&self, id: &str) -> EngineResult<Customer> {
        self.db
            .customers()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Customer", id))
    }

    /// Lookup by phone in any formatting the operator typed.
    pub async fn find_by_phone(&self, phone: &str) -> EngineResult<Option<Customer>> {
        let phone = normalize_phone(phone)?;
        Ok(self.db.customers().find_by_phone(&phone).await?)
    }

    pub async fn list_active_customers(&self) -> EngineResult<Vec<Customer>> {
        active_customers(&self.db, &self.cache).await
    }

    /// Every sale attached to the customer, cancelled ones included.
    pub async fn purchase_history(&self, id: &str) -> EngineResult<Vec<Sale>> {
        self.get_customer(id).await?;

        let sales = self.db.sales();
        self.cache
            .get_or_load(CacheKind::Sales, &customer_sales_scope(id), || async {
                Ok::<_, EngineError>(sales.for_customer(id).await?)
            })
            .await
    }

    /// Loyalty score 0-100 from recency, frequency and spend.
    pub fn loyalty_score(&self, customer: &Customer, now: DateTime<Utc>) -> u8 {
        customer.metrics.loyalty_score(now)
    }
}
