//! # storekeep-engine: Sale Processing & Customer Analytics
//!
//! Everything between a checkout screen and the store: the cache, the
//! inventory ledger, customer statistics, insights, and the catalog and
//! customer services.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                Engine                                   │
//! │                                                                         │
//! │  ┌──────────────┐  spawn   ┌──────────────┐      ┌──────────────────┐  │
//! │  │ Inventory    │─────────►│ Customer     │      │ Insights         │  │
//! │  │ Ledger       │          │ Statistics   │      │ Aggregator       │  │
//! │  └──────┬───────┘          └──────┬───────┘      └────────┬─────────┘  │
//! │         │                         │                       │            │
//! │  ┌──────┴───────┐          ┌──────┴───────┐               │            │
//! │  │ Catalog      │          │ Customer     │               │            │
//! │  │ Service      │          │ Service      │               │            │
//! │  └──────┬───────┘          └──────┬───────┘               │            │
//! │         └────────────┬────────────┴───────────────────────┘            │
//! │                      ▼                                                  │
//! │   Cache (per-kind TTL) · RetryPolicy · ActivityLog · Identity          │
//! │                      │                                                  │
//! └──────────────────────┼──────────────────────────────────────────────────┘
//!                        ▼
//!              storekeep-db (SQLite store)
//! ```
//!
//! ## Module Organization
//!
//! - [`cache`] - TTL cache keyed by entity kind
//! - [`ledger`] - Atomic sale recording and cancellation, sale queries
//! - [`stats`] - Folds completed sales into customer metrics
//! - [`insights`] - Cached dashboard summary
//! - [`catalog`] - Product CRUD and stock health
//! - [`customers`] - Customer registration, contact, lifecycle, risk refresh
//! - [`activity`] - Best-effort audit log
//! - [`connectivity`] - Cache reset when the link comes back
//! - [`config`] - TOML + environment configuration
//! - [`retry`] - Backoff around transient store failures
//! - [`identity`] - Current actor provider
//! - [`error`] - Engine error kinds
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use storekeep_core::CartLine;
//! use storekeep_engine::{Engine, EngineConfig, StaticIdentity};
//!
//! storekeep_engine::init_tracing();
//!
//! let config = EngineConfig::load(None)?;
//! let identity = Arc::new(StaticIdentity::new(config.operator()));
//! let engine = Engine::connect(config.db_config()?, &config, identity).await?;
//!
//! let recorded = engine
//!     .ledger()
//!     .record_sale(vec![CartLine::new(product_id, 2)], None, Some(&customer_id))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod activity;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod connectivity;
pub mod customers;
pub mod error;
pub mod identity;
pub mod insights;
pub mod ledger;
pub mod retry;
pub mod stats;

// =============================================================================
// Re-exports
// =============================================================================

pub use activity::{Action, ActivityLog};
pub use cache::{Cache, CacheKind, CacheTtl};
pub use catalog::{CatalogService, NewProduct, ProductUpdate};
pub use config::{ConfigError, EngineConfig};
pub use connectivity::{Connectivity, ConnectivitySignal, LinkState};
pub use customers::{CustomerService, CustomerUpdate, NewCustomer};
pub use error::{EngineError, EngineResult};
pub use identity::{Identity, StaticIdentity};
pub use insights::InsightsAggregator;
pub use ledger::{InventoryLedger, RecordedSale};
pub use retry::RetryPolicy;
pub use stats::CustomerStatistics;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

use storekeep_db::{Database, DbConfig};

/// Installs the global fmt subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - debug everywhere
/// - `RUST_LOG=storekeep_engine=trace` - one crate only
/// - Default: `info,storekeep=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,storekeep=debug,sqlx=warn"));

    // a host that already installed a subscriber keeps it
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

// =============================================================================
// Engine
// =============================================================================

/// The wired-up services sharing one store, cache and identity.
#[derive(Clone)]
pub struct Engine {
    db: Database,
    cache: Arc<Cache>,
    ledger: InventoryLedger,
    catalog: CatalogService,
    customers: CustomerService,
    stats: CustomerStatistics,
    insights: InsightsAggregator,
}

impl Engine {
    /// Opens the store (running migrations) and wires the services.
    pub async fn connect(
        db_config: DbConfig,
        config: &EngineConfig,
        identity: Arc<dyn Identity>,
    ) -> EngineResult<Self> {
        let db = Database::new(db_config).await?;
        Ok(Self::with_database(db, config, identity))
    }

    /// Wires the services over an already open store.
    pub fn with_database(db: Database, config: &EngineConfig, identity: Arc<dyn Identity>) -> Self {
        let cache = Arc::new(Cache::new(config.cache_ttl()));
        let retry = config.retry_policy();
        let activity = ActivityLog::new(db.clone());

        let stats = CustomerStatistics::new(db.clone(), cache.clone(), retry, activity.clone());
        let ledger = InventoryLedger::new(
            db.clone(),
            cache.clone(),
            retry,
            activity.clone(),
            identity.clone(),
            stats.clone(),
        );
        let catalog = CatalogService::new(db.clone(), cache.clone(), activity.clone(), identity.clone());
        let customers = CustomerService::new(db.clone(), cache.clone(), activity, identity);
        let insights = InsightsAggregator::new(db.clone(), cache.clone(), config.insights_params());

        info!(store = %config.store.name, "Engine ready");

        Engine {
            db,
            cache,
            ledger,
            catalog,
            customers,
            stats,
            insights,
        }
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn customers(&self) -> &CustomerService {
        &self.customers
    }

    pub fn stats(&self) -> &CustomerStatistics {
        &self.stats
    }

    pub fn insights(&self) -> &InsightsAggregator {
        &self.insights
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Clears the cache whenever the link comes back, including a flap that
    /// the channel collapsed into a single update.
    pub fn watch_connectivity(&self, state_rx: watch::Receiver<LinkState>) -> JoinHandle<()> {
        connectivity::watch_connectivity(self.cache.clone(), state_rx)
    }
}
