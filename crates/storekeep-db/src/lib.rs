//! # storekeep-db: The Store
//!
//! Persistent collections for Storekeep, backed by SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storekeep Data Flow                              │
//! │                                                                         │
//! │  Engine::record_sale(actor, lines, customer)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  storekeep-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo      │    │ 001_init.sql │  │   │
//! │  │   │ Orderings     │    │ CustomerRepo  │    │              │  │   │
//! │  │   │               │    │ ActivityRepo  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`ordering`] - Ordering policy table (preferred/fallback sort columns)
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storekeep_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/storekeep.db")).await?;
//! let products = db.products().list_active().await?;
//! let recent = db.sales().recent(20).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod ordering;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use ordering::{OrderColumn, Orderings};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::activity::{generate_activity_id, ActivityRepository};
pub use repository::customer::{generate_customer_id, CustomerRepository};
pub use repository::product::{generate_product_id, ProductRepository};
pub use repository::sale::{generate_sale_id, CancelOutcome, CommitOutcome, NewSale, SaleRepository};
