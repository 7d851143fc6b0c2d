//! # Repository Module
//!
//! One repository per collection. Each wraps a cloned `SqlitePool` and
//! maps rows by hand at the read boundary.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Engine service                                                        │
//! │       │  db.sales().commit_sale(&new_sale)                             │
//! │       ▼                                                                 │
//! │  SaleRepository ── one transaction ──► sales, sale_items, products     │
//! │  ProductRepository ──────────────────► products                        │
//! │  CustomerRepository ─────────────────► customers                       │
//! │  ActivityRepository ─────────────────► activities,                     │
//! │                                        customer_activities             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD and stock adjustments
//! - [`sale::SaleRepository`] - Ledger transactions and sale queries
//! - [`customer::CustomerRepository`] - Customer records and metrics
//! - [`activity::ActivityRepository`] - Audit trail

pub mod activity;
pub mod customer;
pub mod product;
pub mod sale;
