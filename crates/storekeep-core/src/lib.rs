//! # storekeep-core: Pure Domain Logic for Storekeep
//!
//! Everything Storekeep knows about products, sales and customers that can
//! be expressed without touching a store: types, money, validation, the
//! segmentation ladder, risk and loyalty scores, and the statistics and
//! insights math.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storekeep Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  storekeep-engine (orchestration)               │   │
//! │  │   Ledger ─► Customer Stats ─► Cache ─► Insights Aggregator      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ storekeep-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────────┐ ┌──────────────┐  │   │
//! │  │   │  types   │ │  money   │ │ segmentation │ │   customer   │  │   │
//! │  │   │ Product  │ │  Money   │ │  segment()   │ │   metrics    │  │   │
//! │  │   │  Sale    │ │  cents   │ │  risk/loyal. │ │   favorites  │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────────┘ └──────────────┘  │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────────┐                    │   │
//! │  │   │validation│ │ insights │ │   reports    │                    │   │
//! │  │   └──────────┘ └──────────┘ └──────────────┘                    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  storekeep-db (the Store)                       │   │
//! │  │        SQLite queries, migrations, atomic transactions          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog and ledger types (Product, Sale, Actor, activities)
//! - [`customer`] - Customer, metrics and the per-purchase statistics fold
//! - [`segmentation`] - Segment ladder, churn risk, loyalty score
//! - [`insights`] - Customer analytics rollups
//! - [`reports`] - Stock health and sales summaries
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: `now` is always a parameter, never read from a clock
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use storekeep_core::money::Money;
//! use storekeep_core::segmentation::{inactivity_risk, segment};
//! use storekeep_core::customer::CustomerSegment;
//!
//! let spent = Money::from_major(2200);
//! assert_eq!(segment(5, spent), CustomerSegment::Premium);
//! assert_eq!(inactivity_risk(15, 5), 0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod customer;
pub mod error;
pub mod insights;
pub mod money;
pub mod reports;
pub mod segmentation;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use customer::{Customer, CustomerMetrics, CustomerSegment, CustomerStatus, RankedEntry};
pub use error::{CoreError, CoreResult, ValidationError};
pub use insights::{CustomerInsights, InsightsParams};
pub use money::Money;
pub use reports::{SalesSummary, StockHealthReport};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of names and categories, in characters.
pub const MAX_NAME_LENGTH: usize = 200;

/// Size of a customer's favorite-categories list.
pub const TOP_FAVORITE_CATEGORIES: usize = 5;

/// Size of a customer's favorite-products list.
pub const TOP_FAVORITE_PRODUCTS: usize = 10;

/// Default size of the top-spenders list in insights.
pub const TOP_CUSTOMERS: usize = 10;
