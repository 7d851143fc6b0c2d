//! # Engine Error Types
//!
//! The error surface every engine operation returns.
//!
//! ## Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Source                                 EngineError                     │
//! │  ─────────────────────────────────      ───────────────────────────     │
//! │  ValidationError                  ──►   Validation                      │
//! │  CoreError::InsufficientStock     ──►   InsufficientStock               │
//! │  CancelOutcome::AlreadyCancelled  ──►   AlreadyCancelled                │
//! │  DbError::NotFound                ──►   NotFound                        │
//! │  DbError::UniqueViolation         ──►   Validation (Duplicate)          │
//! │  DbError::ForeignKeyViolation     ──►   ConstraintViolation             │
//! │  any other DbError                ──►   StoreUnavailable                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business failures are never retried. Only transient `DbError`s reach the
//! retry loop, and exhausting it also ends in `StoreUnavailable`.

use thiserror::Error;
use tracing::error;

use storekeep_core::{CoreError, ValidationError};
use storekeep_db::DbError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input (missing name, bad phone, empty cart, ...).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced product, customer or sale does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Requested quantity exceeds stock on hand.
    #[error("Insufficient stock for {product_name} ({product_id}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// Double cancellation attempt.
    #[error("Sale {sale_id} is already cancelled")]
    AlreadyCancelled { sale_id: String },

    /// The store could not be reached or failed.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The write would break a referential rule (e.g. deleting a sold product).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl EngineError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            } => EngineError::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            },
            CoreError::Validation(e) => EngineError::Validation(e),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => {
                EngineError::Validation(ValidationError::Duplicate { field, value })
            }
            DbError::ForeignKeyViolation { message } => EngineError::ConstraintViolation(message),
            other => {
                error!(error = %other, "Store operation failed");
                EngineError::StoreUnavailable(other.to_string())
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
