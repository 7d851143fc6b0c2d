//! # Validation Module
//!
//! Input validation for catalog, sale and customer operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Engine services (storekeep-engine)                           │
//! │  ├── THIS MODULE: shape and business-rule checks                       │
//! │  └── Runs before any store access                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Ledger pre-check                                             │
//! │  └── Stock availability against the current product snapshot          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (current_stock >= 0), CHECK (quantity > 0)                  │
//! │  ├── UNIQUE (phone)                                                    │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storekeep_core::validation::{normalize_phone, validate_quantity};
//!
//! assert_eq!(normalize_phone("(11) 99999-0000").unwrap(), "11999990000");
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::types::CartLine;
use crate::MAX_NAME_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_label(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(value.to_string())
}

/// Validates a product name. Returns the trimmed name.
///
/// ## Example
/// ```rust
/// use storekeep_core::validation::validate_product_name;
///
/// assert_eq!(validate_product_name("  Caneca Azul ").unwrap(), "Caneca Azul");
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    validate_label("name", name)
}

/// Validates a category label. Returns the trimmed category.
pub fn validate_category(category: &str) -> ValidationResult<String> {
    validate_label("category", category)
}

/// Validates a customer name. Returns the trimmed name.
pub fn validate_customer_name(name: &str) -> ValidationResult<String> {
    validate_label("name", name)
}

/// Normalizes a phone number to digits only and checks its length.
///
/// ## Rules
/// - Every non-digit is stripped (`+`, spaces, parentheses, hyphens)
/// - 10 to 13 digits remain (area code + number, optionally country code)
///
/// ## Example
/// ```rust
/// use storekeep_core::validation::normalize_phone;
///
/// assert_eq!(normalize_phone("+55 (11) 98888-7777").unwrap(), "5511988887777");
/// assert!(normalize_phone("12345").is_err());
/// assert!(normalize_phone("").is_err());
/// ```
pub fn normalize_phone(phone: &str) -> ValidationResult<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return Err(ValidationError::required("phone"));
    }

    if !(10..=13).contains(&digits.len()) {
        return Err(ValidationError::invalid_format(
            "phone",
            "must have between 10 and 13 digits",
        ));
    }

    Ok(digits)
}

/// Validates an optional email. Blank input becomes `None`.
pub fn validate_email(email: Option<&str>) -> ValidationResult<Option<String>> {
    let email = match email.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(e) => e,
    };

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::invalid_format("email", "must look like name@domain.tld"));
    }

    Ok(Some(email.to_lowercase()))
}

/// Validates an optional CPF (11 digits after normalization).
/// Blank input becomes `None`.
pub fn validate_cpf(cpf: Option<&str>) -> ValidationResult<Option<String>> {
    let cpf = match cpf.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(c) => c,
    };

    let digits: String = cpf.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 11 {
        return Err(ValidationError::invalid_format("cpf", "must have 11 digits"));
    }

    Ok(Some(digits))
}

/// Validates a free-text reason (cancellation). Returns the trimmed text.
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::required("reason"));
    }

    if reason.chars().count() > 500 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 500,
        });
    }

    Ok(reason.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale line quantity. Any positive integer is accepted; the
/// stock check decides whether it can be sold.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use storekeep_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a stock level. Zero is allowed.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::Negative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

/// Validates a low-stock threshold (must be positive).
pub fn validate_low_stock_alert(threshold: i64) -> ValidationResult<()> {
    if threshold <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "low_stock_alert".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the lines of a sale before any store access.
///
/// ## Rules
/// - At least one line
/// - Every product id present, every quantity valid
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  record_sale(lines)                                                     │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_cart_lines(lines) ← THIS FUNCTION                            │
/// │       │                                                                 │
/// │       ├── empty?              → Empty { field: "items" }               │
/// │       ├── blank product id?   → Required { field: "product_id" }       │
/// │       ├── qty ≤ 0?            → MustBePositive                         │
/// │       │                                                                 │
/// │       └── OK → stock pre-check                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_cart_lines(lines: &[CartLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    for line in lines {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::required("product_id"));
        }
        validate_quantity(line.quantity)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
