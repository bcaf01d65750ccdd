//! # Validation Module
//!
//! Input validation utilities for Till POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Controller (outside this workspace)                          │
//! │  ├── Deserialization into request types                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Request::validate() (till-core)                              │
//! │  ├── THIS MODULE: shape and range checks                               │
//! │  └── Runs BEFORE any transaction is opened                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine (till-db)                                             │
//! │  ├── Business rules against current state (stock, status, owner)       │
//! │  └── SQLite CHECK / UNIQUE / FOREIGN KEY constraints                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::validation::{validate_sku, validate_quantity_milli};
//!
//! validate_sku("CHZ-01").unwrap();
//! validate_quantity_milli("quantity", 1_250).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_AMOUNT_CENTS, MAX_LINE_ITEMS, MAX_LINE_QUANTITY_MILLI};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted free-text notes.
pub const MAX_NOTES_LEN: usize = 1000;

/// Longest accepted cancellation / movement reason.
pub const MAX_REASON_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_sku;
///
/// assert!(validate_sku("CHZ-01").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a required display name (product or customer).
pub fn validate_name(field: &str, name: &str, max: usize) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates optional free text against a maximum length.
pub fn validate_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates a required identifier that is not a UUID (terminal codes).
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Phone numbers: digits, spaces and `+-()`, at most 20 characters.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    if phone.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "customer_phone".to_string(),
            max: 20,
        });
    }

    if phone.is_empty()
        || !phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "customer_phone".to_string(),
            reason: "must contain only digits, spaces, and +-()".to_string(),
        });
    }

    Ok(())
}

/// Minimal email shape check: `local@domain.tld`, at most 100 characters.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    if email.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "customer_email".to_string(),
            max: 100,
        });
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "customer_email".to_string(),
            reason: "must be a valid email address".to_string(),
        });
    }

    Ok(())
}

/// Delivery time in 24h `H:MM` or `HH:MM`.
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_delivery_time;
///
/// assert!(validate_delivery_time("09:30").is_ok());
/// assert!(validate_delivery_time("9:30").is_ok());
/// assert!(validate_delivery_time("24:00").is_err());
/// ```
pub fn validate_delivery_time(time: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::InvalidFormat {
        field: "delivery_time".to_string(),
        reason: "must be in HH:MM format".to_string(),
    };

    let (hours, minutes) = time.split_once(':').ok_or_else(invalid)?;
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

    if !digits(hours) || hours.len() > 2 || !digits(minutes) || minutes.len() != 2 {
        return Err(invalid());
    }

    let h: u32 = hours.parse().map_err(|_| invalid())?;
    let m: u32 = minutes.parse().map_err(|_| invalid())?;
    if h > 23 || m > 59 {
        return Err(invalid());
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity in thousandths.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY_MILLI
///
/// Whole-unit checks for UNIT products happen in the engine, where the
/// product's sale type is known.
pub fn validate_quantity_milli(field: &str, milli: i64) -> ValidationResult<()> {
    if milli <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if milli > MAX_LINE_QUANTITY_MILLI {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY_MILLI,
        });
    }

    Ok(())
}

/// Amounts that may be zero (opening float, discounts, deposits, prices,
/// tender parts). Capped at MAX_AMOUNT_CENTS.
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    validate_amount_ceiling(field, cents, 0)
}

/// Amounts that must move money (cash movements).
pub fn validate_positive_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    validate_amount_ceiling(field, cents, 1)
}

fn validate_amount_ceiling(field: &str, cents: i64, min: i64) -> ValidationResult<()> {
    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max: MAX_AMOUNT_CENTS,
        });
    }
    Ok(())
}

/// Optional piece count on a line; at least one when present.
pub fn validate_pieces(pieces: Option<i64>) -> ValidationResult<()> {
    match pieces {
        Some(p) if p < 1 => Err(ValidationError::MustBePositive {
            field: "pieces".to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Collection Validators
// =============================================================================

/// A sale or order carries between 1 and MAX_LINE_ITEMS lines.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if count > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_uuid;
///
/// assert!(validate_uuid("session_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("session_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("CHZ-01").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("customer_name", "María López", 200).is_ok());
        assert!(validate_name("customer_name", "  ", 200).is_err());
        assert!(validate_name("customer_name", &"A".repeat(201), 200).is_err());
    }

    #[test]
    fn test_validate_quantity_milli() {
        assert!(validate_quantity_milli("quantity", 1).is_ok());
        assert!(validate_quantity_milli("quantity", 1_250).is_ok());
        assert!(validate_quantity_milli("quantity", MAX_LINE_QUANTITY_MILLI).is_ok());

        assert!(validate_quantity_milli("quantity", 0).is_err());
        assert!(validate_quantity_milli("quantity", -1_000).is_err());
        assert!(validate_quantity_milli("quantity", MAX_LINE_QUANTITY_MILLI + 1).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_non_negative_cents("discount_cents", 0).is_ok());
        assert!(validate_non_negative_cents("discount_cents", -1).is_err());
        assert!(validate_positive_cents("amount_cents", 1).is_ok());
        assert!(validate_positive_cents("amount_cents", 0).is_err());
    }

    #[test]
    fn test_amount_ceiling() {
        assert!(validate_non_negative_cents("deposit_cents", MAX_AMOUNT_CENTS).is_ok());
        assert!(matches!(
            validate_non_negative_cents("deposit_cents", MAX_AMOUNT_CENTS + 1),
            Err(ValidationError::OutOfRange { max: MAX_AMOUNT_CENTS, .. })
        ));
        assert!(validate_positive_cents("amount_cents", i64::MAX).is_err());
    }

    #[test]
    fn test_validate_phone_and_email() {
        assert!(validate_phone("+52 (55) 1234-5678").is_ok());
        assert!(validate_phone("555-CALL").is_err());
        assert!(validate_phone(&"1".repeat(21)).is_err());

        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ana example@x.com").is_err());
    }

    #[test]
    fn test_validate_delivery_time() {
        assert!(validate_delivery_time("00:00").is_ok());
        assert!(validate_delivery_time("23:59").is_ok());
        assert!(validate_delivery_time("7:05").is_ok());

        assert!(validate_delivery_time("24:00").is_err());
        assert!(validate_delivery_time("12:60").is_err());
        assert!(validate_delivery_time("12:5").is_err());
        assert!(validate_delivery_time("noon").is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(0).is_err());
        assert!(validate_line_count(MAX_LINE_ITEMS + 1).is_err());
    }

    #[test]
    fn test_validate_pieces_and_text() {
        assert!(validate_pieces(None).is_ok());
        assert!(validate_pieces(Some(3)).is_ok());
        assert!(validate_pieces(Some(0)).is_err());

        assert!(validate_text("notes", None, 10).is_ok());
        assert!(validate_text("notes", Some("short"), 10).is_ok());
        assert!(validate_text("notes", Some("far too long"), 10).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "123").is_err());
    }
}
