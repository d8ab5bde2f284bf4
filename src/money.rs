//! Money Conversion Module
//!
//! Validation and formatting of currency amounts. All amounts entering the
//! ledger MUST pass through `validate_amount` (or `parse_amount` for client
//! strings) before any lock is taken.
//!
//! ## Representation
//! - Amounts are `rust_decimal::Decimal` with a fixed scale of 2, matching
//!   the NUMERIC(18,2) ledger columns.
//! - Excess precision is rejected, never truncated.
//! - Zero and negative amounts are rejected; sign is carried by the
//!   operation type (DEBIT/CREDIT), not the amount.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Fixed decimal scale for all ledger amounts.
pub const SCALE: u32 = 2;

/// Money validation errors
#[derive(Debug, Error)]
pub enum MoneyError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Convert a client amount string into a validated scale-2 Decimal.
///
/// # Errors
/// * `InvalidFormat` - not a decimal number
/// * `InvalidAmount` - zero or negative
/// * `PrecisionOverflow` - more than 2 decimal places
pub fn parse_amount(amount_str: &str) -> Result<Decimal, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    // Explicit sign prefixes are rejected; the operation carries direction.
    if amount_str.starts_with('+') {
        return Err(MoneyError::InvalidFormat("sign prefix not allowed".into()));
    }

    let amount = Decimal::from_str(amount_str)
        .map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;

    validate_amount(amount)
}

/// Validate an amount already held as Decimal: positive, at most 2 decimal
/// places, normalized to scale 2.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, MoneyError> {
    if amount <= Decimal::ZERO {
        return Err(MoneyError::InvalidAmount);
    }

    // normalize() strips trailing zeros, so "1.50" (scale 2) and "1.5000"
    // (scale 4) both pass while "1.505" does not.
    let effective = amount.normalize();
    if effective.scale() > SCALE {
        return Err(MoneyError::PrecisionOverflow {
            provided: amount.scale(),
            max: SCALE,
        });
    }

    let mut rescaled = effective;
    rescaled.rescale(SCALE);
    Ok(rescaled)
}

/// Format an amount for API responses: always 2 decimal places.
pub fn format_amount(amount: Decimal) -> String {
    let mut v = amount;
    v.rescale(SCALE);
    v.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_valid_amounts() {
        assert_eq!(parse_amount("100").unwrap(), d("100.00"));
        assert_eq!(parse_amount("0.01").unwrap(), d("0.01"));
        assert_eq!(parse_amount("1.5").unwrap(), d("1.50"));
        assert_eq!(parse_amount("  250.75 ").unwrap(), d("250.75"));
    }

    #[test]
    fn test_parse_rejects_bad_format() {
        assert!(matches!(
            parse_amount(""),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_amount("abc"),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_amount("+5"),
            Err(MoneyError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_positive() {
        assert!(matches!(parse_amount("0"), Err(MoneyError::InvalidAmount)));
        assert!(matches!(
            parse_amount("0.00"),
            Err(MoneyError::InvalidAmount)
        ));
        assert!(matches!(
            parse_amount("-10"),
            Err(MoneyError::InvalidAmount)
        ));
    }

    #[test]
    fn test_precision_rejected_not_truncated() {
        assert!(matches!(
            parse_amount("1.005"),
            Err(MoneyError::PrecisionOverflow { .. })
        ));
        // Trailing zeros beyond scale 2 are fine
        assert_eq!(parse_amount("1.5000").unwrap(), d("1.50"));
    }

    #[test]
    fn test_validate_rescales() {
        let v = validate_amount(d("3")).unwrap();
        assert_eq!(v.scale(), SCALE);
        assert_eq!(v.to_string(), "3.00");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(d("100")), "100.00");
        assert_eq!(format_amount(d("0.5")), "0.50");
    }
}
