//! Ledger Error Types

use crate::money::MoneyError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Balance operation errors
///
/// Error codes are stable API surface; the gateway maps them to HTTP.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account {account} is {status}, operation {op} not permitted")]
    AccountNotEligible {
        account: String,
        status: &'static str,
        op: &'static str,
    },

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },

    #[error(transparent)]
    InvalidAmount(#[from] MoneyError),

    #[error("Currency mismatch: account holds {account_currency}, request says {requested}")]
    CurrencyMismatch {
        account_currency: String,
        requested: String,
    },

    #[error("Reference {0} already used by a different operation")]
    DuplicateReference(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Concurrent update conflict - retry the operation")]
    ConcurrencyConflict,

    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::AccountNotFound(_) => "NOT_FOUND",
            LedgerError::AccountNotEligible { .. } => "ACCOUNT_NOT_ELIGIBLE",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::InvalidAmount(_) => "INVALID_AMOUNT",
            LedgerError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            LedgerError::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            LedgerError::InvalidState(_) => "INVALID_STATE",
            LedgerError::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            LedgerError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::AccountNotFound(_) => 404,
            LedgerError::InvalidAmount(_) => 400,
            LedgerError::AccountNotEligible { .. }
            | LedgerError::InsufficientFunds { .. }
            | LedgerError::CurrencyMismatch { .. } => 422,
            LedgerError::DuplicateReference(_)
            | LedgerError::InvalidState(_)
            | LedgerError::ConcurrencyConflict => 409,
            LedgerError::Database(_) => 500,
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            // 40001 = serialization_failure, 40P01 = deadlock_detected
            if let Some(code) = db.code() {
                if code == "40001" || code == "40P01" {
                    return LedgerError::ConcurrencyConflict;
                }
            }
        }
        LedgerError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::AccountNotFound("1001".into()).code(),
            "NOT_FOUND"
        );
        assert_eq!(
            LedgerError::InsufficientFunds {
                available: Decimal::ZERO,
                requested: Decimal::ONE,
            }
            .code(),
            "INSUFFICIENT_FUNDS"
        );
        assert_eq!(LedgerError::ConcurrencyConflict.code(), "CONCURRENCY_CONFLICT");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(LedgerError::AccountNotFound("x".into()).http_status(), 404);
        assert_eq!(
            LedgerError::DuplicateReference("r".into()).http_status(),
            409
        );
        assert_eq!(LedgerError::Database("boom".into()).http_status(), 500);
    }
}
