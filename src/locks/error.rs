//! Fund lock error types

use crate::money::MoneyError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Lock not found: {0}")]
    NotFound(String),

    #[error("Account {account} is {status}, funds cannot be locked")]
    AccountNotEligible {
        account: String,
        status: &'static str,
    },

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },

    #[error(transparent)]
    InvalidAmount(#[from] MoneyError),

    #[error("Invalid lock state: {0}")]
    InvalidState(String),

    #[error("Reference {0} already has an active lock")]
    DuplicateReference(String),

    #[error("Concurrent update conflict - retry the operation")]
    ConcurrencyConflict,

    #[error("Database error: {0}")]
    Database(String),
}

impl LockError {
    pub fn code(&self) -> &'static str {
        match self {
            LockError::AccountNotFound(_) | LockError::NotFound(_) => "NOT_FOUND",
            LockError::AccountNotEligible { .. } => "ACCOUNT_NOT_ELIGIBLE",
            LockError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LockError::InvalidAmount(_) => "INVALID_AMOUNT",
            LockError::InvalidState(_) => "INVALID_STATE",
            LockError::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            LockError::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            LockError::Database(_) => "DATABASE_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            LockError::AccountNotFound(_) | LockError::NotFound(_) => 404,
            LockError::InvalidAmount(_) => 400,
            LockError::AccountNotEligible { .. } | LockError::InsufficientFunds { .. } => 422,
            LockError::InvalidState(_)
            | LockError::DuplicateReference(_)
            | LockError::ConcurrencyConflict => 409,
            LockError::Database(_) => 500,
        }
    }
}

impl From<sqlx::Error> for LockError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if let Some(code) = db.code() {
                // 23505 = unique_violation (one active lock per reference)
                if code == "23505" {
                    return LockError::DuplicateReference(
                        db.constraint().unwrap_or("reference_id").to_string(),
                    );
                }
                if code == "40001" || code == "40P01" {
                    return LockError::ConcurrencyConflict;
                }
            }
        }
        LockError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_status() {
        assert_eq!(LockError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(LockError::NotFound("x".into()).http_status(), 404);
        assert_eq!(
            LockError::InvalidState("already released".into()).http_status(),
            409
        );
    }
}
