//! Transfer Error Types

use crate::ledger::LedgerError;
use crate::money::MoneyError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Transfer saga errors
///
/// Error codes are stable API surface for clients and operators.
#[derive(Error, Debug)]
pub enum TransferError {
    // === Validation ===
    #[error("Source and destination account cannot be the same")]
    SameAccount,

    #[error(transparent)]
    InvalidAmount(#[from] MoneyError),

    #[error("Source account not found: {0}")]
    SourceAccountNotFound(String),

    #[error("Destination account not found: {0}")]
    DestinationAccountNotFound(String),

    #[error("Account {0} is not eligible for transfers")]
    AccountNotEligible(String),

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },

    // === State machine ===
    #[error("Transfer not found: {0}")]
    TransferNotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    // === Idempotency ===
    #[error("Duplicate request (cid already exists)")]
    DuplicateRequest,

    // === Second factor ===
    #[error("Second factor code is invalid")]
    SecondFactorInvalid,

    #[error("Second factor code has expired")]
    SecondFactorExpired,

    // === Collaborators / system ===
    #[error("External service unavailable: {0}")]
    ExternalServiceUnavailable(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(String),
}

impl TransferError {
    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::SameAccount => "SAME_ACCOUNT",
            TransferError::InvalidAmount(_) => "INVALID_AMOUNT",
            TransferError::SourceAccountNotFound(_) => "SOURCE_ACCOUNT_NOT_FOUND",
            TransferError::DestinationAccountNotFound(_) => "DESTINATION_ACCOUNT_NOT_FOUND",
            TransferError::AccountNotEligible(_) => "ACCOUNT_NOT_ELIGIBLE",
            TransferError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TransferError::TransferNotFound(_) => "TRANSFER_NOT_FOUND",
            TransferError::InvalidState(_) => "INVALID_STATE",
            TransferError::DuplicateRequest => "DUPLICATE_REQUEST",
            TransferError::SecondFactorInvalid => "SECOND_FACTOR_INVALID",
            TransferError::SecondFactorExpired => "SECOND_FACTOR_EXPIRED",
            TransferError::ExternalServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            TransferError::Ledger(inner) => inner.code(),
            TransferError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::SameAccount
            | TransferError::InvalidAmount(_)
            | TransferError::DuplicateRequest => 400,
            TransferError::SourceAccountNotFound(_)
            | TransferError::DestinationAccountNotFound(_)
            | TransferError::TransferNotFound(_) => 404,
            TransferError::AccountNotEligible(_) | TransferError::InsufficientFunds { .. } => 422,
            TransferError::InvalidState(_) => 409,
            TransferError::SecondFactorInvalid | TransferError::SecondFactorExpired => 401,
            TransferError::ExternalServiceUnavailable(_) => 503,
            TransferError::Ledger(inner) => inner.http_status(),
            TransferError::Database(_) => 500,
        }
    }
}

impl From<sqlx::Error> for TransferError {
    fn from(e: sqlx::Error) -> Self {
        TransferError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::SameAccount.code(), "SAME_ACCOUNT");
        assert_eq!(
            TransferError::SecondFactorExpired.code(),
            "SECOND_FACTOR_EXPIRED"
        );
        // Ledger errors keep their own code through the wrapper
        let wrapped = TransferError::Ledger(LedgerError::ConcurrencyConflict);
        assert_eq!(wrapped.code(), "CONCURRENCY_CONFLICT");
        assert_eq!(wrapped.http_status(), 409);
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::SecondFactorInvalid.http_status(), 401);
        assert_eq!(
            TransferError::ExternalServiceUnavailable("otp".into()).http_status(),
            503
        );
        assert_eq!(TransferError::TransferNotFound("x".into()).http_status(), 404);
    }
}
