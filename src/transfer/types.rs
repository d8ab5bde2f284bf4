//! Transfer Core Types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::state::TransferStatus;

/// Transfer identifier - ULID-based
///
/// Monotonic, sortable, and needs no coordination between workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferId(ulid::Ulid);

impl TransferId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransferId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

/// Transfer initiation request
#[derive(Debug, Clone)]
pub struct InitiateRequest {
    pub source_account: String,
    pub dest_account: String,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub description: Option<String>,
    /// Contact channel for second-factor delivery (email or phone).
    pub contact: String,
    pub created_by: String,
    /// Optional client idempotency key.
    pub cid: Option<String>,
}

/// Persisted transfer transaction
#[derive(Debug, Clone)]
pub struct TransferRecord {
    pub transfer_id: TransferId,
    /// Human-facing reference number (unique).
    pub reference_no: String,
    /// Client idempotency key.
    pub cid: Option<String>,
    pub source_account: String,
    pub dest_account: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: TransferStatus,
    pub description: Option<String>,
    pub created_by: String,
    /// Last error, including compensation notes for operators.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferRecord {
    /// Create a new PENDING record. The reference number embeds the ULID so
    /// it is unique without a counter.
    pub fn new(
        transfer_id: TransferId,
        source_account: String,
        dest_account: String,
        amount: Decimal,
        currency: String,
        description: Option<String>,
        created_by: String,
        cid: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            transfer_id,
            reference_no: format!("TRF-{}", transfer_id),
            cid,
            source_account,
            dest_account,
            amount,
            currency,
            status: TransferStatus::Pending,
            description,
            created_by,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Idempotency reference for the forward debit leg.
    pub fn debit_reference(&self) -> String {
        format!("{}:debit", self.transfer_id)
    }

    /// Idempotency reference for the forward credit leg.
    pub fn credit_reference(&self) -> String {
        format!("{}:credit", self.transfer_id)
    }

    /// Idempotency reference for the compensating credit back to source.
    /// Sharing the transfer id makes the compensation itself replay-safe.
    pub fn compensation_reference(&self) -> String {
        format!("{}:compensation", self.transfer_id)
    }
}

impl fmt::Display for TransferRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transfer[{}] {} -> {} amount={} {} state={}",
            self.transfer_id,
            self.source_account,
            self.dest_account,
            self.amount,
            self.currency,
            self.status
        )
    }
}

/// Response of `initiate`
#[derive(Debug, Clone, Serialize)]
pub struct InitiateReceipt {
    pub transfer_id: String,
    pub reference_no: String,
    /// Masked contact the second factor was sent to.
    pub masked_contact: String,
    /// Validity window of the code, in seconds.
    pub code_ttl_secs: u64,
}

/// Response of `confirm`
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmReceipt {
    pub transfer_id: String,
    pub status: &'static str,
    pub message: String,
}

/// Response of `cancel`
#[derive(Debug, Clone, Serialize)]
pub struct CancelReceipt {
    pub transfer_id: String,
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_transfer_id_unique_and_parses() {
        let a = TransferId::new();
        let b = TransferId::new();
        assert_ne!(a, b);

        let parsed: TransferId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
    }

    #[test]
    fn test_record_references_share_the_id() {
        let id = TransferId::new();
        let record = TransferRecord::new(
            id,
            "1001".into(),
            "2002".into(),
            Decimal::new(10000, 2),
            "USD".into(),
            None,
            "user-9".into(),
            None,
        );

        assert_eq!(record.status, TransferStatus::Pending);
        assert_eq!(record.reference_no, format!("TRF-{}", id));
        assert_eq!(record.debit_reference(), format!("{}:debit", id));
        assert_eq!(record.credit_reference(), format!("{}:credit", id));
        assert_eq!(
            record.compensation_reference(),
            format!("{}:compensation", id)
        );
    }
}
