//! Ledger data models
//!
//! Account status codes and operation types are stored as SMALLINT in
//! PostgreSQL; the numeric ids here are part of the storage contract.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Account status
///
/// Which operations a status permits is decided here, in one capability
/// table, rather than by account subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i16)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active = 1,
    Dormant = 2,
    Frozen = 3,
    Blocked = 4,
    Closed = 5,
}

impl AccountStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(AccountStatus::Active),
            2 => Some(AccountStatus::Dormant),
            3 => Some(AccountStatus::Frozen),
            4 => Some(AccountStatus::Blocked),
            5 => Some(AccountStatus::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Dormant => "DORMANT",
            AccountStatus::Frozen => "FROZEN",
            AccountStatus::Blocked => "BLOCKED",
            AccountStatus::Closed => "CLOSED",
        }
    }

    /// Debits require a fully active account.
    #[inline]
    pub fn allows_debit(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }

    /// Credits are accepted for dormant accounts (incoming funds reactivate
    /// them downstream), never for frozen/blocked/closed ones.
    #[inline]
    pub fn allows_credit(&self) -> bool {
        matches!(self, AccountStatus::Active | AccountStatus::Dormant)
    }

    /// Holds follow the debit rule: reserving funds is a spend commitment.
    #[inline]
    pub fn allows_hold(&self) -> bool {
        self.allows_debit()
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Balance operation type, as recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i16)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Debit = 1,
    Credit = 2,
    Hold = 3,
    ReleaseHold = 4,
}

impl OperationType {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(OperationType::Debit),
            2 => Some(OperationType::Credit),
            3 => Some(OperationType::Hold),
            4 => Some(OperationType::ReleaseHold),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Debit => "DEBIT",
            OperationType::Credit => "CREDIT",
            OperationType::Hold => "HOLD",
            OperationType::ReleaseHold => "RELEASE_HOLD",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Balance operation request
///
/// `reference` is the caller-supplied idempotency key; a replay with the same
/// reference returns the original receipt instead of mutating again.
#[derive(Debug, Clone)]
pub struct BalanceOpRequest {
    pub account_no: String,
    pub amount: Decimal,
    pub reference: String,
    pub actor: String,
    pub description: Option<String>,
    /// Expected account currency; checked against the account when present.
    pub currency: Option<String>,
}

impl BalanceOpRequest {
    pub fn new(
        account_no: impl Into<String>,
        amount: Decimal,
        reference: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            account_no: account_no.into(),
            amount,
            reference: reference.into(),
            actor: actor.into(),
            description: None,
            currency: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }
}

/// Result of a successful balance operation
#[derive(Debug, Clone, Serialize)]
pub struct BalanceOpReceipt {
    pub account_no: String,
    pub op_type: OperationType,
    pub previous_balance: Decimal,
    pub amount: Decimal,
    pub new_balance: Decimal,
    pub hold_amount: Decimal,
    pub available: Decimal,
    pub currency: String,
    pub reference: String,
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time view of one account
#[derive(Debug, Clone, Serialize)]
pub struct AccountSnapshot {
    pub account_no: String,
    pub balance: Decimal,
    pub hold_amount: Decimal,
    pub available: Decimal,
    pub currency: String,
    pub status: AccountStatus,
}

/// One immutable audit log row
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub account_no: String,
    pub op_type: OperationType,
    pub previous_balance: Decimal,
    pub amount: Decimal,
    pub new_balance: Decimal,
    pub hold_amount: Decimal,
    pub available: Decimal,
    pub currency: String,
    pub reference: String,
    pub description: Option<String>,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// A request replays this entry when account, operation and amount all
    /// match; anything else is a conflicting reuse of the reference.
    pub fn is_replay_of(&self, op: OperationType, req: &BalanceOpRequest) -> bool {
        self.op_type == op && self.account_no == req.account_no && self.amount == req.amount
    }

    /// Reconstruct the receipt the original operation returned.
    pub fn receipt(&self) -> BalanceOpReceipt {
        BalanceOpReceipt {
            account_no: self.account_no.clone(),
            op_type: self.op_type,
            previous_balance: self.previous_balance,
            amount: self.amount,
            new_balance: self.new_balance,
            hold_amount: self.hold_amount,
            available: self.available,
            currency: self.currency.clone(),
            reference: self.reference.clone(),
            timestamp: self.created_at,
        }
    }
}
