//! Fund lock data models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Lock lifecycle: LOCKED transitions to RELEASED exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i16)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockStatus {
    Locked = 1,
    Released = 2,
}

impl LockStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(LockStatus::Locked),
            2 => Some(LockStatus::Released),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LockStatus::Locked => "LOCKED",
            LockStatus::Released => "RELEASED",
        }
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One fund lock record
///
/// `reference_id` points at the external owner (e.g. a term deposit id); at
/// most one LOCKED row may exist per reference.
#[derive(Debug, Clone, Serialize)]
pub struct FundLock {
    pub lock_id: Uuid,
    pub account_no: String,
    pub amount: Decimal,
    pub lock_type: String,
    pub reference_id: String,
    pub description: Option<String>,
    pub status: LockStatus,
    pub release_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

/// Lock creation request
#[derive(Debug, Clone)]
pub struct LockRequest {
    pub account_no: String,
    pub amount: Decimal,
    pub lock_type: String,
    pub reference_id: String,
    pub description: Option<String>,
}

impl LockRequest {
    pub fn new(
        account_no: impl Into<String>,
        amount: Decimal,
        lock_type: impl Into<String>,
        reference_id: impl Into<String>,
    ) -> Self {
        Self {
            account_no: account_no.into(),
            amount,
            lock_type: lock_type.into(),
            reference_id: reference_id.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Result of a successful lock
#[derive(Debug, Clone, Serialize)]
pub struct LockReceipt {
    pub lock_id: Uuid,
    pub account_no: String,
    pub locked_amount: Decimal,
    /// Available balance after the lock took effect.
    pub available: Decimal,
    pub status: LockStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_status_roundtrip() {
        assert_eq!(LockStatus::from_id(1), Some(LockStatus::Locked));
        assert_eq!(LockStatus::from_id(2), Some(LockStatus::Released));
        assert_eq!(LockStatus::from_id(0), None);
        assert_eq!(LockStatus::Locked.to_string(), "LOCKED");
    }
}
