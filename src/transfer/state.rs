//! Transfer State Machine
//!
//! State IDs are stored as SMALLINT in PostgreSQL.
//! Legal transitions: PENDING -> PROCESSING -> {COMPLETED, FAILED} and
//! PENDING -> CANCELLED. Everything else is an invalid-state error.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum TransferStatus {
    /// Created, waiting for second-factor confirmation
    Pending = 0,

    /// Second factor accepted; ledger operations in flight
    Processing = 10,

    /// Terminal: debit and credit both applied
    Completed = 40,

    /// Terminal: forward path failed (compensated where needed)
    Failed = -10,

    /// Terminal: cancelled before confirmation
    Cancelled = -20,
}

impl TransferStatus {
    /// Terminal states accept no further transitions.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Completed | TransferStatus::Failed | TransferStatus::Cancelled
        )
    }

    /// The state machine, in one place.
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        matches!(
            (self, next),
            (TransferStatus::Pending, TransferStatus::Processing)
                | (TransferStatus::Pending, TransferStatus::Cancelled)
                | (TransferStatus::Processing, TransferStatus::Completed)
                | (TransferStatus::Processing, TransferStatus::Failed)
        )
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TransferStatus::Pending),
            10 => Some(TransferStatus::Processing),
            40 => Some(TransferStatus::Completed),
            -10 => Some(TransferStatus::Failed),
            -20 => Some(TransferStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::Processing => "PROCESSING",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Failed => "FAILED",
            TransferStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for TransferStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        TransferStatus::from_id(value).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TransferStatus; 5] = [
        TransferStatus::Pending,
        TransferStatus::Processing,
        TransferStatus::Completed,
        TransferStatus::Failed,
        TransferStatus::Cancelled,
    ];

    #[test]
    fn test_terminal_states() {
        assert!(!TransferStatus::Pending.is_terminal());
        assert!(!TransferStatus::Processing.is_terminal());
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Failed.is_terminal());
        assert!(TransferStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_legal_transitions_only() {
        let legal = [
            (TransferStatus::Pending, TransferStatus::Processing),
            (TransferStatus::Pending, TransferStatus::Cancelled),
            (TransferStatus::Processing, TransferStatus::Completed),
            (TransferStatus::Processing, TransferStatus::Failed),
        ];

        for from in ALL {
            for to in ALL {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_state_id_roundtrip() {
        for status in ALL {
            assert_eq!(TransferStatus::from_id(status.id()), Some(status));
        }
        assert!(TransferStatus::from_id(99).is_none());
    }
}
