//! Balance Ledger
//!
//! The authoritative store of account balances. Every balance mutation in the
//! system goes through the [`LedgerEngine`] operations (debit, credit, hold,
//! release_hold), each executed as a single atomic unit against one account
//! row and recorded in the append-only audit log under a caller-supplied
//! idempotency reference.

pub mod engine;
pub mod error;
pub mod memory;
pub mod models;

pub use engine::{LedgerEngine, PgLedger};
pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use models::{
    AccountSnapshot, AccountStatus, AuditEntry, BalanceOpReceipt, BalanceOpRequest, OperationType,
};
