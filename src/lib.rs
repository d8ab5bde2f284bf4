//! bankcore - Money-Movement Core
//!
//! The balance ledger, fund lock registry and transfer saga coordinator of a
//! multi-service banking backend.
//!
//! # Modules
//!
//! - [`money`] - Amount validation and formatting (scale-2 decimals)
//! - [`ledger`] - Ledger store, audit log and balance operation engine
//! - [`locks`] - Fund lock registry (named reservations, available balance)
//! - [`transfer`] - Transfer saga: initiate / confirm / cancel with
//!   compensation on partial failure
//! - [`term_deposit`] - Reservation-then-commit saga for deposit opening
//! - [`gateway`] - axum HTTP surface
//! - [`config`], [`logging`], [`db`] - service plumbing

pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod locks;
pub mod logging;
pub mod money;
pub mod term_deposit;
pub mod transfer;

// Convenient re-exports at crate root
pub use ledger::{
    AccountSnapshot, AccountStatus, BalanceOpReceipt, BalanceOpRequest, LedgerEngine, LedgerError,
    MemoryLedger, OperationType, PgLedger,
};
pub use locks::{FundLock, FundLockRegistry, LockError, LockRequest, PgFundLockRegistry};
pub use transfer::{TransferCoordinator, TransferError, TransferId, TransferStatus};
