//! Transfer Saga Coordinator
//!
//! Drives a money movement between two accounts as a saga: validate, issue a
//! second factor, then debit-before-credit with an explicit compensating
//! credit when the forward path fails half-way. There is no distributed
//! transaction here - idempotency references and the visible state machine
//! are the correctness tools.

pub mod collaborators;
pub mod coordinator;
pub mod error;
pub mod remote;
pub mod state;
pub mod store;
pub mod types;


pub use collaborators::{
    AccountCheck, AccountValidator, LedgerAccountValidator, LocalSecondFactor, SecondFactorCheck,
    SecondFactorIssue, SecondFactorService,
};
pub use coordinator::TransferCoordinator;
pub use error::TransferError;
pub use state::TransferStatus;
pub use store::{MemoryTransferStore, PgTransferStore, TransferStore};
pub use types::{
    CancelReceipt, ConfirmReceipt, InitiateReceipt, InitiateRequest, TransferId, TransferRecord,
};
