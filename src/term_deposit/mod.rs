//! Term Deposit Opening - Reservation-then-Commit
//!
//! The pattern every funds-reserving feature follows: create the local draft,
//! lock the funds, then let the external system durably record the
//! obligation. When the external step fails, compensate in strict reverse
//! order - unlock the funds, delete the draft. The forward path is strict;
//! the rollback path is best-effort: a failed unlock is logged and left for
//! manual reconciliation, it is not retried.

pub mod service;
pub mod store;

pub use service::{
    DepositError, DepositReceipt, HttpObligationRegistrar, LocalObligationRegistrar,
    ObligationRegistrar, TermDepositService,
};
pub use store::{
    DepositDraft, DepositStatus, DraftStore, MemoryDepositStore, PgDepositStore,
};
