//! Fund Lock Registry
//!
//! Named reservations ("locks") against an account. A lock reduces available
//! balance without moving money; the registry owns the lock records and the
//! account's hold aggregate, mutated under the same per-account row lock the
//! balance engine uses.

pub mod error;
pub mod models;
pub mod registry;

pub use error::LockError;
pub use models::{FundLock, LockReceipt, LockRequest, LockStatus};
pub use registry::{FundLockRegistry, PgFundLockRegistry};
