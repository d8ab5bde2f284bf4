//! HTTP Gateway
//!
//! axum surface for the §6 contracts: balance operations, fund locks,
//! transfers and term deposits. Responses use the standard envelope
//! `{code, data?, msg?}` with stable numeric error codes.

pub mod handlers;
pub mod state;
pub mod types;

pub use state::AppState;

use axum::Router;
use axum::routing::{get, post};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Balance operations
        .route("/v1/balances/{account}", get(handlers::get_balance))
        .route("/v1/balances/{account}/history", get(handlers::get_history))
        .route("/v1/balances/{account}/debit", post(handlers::debit))
        .route("/v1/balances/{account}/credit", post(handlers::credit))
        .route("/v1/balances/{account}/hold", post(handlers::hold))
        .route("/v1/balances/{account}/release", post(handlers::release_hold))
        // Fund locks
        .route("/v1/locks", post(handlers::lock_funds))
        .route("/v1/locks/release", post(handlers::unlock_funds))
        .route("/v1/locks/{account}", get(handlers::list_locks))
        // Transfers
        .route("/v1/transfers", post(handlers::initiate_transfer))
        .route("/v1/transfers/{id}", get(handlers::get_transfer))
        .route("/v1/transfers/{id}/confirm", post(handlers::confirm_transfer))
        .route("/v1/transfers/{id}/cancel", post(handlers::cancel_transfer))
        // Term deposits
        .route("/v1/deposits", post(handlers::open_deposit))
        .with_state(state)
}
