//! Gateway handlers
//!
//! Thin translation layer: parse the body, call the engine/coordinator, map
//! the module error's stable code onto the envelope. No business rules live
//! here.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};

use super::state::AppState;
use super::types::{
    ApiResponse, BalanceOpBody, ConfirmBody, DepositBody, HistoryQuery, LockBody, TransferBody,
    TransferView, UnlockBody, numeric_code,
};
use crate::ledger::{BalanceOpRequest, OperationType};
use crate::locks::LockRequest;
use crate::money;
use crate::transfer::{InitiateRequest, TransferId};

fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

fn fail(status: u16, code: &str, msg: impl ToString) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ApiResponse::<Value>::error(numeric_code(code), msg)),
    )
        .into_response()
}

pub async fn health() -> Response {
    ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "build": env!("GIT_HASH"),
    }))
}

// ============================================================================
// Balance operations
// ============================================================================

async fn run_balance_op(
    state: &AppState,
    op: OperationType,
    account: String,
    body: BalanceOpBody,
) -> Response {
    let amount = match money::parse_amount(&body.amount) {
        Ok(amount) => amount,
        Err(e) => return fail(400, "INVALID_AMOUNT", e),
    };

    let mut req = BalanceOpRequest::new(account, amount, body.reference, body.actor);
    req.description = body.description;
    req.currency = body.currency;

    let result = match op {
        OperationType::Debit => state.ledger.debit(&req).await,
        OperationType::Credit => state.ledger.credit(&req).await,
        OperationType::Hold => state.ledger.hold(&req).await,
        OperationType::ReleaseHold => state.ledger.release_hold(&req).await,
    };

    match result {
        Ok(receipt) => ok(receipt),
        Err(e) => fail(e.http_status(), e.code(), e),
    }
}

pub async fn debit(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Json(body): Json<BalanceOpBody>,
) -> Response {
    run_balance_op(&state, OperationType::Debit, account, body).await
}

pub async fn credit(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Json(body): Json<BalanceOpBody>,
) -> Response {
    run_balance_op(&state, OperationType::Credit, account, body).await
}

pub async fn hold(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Json(body): Json<BalanceOpBody>,
) -> Response {
    run_balance_op(&state, OperationType::Hold, account, body).await
}

pub async fn release_hold(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Json(body): Json<BalanceOpBody>,
) -> Response {
    run_balance_op(&state, OperationType::ReleaseHold, account, body).await
}

pub async fn get_balance(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Response {
    match state.ledger.snapshot(&account).await {
        Ok(snapshot) => ok(snapshot),
        Err(e) => fail(e.http_status(), e.code(), e),
    }
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    match state.ledger.history(&account, query.limit.clamp(1, 500)).await {
        Ok(entries) => ok(entries),
        Err(e) => fail(e.http_status(), e.code(), e),
    }
}

// ============================================================================
// Fund locks
// ============================================================================

pub async fn lock_funds(
    State(state): State<AppState>,
    Json(body): Json<LockBody>,
) -> Response {
    let amount = match money::parse_amount(&body.amount) {
        Ok(amount) => amount,
        Err(e) => return fail(400, "INVALID_AMOUNT", e),
    };

    let mut req = LockRequest::new(body.account_no, amount, body.lock_type, body.reference_id);
    req.description = body.description;

    match state.locks.lock(&req).await {
        Ok(receipt) => ok(receipt),
        Err(e) => fail(e.http_status(), e.code(), e),
    }
}

pub async fn unlock_funds(
    State(state): State<AppState>,
    Json(body): Json<UnlockBody>,
) -> Response {
    match state
        .locks
        .unlock_by_reference(&body.reference_id, &body.reason)
        .await
    {
        Ok(lock) => ok(lock),
        Err(e) => fail(e.http_status(), e.code(), e),
    }
}

pub async fn list_locks(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Response {
    match state.locks.active_locks(&account).await {
        Ok(locks) => ok(locks),
        Err(e) => fail(e.http_status(), e.code(), e),
    }
}

// ============================================================================
// Transfers
// ============================================================================

pub async fn initiate_transfer(
    State(state): State<AppState>,
    Json(body): Json<TransferBody>,
) -> Response {
    let amount = match money::parse_amount(&body.amount) {
        Ok(amount) => amount,
        Err(e) => return fail(400, "INVALID_AMOUNT", e),
    };

    let req = InitiateRequest {
        source_account: body.source_account,
        dest_account: body.dest_account,
        amount,
        currency: body.currency,
        description: body.description,
        contact: body.contact,
        created_by: body.created_by,
        cid: body.cid,
    };

    match state.transfers.initiate(req).await {
        Ok(receipt) => ok(receipt),
        Err(e) => fail(e.http_status(), e.code(), e),
    }
}

fn parse_transfer_id(id: &str) -> Result<TransferId, Response> {
    id.parse()
        .map_err(|_| fail(400, "INVALID_PARAMETER", format!("invalid transfer id: {}", id)))
}

pub async fn confirm_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ConfirmBody>,
) -> Response {
    let transfer_id = match parse_transfer_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.transfers.confirm(transfer_id, &body.code).await {
        Ok(receipt) => ok(receipt),
        Err(e) => fail(e.http_status(), e.code(), e),
    }
}

pub async fn cancel_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let transfer_id = match parse_transfer_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.transfers.cancel(transfer_id).await {
        Ok(receipt) => ok(receipt),
        Err(e) => fail(e.http_status(), e.code(), e),
    }
}

pub async fn get_transfer(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let transfer_id = match parse_transfer_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.transfers.get(transfer_id).await {
        Ok(record) => ok(TransferView::from(record)),
        Err(e) => fail(e.http_status(), e.code(), e),
    }
}

// ============================================================================
// Term deposits
// ============================================================================

pub async fn open_deposit(
    State(state): State<AppState>,
    Json(body): Json<DepositBody>,
) -> Response {
    let amount = match money::parse_amount(&body.amount) {
        Ok(amount) => amount,
        Err(e) => return fail(400, "INVALID_AMOUNT", e),
    };

    match state
        .deposits
        .open(&body.account_no, amount, &body.product_code)
        .await
    {
        Ok(receipt) => ok(receipt),
        Err(e) => fail(e.http_status(), e.code(), e),
    }
}
