//! Gateway request/response types

use serde::{Deserialize, Serialize};

/// API wrapper for standard response format
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            data: Some(data),
            msg: None,
        }
    }

    pub fn error(code: i32, msg: impl ToString) -> Self {
        Self {
            code,
            data: None,
            msg: Some(msg.to_string()),
        }
    }
}

/// Numeric error codes, stable across releases
pub mod error_codes {
    pub const INVALID_PARAMETER: i32 = -1001;
    pub const INVALID_AMOUNT: i32 = -1002;
    pub const SAME_ACCOUNT: i32 = -1004;
    pub const CURRENCY_MISMATCH: i32 = -1005;
    pub const INSUFFICIENT_FUNDS: i32 = -2001;
    pub const ACCOUNT_NOT_FOUND: i32 = -2002;
    pub const ACCOUNT_NOT_ELIGIBLE: i32 = -2003;
    pub const DUPLICATE_REFERENCE: i32 = -3001;
    pub const DUPLICATE_REQUEST: i32 = -3002;
    pub const CONCURRENCY_CONFLICT: i32 = -3003;
    pub const INVALID_STATE: i32 = -4001;
    pub const NOT_FOUND: i32 = -4004;
    pub const SECOND_FACTOR_INVALID: i32 = -4101;
    pub const SECOND_FACTOR_EXPIRED: i32 = -4102;
    pub const SERVICE_UNAVAILABLE: i32 = -5001;
    pub const REGISTRATION_FAILED: i32 = -5002;
    pub const INTERNAL_ERROR: i32 = -5999;
}

/// Map a stable string error code to its numeric form. All module errors
/// share this vocabulary.
pub fn numeric_code(code: &str) -> i32 {
    match code {
        "INVALID_AMOUNT" => error_codes::INVALID_AMOUNT,
        "SAME_ACCOUNT" => error_codes::SAME_ACCOUNT,
        "CURRENCY_MISMATCH" => error_codes::CURRENCY_MISMATCH,
        "INSUFFICIENT_FUNDS" => error_codes::INSUFFICIENT_FUNDS,
        "SOURCE_ACCOUNT_NOT_FOUND" | "DESTINATION_ACCOUNT_NOT_FOUND" => {
            error_codes::ACCOUNT_NOT_FOUND
        }
        "ACCOUNT_NOT_ELIGIBLE" => error_codes::ACCOUNT_NOT_ELIGIBLE,
        "DUPLICATE_REFERENCE" => error_codes::DUPLICATE_REFERENCE,
        "DUPLICATE_REQUEST" => error_codes::DUPLICATE_REQUEST,
        "CONCURRENCY_CONFLICT" => error_codes::CONCURRENCY_CONFLICT,
        "INVALID_STATE" => error_codes::INVALID_STATE,
        "NOT_FOUND" | "TRANSFER_NOT_FOUND" => error_codes::NOT_FOUND,
        "SECOND_FACTOR_INVALID" => error_codes::SECOND_FACTOR_INVALID,
        "SECOND_FACTOR_EXPIRED" => error_codes::SECOND_FACTOR_EXPIRED,
        "SERVICE_UNAVAILABLE" => error_codes::SERVICE_UNAVAILABLE,
        "REGISTRATION_FAILED" => error_codes::REGISTRATION_FAILED,
        "DATABASE_ERROR" => error_codes::INTERNAL_ERROR,
        _ => error_codes::INVALID_PARAMETER,
    }
}

// ============================================================================
// Request bodies (amounts travel as strings to avoid float precision issues)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BalanceOpBody {
    pub amount: String,
    /// Caller-supplied idempotency reference (unique).
    pub reference: String,
    pub actor: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LockBody {
    pub account_no: String,
    pub amount: String,
    pub lock_type: String,
    pub reference_id: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnlockBody {
    pub reference_id: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferBody {
    pub source_account: String,
    pub dest_account: String,
    pub amount: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Contact channel for second-factor delivery.
    pub contact: String,
    pub created_by: String,
    /// Optional client idempotency key.
    #[serde(default)]
    pub cid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmBody {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct DepositBody {
    pub account_no: String,
    pub amount: String,
    pub product_code: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    50
}

// ============================================================================
// Response views
// ============================================================================

/// Transfer record as exposed to clients and operators
#[derive(Debug, Serialize)]
pub struct TransferView {
    pub transfer_id: String,
    pub reference_no: String,
    pub source_account: String,
    pub dest_account: String,
    pub amount: String,
    pub currency: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<crate::transfer::TransferRecord> for TransferView {
    fn from(record: crate::transfer::TransferRecord) -> Self {
        Self {
            transfer_id: record.transfer_id.to_string(),
            reference_no: record.reference_no,
            source_account: record.source_account,
            dest_account: record.dest_account,
            amount: crate::money::format_amount(record.amount),
            currency: record.currency,
            status: record.status.as_str(),
            description: record.description,
            error: record.error,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let ok: ApiResponse<i32> = ApiResponse::success(7);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["data"], 7);
        assert!(json.get("msg").is_none());

        let err: ApiResponse<i32> = ApiResponse::error(-2001, "Insufficient funds");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], -2001);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_numeric_code_mapping() {
        assert_eq!(
            numeric_code("INSUFFICIENT_FUNDS"),
            error_codes::INSUFFICIENT_FUNDS
        );
        assert_eq!(numeric_code("TRANSFER_NOT_FOUND"), error_codes::NOT_FOUND);
        assert_eq!(numeric_code("whatever"), error_codes::INVALID_PARAMETER);
    }
}
