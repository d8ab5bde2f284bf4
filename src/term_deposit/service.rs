//! Term deposit opening service

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::store::{DepositDraft, DraftStore};
use crate::locks::{FundLockRegistry, LockError, LockRequest};
use crate::money::{self, MoneyError};

/// Lock type tag for deposit reservations.
const DEPOSIT_LOCK_TYPE: &str = "TERM_DEPOSIT";

#[derive(Error, Debug)]
pub enum DepositError {
    #[error(transparent)]
    InvalidAmount(#[from] MoneyError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Deposit not found: {0}")]
    NotFound(String),

    #[error("Obligation registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl DepositError {
    pub fn code(&self) -> &'static str {
        match self {
            DepositError::InvalidAmount(_) => "INVALID_AMOUNT",
            DepositError::Lock(inner) => inner.code(),
            DepositError::NotFound(_) => "NOT_FOUND",
            DepositError::RegistrationFailed(_) => "REGISTRATION_FAILED",
            DepositError::Database(_) => "DATABASE_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            DepositError::InvalidAmount(_) => 400,
            DepositError::Lock(inner) => inner.http_status(),
            DepositError::NotFound(_) => 404,
            DepositError::RegistrationFailed(_) => 502,
            DepositError::Database(_) => 500,
        }
    }
}

impl From<sqlx::Error> for DepositError {
    fn from(e: sqlx::Error) -> Self {
        DepositError::Database(e.to_string())
    }
}

/// External system that durably records the deposit obligation.
#[async_trait]
pub trait ObligationRegistrar: Send + Sync {
    /// Returns the external reference of the recorded obligation.
    async fn register(&self, draft: &DepositDraft) -> Result<String, String>;
}

/// Client for the core-banking obligation endpoint
/// (`POST {base}/v1/obligations`).
pub struct HttpObligationRegistrar {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObligationRegistrar {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ObligationRegistrar for HttpObligationRegistrar {
    async fn register(&self, draft: &DepositDraft) -> Result<String, String> {
        #[derive(serde::Deserialize)]
        struct ObligationResponse {
            external_ref: String,
        }

        let url = format!("{}/v1/obligations", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "deposit_id": draft.deposit_id.to_string(),
                "account_no": draft.account_no,
                "amount": draft.amount.to_string(),
                "product_code": draft.product_code,
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?;

        let body: ObligationResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(body.external_ref)
    }
}

/// In-process registrar stub; records nothing, mints a reference. Local
/// development only.
pub struct LocalObligationRegistrar;

#[async_trait]
impl ObligationRegistrar for LocalObligationRegistrar {
    async fn register(&self, draft: &DepositDraft) -> Result<String, String> {
        info!(deposit_id = %draft.deposit_id, "Local registrar stub accepted obligation");
        Ok(format!("LOCAL-{}", draft.deposit_id.simple()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DepositReceipt {
    pub deposit_id: String,
    pub external_ref: String,
    pub account_no: String,
    pub amount: Decimal,
    /// Available balance after the reservation.
    pub available: Decimal,
    pub status: &'static str,
}

pub struct TermDepositService {
    drafts: Arc<dyn DraftStore>,
    locks: Arc<dyn FundLockRegistry>,
    registrar: Arc<dyn ObligationRegistrar>,
}

impl TermDepositService {
    pub fn new(
        drafts: Arc<dyn DraftStore>,
        locks: Arc<dyn FundLockRegistry>,
        registrar: Arc<dyn ObligationRegistrar>,
    ) -> Self {
        Self {
            drafts,
            locks,
            registrar,
        }
    }

    /// Open a deposit: draft, lock funds, register the obligation.
    ///
    /// On a registration failure the compensation runs in strict reverse
    /// order: unlock the funds, then delete the draft. The unlock is
    /// best-effort - if it fails the lock stays visible to operators via
    /// `active_locks` and is reconciled manually.
    pub async fn open(
        &self,
        account_no: &str,
        amount: Decimal,
        product_code: &str,
    ) -> Result<DepositReceipt, DepositError> {
        let amount = money::validate_amount(amount)?;

        let draft = DepositDraft::new(account_no, amount, product_code);
        self.drafts.create(&draft).await?;

        let lock_req = LockRequest::new(
            account_no,
            amount,
            DEPOSIT_LOCK_TYPE,
            draft.deposit_id.to_string(),
        )
        .with_description(format!("Term deposit {}", product_code));

        let lock = match self.locks.lock(&lock_req).await {
            Ok(lock) => lock,
            Err(e) => {
                self.discard_draft(draft.deposit_id).await;
                return Err(e.into());
            }
        };

        match self.registrar.register(&draft).await {
            Ok(external_ref) => {
                self.drafts.activate(draft.deposit_id, &external_ref).await?;
                info!(
                    deposit_id = %draft.deposit_id,
                    account = %account_no,
                    amount = %amount,
                    external_ref = %external_ref,
                    "Term deposit opened"
                );
                Ok(DepositReceipt {
                    deposit_id: draft.deposit_id.to_string(),
                    external_ref,
                    account_no: account_no.to_string(),
                    amount,
                    available: lock.available,
                    status: "ACTIVE",
                })
            }
            Err(cause) => {
                // Compensate in reverse order of the forward steps.
                if let Err(unlock_err) = self
                    .locks
                    .unlock_by_reference(&draft.deposit_id.to_string(), "registration failed")
                    .await
                {
                    warn!(
                        deposit_id = %draft.deposit_id,
                        account = %account_no,
                        error = %unlock_err,
                        "Rollback unlock failed - lock left for manual reconciliation"
                    );
                }
                self.discard_draft(draft.deposit_id).await;
                Err(DepositError::RegistrationFailed(cause))
            }
        }
    }

    async fn discard_draft(&self, deposit_id: Uuid) {
        if let Err(e) = self.drafts.delete(deposit_id).await {
            warn!(deposit_id = %deposit_id, error = %e, "Failed to delete deposit draft");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerEngine, MemoryLedger};
    use crate::term_deposit::store::{DepositStatus, MemoryDepositStore};
    use std::str::FromStr;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    struct MockRegistrar {
        fail: Mutex<bool>,
        register_count: AtomicUsize,
        /// When set, releases the draft's lock before failing - drives the
        /// rollback path into its own unlock failure.
        sabotage_registry: Mutex<Option<Arc<MemoryLedger>>>,
    }

    impl MockRegistrar {
        fn new() -> Self {
            Self {
                fail: Mutex::new(false),
                register_count: AtomicUsize::new(0),
                sabotage_registry: Mutex::new(None),
            }
        }

        fn set_fail(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }

        fn sabotage_unlock(&self, registry: Arc<MemoryLedger>) {
            *self.sabotage_registry.lock().unwrap() = Some(registry);
            *self.fail.lock().unwrap() = true;
        }
    }

    #[async_trait]
    impl ObligationRegistrar for MockRegistrar {
        async fn register(&self, draft: &DepositDraft) -> Result<String, String> {
            self.register_count.fetch_add(1, Ordering::SeqCst);

            let registry = self.sabotage_registry.lock().unwrap().clone();
            if let Some(registry) = registry {
                use crate::locks::FundLockRegistry;
                registry
                    .unlock_by_reference(&draft.deposit_id.to_string(), "sabotage")
                    .await
                    .unwrap();
            }

            if *self.fail.lock().unwrap() {
                Err("core banking system rejected the record".to_string())
            } else {
                Ok(format!("CBS-{}", draft.deposit_id.simple()))
            }
        }
    }

    struct Harness {
        ledger: Arc<MemoryLedger>,
        drafts: Arc<MemoryDepositStore>,
        registrar: Arc<MockRegistrar>,
        service: TermDepositService,
    }

    fn harness() -> Harness {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.open_account("1001", "USD", d("1000.00"));
        let drafts = Arc::new(MemoryDepositStore::new());
        let registrar = Arc::new(MockRegistrar::new());
        let service =
            TermDepositService::new(drafts.clone(), ledger.clone(), registrar.clone());
        Harness {
            ledger,
            drafts,
            registrar,
            service,
        }
    }

    #[tokio::test]
    async fn test_open_locks_funds_and_activates_draft() {
        let h = harness();

        let receipt = h.service.open("1001", d("800.00"), "TD-12M").await.unwrap();
        assert_eq!(receipt.available, d("200.00"));
        assert!(receipt.external_ref.starts_with("CBS-"));

        let snap = h.ledger.snapshot("1001").await.unwrap();
        assert_eq!(snap.hold_amount, d("800.00"));
        assert_eq!(snap.available, d("200.00"));

        let draft = h
            .drafts
            .get(receipt.deposit_id.parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(draft.status, DepositStatus::Active);
        assert_eq!(draft.external_ref, Some(receipt.external_ref));
    }

    #[tokio::test]
    async fn test_insufficient_available_discards_draft() {
        let h = harness();

        let err = h
            .service
            .open("1001", d("1200.00"), "TD-12M")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");

        // Nothing reserved, no draft left behind, registrar never called
        let snap = h.ledger.snapshot("1001").await.unwrap();
        assert_eq!(snap.hold_amount, Decimal::ZERO);
        assert_eq!(h.registrar.register_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_registration_failure_compensates_in_reverse() {
        let h = harness();
        h.registrar.set_fail(true);

        let err = h
            .service
            .open("1001", d("800.00"), "TD-12M")
            .await
            .unwrap_err();
        assert!(matches!(err, DepositError::RegistrationFailed(_)));

        // Lock released, draft deleted
        let snap = h.ledger.snapshot("1001").await.unwrap();
        assert_eq!(snap.hold_amount, Decimal::ZERO);
        assert_eq!(snap.available, d("1000.00"));

        use crate::locks::FundLockRegistry;
        assert!(h.ledger.active_locks("1001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_unlock_failure_is_warned_not_fatal() {
        let h = harness();
        h.registrar.sabotage_unlock(h.ledger.clone());

        let err = h
            .service
            .open("1001", d("500.00"), "TD-6M")
            .await
            .unwrap_err();
        // The caller still sees the registration failure, not the unlock one
        assert!(matches!(err, DepositError::RegistrationFailed(_)));

        // No draft survives even though the rollback's unlock call failed
        assert_eq!(h.registrar.register_count.load(Ordering::SeqCst), 1);
    }
}
