//! In-process ledger backend
//!
//! Implements [`LedgerEngine`] and [`FundLockRegistry`] over process memory:
//! a per-account mutex stands in for the row lock, and an atomic map insert
//! stands in for the audit log's unique reference constraint. Semantics are
//! identical to the PostgreSQL backend; used by local development (no
//! `postgres_url` configured) and by the test suite.
//!
//! Operations on different accounts only ever contend on map shards, never
//! on each other's account mutex.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::engine::{LedgerEngine, apply_rules, check_eligibility, replay_or_conflict};
use super::error::LedgerError;
use super::models::{
    AccountSnapshot, AccountStatus, AuditEntry, BalanceOpReceipt, BalanceOpRequest, OperationType,
};
use crate::locks::{
    FundLock, FundLockRegistry, LockError, LockReceipt, LockRequest, LockStatus,
};
use crate::money;

#[derive(Debug)]
struct AccountCell {
    balance: Decimal,
    hold: Decimal,
    currency: String,
    status: AccountStatus,
}

pub struct MemoryLedger {
    accounts: DashMap<String, Arc<Mutex<AccountCell>>>,
    /// Audit rows by reference; insert-once is the idempotency authority.
    audit: DashMap<String, AuditEntry>,
    /// Audit rows by account, oldest first.
    history: DashMap<String, Vec<AuditEntry>>,
    locks: DashMap<Uuid, FundLock>,
    /// Active lock per external reference (mirrors the partial unique index).
    active_refs: DashMap<String, Uuid>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            audit: DashMap::new(),
            history: DashMap::new(),
            locks: DashMap::new(),
            active_refs: DashMap::new(),
        }
    }

    /// Seed an ACTIVE account. Account opening itself is out of scope, so the
    /// opening balance is not audited.
    pub fn open_account(
        &self,
        account_no: impl Into<String>,
        currency: impl Into<String>,
        opening_balance: Decimal,
    ) {
        self.accounts.insert(
            account_no.into(),
            Arc::new(Mutex::new(AccountCell {
                balance: opening_balance,
                hold: Decimal::ZERO,
                currency: currency.into(),
                status: AccountStatus::Active,
            })),
        );
    }

    pub fn set_status(&self, account_no: &str, status: AccountStatus) -> Result<(), LedgerError> {
        let cell = self
            .accounts
            .get(account_no)
            .map(|e| e.value().clone())
            .ok_or_else(|| LedgerError::AccountNotFound(account_no.to_string()))?;
        cell.lock().unwrap().status = status;
        Ok(())
    }

    fn account(&self, account_no: &str) -> Option<Arc<Mutex<AccountCell>>> {
        self.accounts.get(account_no).map(|e| e.value().clone())
    }

    fn apply_op(
        &self,
        op: OperationType,
        req: &BalanceOpRequest,
    ) -> Result<BalanceOpReceipt, LedgerError> {
        let amount = money::validate_amount(req.amount)?;

        if let Some(entry) = self.audit.get(&req.reference) {
            return replay_or_conflict(op, req, entry.value().clone());
        }

        let cell = self
            .account(&req.account_no)
            .ok_or_else(|| LedgerError::AccountNotFound(req.account_no.clone()))?;
        let mut cell = cell.lock().unwrap();

        check_eligibility(op, cell.status, &req.account_no)?;

        if let Some(requested) = &req.currency {
            if requested != &cell.currency {
                return Err(LedgerError::CurrencyMismatch {
                    account_currency: cell.currency.clone(),
                    requested: requested.clone(),
                });
            }
        }

        let (new_balance, new_hold) = apply_rules(op, amount, cell.balance, cell.hold)?;

        let entry = AuditEntry {
            account_no: req.account_no.clone(),
            op_type: op,
            previous_balance: cell.balance,
            amount,
            new_balance,
            hold_amount: new_hold,
            available: new_balance - new_hold,
            currency: cell.currency.clone(),
            reference: req.reference.clone(),
            description: req.description.clone(),
            actor: req.actor.clone(),
            created_at: Utc::now(),
        };

        // Atomic insert-if-absent: the mutation is applied only by the
        // writer that owns the reference.
        match self.audit.entry(req.reference.clone()) {
            Entry::Occupied(existing) => replay_or_conflict(op, req, existing.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                cell.balance = new_balance;
                cell.hold = new_hold;
                self.history
                    .entry(req.account_no.clone())
                    .or_default()
                    .push(entry.clone());
                Ok(entry.receipt())
            }
        }
    }

    fn unlock_inner(&self, lock_id: Uuid, reason: &str) -> Result<FundLock, LockError> {
        let existing = self
            .locks
            .get(&lock_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| LockError::NotFound(lock_id.to_string()))?;

        if existing.status != LockStatus::Locked {
            return Err(LockError::InvalidState(format!(
                "lock {} is {}, not LOCKED",
                lock_id, existing.status
            )));
        }

        let cell = self
            .account(&existing.account_no)
            .ok_or_else(|| LockError::AccountNotFound(existing.account_no.clone()))?;
        let mut cell = cell.lock().unwrap();

        let mut lock = self
            .locks
            .get_mut(&lock_id)
            .ok_or_else(|| LockError::NotFound(lock_id.to_string()))?;
        // Re-check under the account mutex: a racing release loses here.
        if lock.status != LockStatus::Locked {
            return Err(LockError::InvalidState(format!(
                "lock {} was released concurrently",
                lock_id
            )));
        }

        lock.status = LockStatus::Released;
        lock.release_reason = Some(reason.to_string());
        lock.released_at = Some(Utc::now());
        cell.hold -= lock.amount;
        let released = lock.clone();
        drop(lock);

        self.active_refs.remove(&released.reference_id);
        Ok(released)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerEngine for MemoryLedger {
    async fn debit(&self, req: &BalanceOpRequest) -> Result<BalanceOpReceipt, LedgerError> {
        self.apply_op(OperationType::Debit, req)
    }

    async fn credit(&self, req: &BalanceOpRequest) -> Result<BalanceOpReceipt, LedgerError> {
        self.apply_op(OperationType::Credit, req)
    }

    async fn hold(&self, req: &BalanceOpRequest) -> Result<BalanceOpReceipt, LedgerError> {
        self.apply_op(OperationType::Hold, req)
    }

    async fn release_hold(&self, req: &BalanceOpRequest) -> Result<BalanceOpReceipt, LedgerError> {
        self.apply_op(OperationType::ReleaseHold, req)
    }

    async fn snapshot(&self, account_no: &str) -> Result<AccountSnapshot, LedgerError> {
        let cell = self
            .account(account_no)
            .ok_or_else(|| LedgerError::AccountNotFound(account_no.to_string()))?;
        let cell = cell.lock().unwrap();
        Ok(AccountSnapshot {
            account_no: account_no.to_string(),
            balance: cell.balance,
            hold_amount: cell.hold,
            available: cell.balance - cell.hold,
            currency: cell.currency.clone(),
            status: cell.status,
        })
    }

    async fn history(
        &self,
        account_no: &str,
        limit: i64,
    ) -> Result<Vec<AuditEntry>, LedgerError> {
        let entries = self
            .history
            .get(account_no)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        Ok(entries.into_iter().rev().take(limit as usize).collect())
    }
}

#[async_trait]
impl FundLockRegistry for MemoryLedger {
    async fn lock(&self, req: &LockRequest) -> Result<LockReceipt, LockError> {
        let amount = money::validate_amount(req.amount)?;

        let cell = self
            .account(&req.account_no)
            .ok_or_else(|| LockError::AccountNotFound(req.account_no.clone()))?;
        let mut cell = cell.lock().unwrap();

        if !cell.status.allows_hold() {
            return Err(LockError::AccountNotEligible {
                account: req.account_no.clone(),
                status: cell.status.as_str(),
            });
        }

        let available = cell.balance - cell.hold;
        if amount > available {
            return Err(LockError::InsufficientFunds {
                available,
                requested: amount,
            });
        }

        let lock_id = Uuid::new_v4();
        match self.active_refs.entry(req.reference_id.clone()) {
            Entry::Occupied(_) => {
                return Err(LockError::DuplicateReference(req.reference_id.clone()));
            }
            Entry::Vacant(slot) => {
                slot.insert(lock_id);
            }
        }

        self.locks.insert(
            lock_id,
            FundLock {
                lock_id,
                account_no: req.account_no.clone(),
                amount,
                lock_type: req.lock_type.clone(),
                reference_id: req.reference_id.clone(),
                description: req.description.clone(),
                status: LockStatus::Locked,
                release_reason: None,
                created_at: Utc::now(),
                released_at: None,
            },
        );
        cell.hold += amount;

        Ok(LockReceipt {
            lock_id,
            account_no: req.account_no.clone(),
            locked_amount: amount,
            available: available - amount,
            status: LockStatus::Locked,
        })
    }

    async fn unlock(&self, lock_id: Uuid, reason: &str) -> Result<FundLock, LockError> {
        self.unlock_inner(lock_id, reason)
    }

    async fn unlock_by_reference(
        &self,
        reference_id: &str,
        reason: &str,
    ) -> Result<FundLock, LockError> {
        let lock_id = self
            .active_refs
            .get(reference_id)
            .map(|e| *e.value())
            .ok_or_else(|| {
                LockError::NotFound(format!("no active lock for reference {}", reference_id))
            })?;
        self.unlock_inner(lock_id, reason)
    }

    async fn active_locks(&self, account_no: &str) -> Result<Vec<FundLock>, LockError> {
        let mut locks: Vec<FundLock> = self
            .locks
            .iter()
            .filter(|e| e.value().account_no == account_no && e.value().status == LockStatus::Locked)
            .map(|e| e.value().clone())
            .collect();
        locks.sort_by_key(|l| l.created_at);
        Ok(locks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ledger_with(account_no: &str, balance: &str) -> MemoryLedger {
        let ledger = MemoryLedger::new();
        ledger.open_account(account_no, "USD", d(balance));
        ledger
    }

    #[tokio::test]
    async fn test_debit_updates_balance_and_audit() {
        let ledger = ledger_with("1001", "1000.00");

        let receipt = ledger
            .debit(&BalanceOpRequest::new("1001", d("300"), "T1", "teller"))
            .await
            .unwrap();

        assert_eq!(receipt.previous_balance, d("1000.00"));
        assert_eq!(receipt.new_balance, d("700.00"));
        assert_eq!(receipt.available, d("700.00"));

        let history = ledger.history("1001", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reference, "T1");
    }

    #[tokio::test]
    async fn test_replay_returns_original_receipt() {
        let ledger = ledger_with("1001", "1000.00");
        let req = BalanceOpRequest::new("1001", d("100"), "R1", "teller");

        let first = ledger.debit(&req).await.unwrap();
        let second = ledger.debit(&req).await.unwrap();

        assert_eq!(first.new_balance, second.new_balance);
        let snap = ledger.snapshot("1001").await.unwrap();
        assert_eq!(snap.balance, d("900.00"));
    }

    #[tokio::test]
    async fn test_reference_reuse_with_different_payload_rejected() {
        let ledger = ledger_with("1001", "1000.00");
        ledger
            .debit(&BalanceOpRequest::new("1001", d("100"), "R1", "teller"))
            .await
            .unwrap();

        let err = ledger
            .credit(&BalanceOpRequest::new("1001", d("100"), "R1", "teller"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateReference(_)));

        let err = ledger
            .debit(&BalanceOpRequest::new("1001", d("250"), "R1", "teller"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateReference(_)));
    }

    #[tokio::test]
    async fn test_debit_bounded_by_available_not_balance() {
        let ledger = ledger_with("1001", "1000.00");
        ledger
            .lock(&LockRequest::new("1001", d("800"), "TERM_DEPOSIT", "H1"))
            .await
            .unwrap();

        let err = ledger
            .debit(&BalanceOpRequest::new("1001", d("500"), "T2", "teller"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

        // Within available still works
        ledger
            .debit(&BalanceOpRequest::new("1001", d("200"), "T3", "teller"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_status_gates() {
        let ledger = ledger_with("1001", "1000.00");
        ledger.set_status("1001", AccountStatus::Frozen).unwrap();

        let debit = ledger
            .debit(&BalanceOpRequest::new("1001", d("10"), "F1", "teller"))
            .await;
        assert!(matches!(
            debit,
            Err(LedgerError::AccountNotEligible { .. })
        ));

        let credit = ledger
            .credit(&BalanceOpRequest::new("1001", d("10"), "F2", "teller"))
            .await;
        assert!(matches!(
            credit,
            Err(LedgerError::AccountNotEligible { .. })
        ));

        ledger.set_status("1001", AccountStatus::Dormant).unwrap();
        assert!(
            ledger
                .credit(&BalanceOpRequest::new("1001", d("10"), "F3", "teller"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_currency_mismatch() {
        let ledger = ledger_with("1001", "1000.00");
        let req = BalanceOpRequest::new("1001", d("10"), "C1", "teller").with_currency("EUR");
        let err = ledger.debit(&req).await.unwrap_err();
        assert!(matches!(err, LedgerError::CurrencyMismatch { .. }));
    }

    #[tokio::test]
    async fn test_hold_and_release_via_engine_ops() {
        let ledger = ledger_with("1001", "1000.00");

        let receipt = ledger
            .hold(&BalanceOpRequest::new("1001", d("400"), "H1", "saga"))
            .await
            .unwrap();
        assert_eq!(receipt.new_balance, d("1000.00"));
        assert_eq!(receipt.hold_amount, d("400.00"));
        assert_eq!(receipt.available, d("600.00"));

        let err = ledger
            .release_hold(&BalanceOpRequest::new("1001", d("500"), "H2", "saga"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));

        let receipt = ledger
            .release_hold(&BalanceOpRequest::new("1001", d("400"), "H3", "saga"))
            .await
            .unwrap();
        assert_eq!(receipt.available, d("1000.00"));
    }

    #[tokio::test]
    async fn test_lock_lifecycle_and_double_release() {
        let ledger = ledger_with("1001", "1000.00");

        let receipt = ledger
            .lock(&LockRequest::new("1001", d("800"), "TERM_DEPOSIT", "DEP-1"))
            .await
            .unwrap();
        assert_eq!(receipt.available, d("200.00"));

        let released = ledger
            .unlock_by_reference("DEP-1", "done")
            .await
            .unwrap();
        assert_eq!(released.status, LockStatus::Released);
        assert_eq!(released.release_reason.as_deref(), Some("done"));

        // "Already released" surfaces as NotFound on the reference path
        let err = ledger
            .unlock_by_reference("DEP-1", "done")
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::NotFound(_)));

        // Direct unlock of the released id is InvalidState
        let err = ledger.unlock(released.lock_id, "again").await.unwrap_err();
        assert!(matches!(err, LockError::InvalidState(_)));

        let snap = ledger.snapshot("1001").await.unwrap();
        assert_eq!(snap.available, d("1000.00"));
    }

    #[tokio::test]
    async fn test_second_active_lock_per_reference_rejected() {
        let ledger = ledger_with("1001", "1000.00");
        ledger
            .lock(&LockRequest::new("1001", d("100"), "TERM_DEPOSIT", "DEP-1"))
            .await
            .unwrap();

        let err = ledger
            .lock(&LockRequest::new("1001", d("100"), "TERM_DEPOSIT", "DEP-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::DuplicateReference(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_debits_exactly_drain_the_account() {
        const N: usize = 50;
        let ledger = Arc::new(ledger_with("1001", "500.00")); // 50 * 10.00

        let mut handles = Vec::with_capacity(N);
        for i in 0..N {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                let req =
                    BalanceOpRequest::new("1001", d("10.00"), format!("CONC-{}", i), "tests");
                ledger.debit(&req).await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let snap = ledger.snapshot("1001").await.unwrap();
        assert_eq!(snap.balance, Decimal::ZERO);
        assert_eq!(ledger.history("1001", 100).await.unwrap().len(), N);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_locks_never_exceed_balance() {
        let ledger = Arc::new(ledger_with("1001", "100.00"));

        let mut handles = Vec::new();
        for i in 0..10 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .lock(&LockRequest::new(
                        "1001",
                        d("30.00"),
                        "COLLATERAL",
                        format!("REF-{}", i),
                    ))
                    .await
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                granted += 1;
            }
        }

        // 3 * 30.00 fits in 100.00, the 4th does not
        assert_eq!(granted, 3);
        let snap = ledger.snapshot("1001").await.unwrap();
        assert_eq!(snap.hold_amount, d("90.00"));
        assert_eq!(snap.available, d("10.00"));
    }
}
