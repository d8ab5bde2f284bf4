//! Collaborator interfaces
//!
//! Account validation and second-factor (OTP) handling are external services
//! consumed through these narrow traits. All methods must be safe to call
//! across worker retries.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::types::TransferId;
use crate::ledger::{AccountStatus, LedgerEngine, LedgerError};

#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Result of an account validation call
#[derive(Debug, Clone, Copy)]
pub struct AccountCheck {
    pub exists: bool,
    pub active: bool,
}

#[async_trait]
pub trait AccountValidator: Send + Sync {
    async fn validate(&self, account_no: &str) -> Result<AccountCheck, CollaboratorError>;
}

/// Receipt of a second-factor issuance
#[derive(Debug, Clone)]
pub struct SecondFactorIssue {
    pub masked_contact: String,
    pub ttl_secs: u64,
}

/// Outcome of a second-factor validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondFactorCheck {
    Valid,
    Invalid,
    Expired,
}

#[async_trait]
pub trait SecondFactorService: Send + Sync {
    /// Issue a single-use code for a transfer, delivered to `contact`.
    /// Re-issuing replaces any previous code.
    async fn issue(
        &self,
        transfer_id: &TransferId,
        contact: &str,
    ) -> Result<SecondFactorIssue, CollaboratorError>;

    /// Check a code. Expiry wins over mismatch.
    async fn validate(
        &self,
        transfer_id: &TransferId,
        code: &str,
    ) -> Result<SecondFactorCheck, CollaboratorError>;

    /// Invalidate any outstanding code (single use, or on cancel).
    async fn invalidate(&self, transfer_id: &TransferId) -> Result<(), CollaboratorError>;
}

/// Mask a contact channel for receipts: `jo***@example.com`, `******7890`.
pub fn mask_contact(contact: &str) -> String {
    match contact.split_once('@') {
        Some((local, domain)) => {
            let head: String = local.chars().take(2).collect();
            format!("{}***@{}", head, domain)
        }
        None => {
            let chars: Vec<char> = contact.chars().collect();
            if chars.len() <= 4 {
                return "****".to_string();
            }
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}{}", "*".repeat(chars.len() - 4), tail)
        }
    }
}

/// Account validator backed by this deployment's own ledger store.
///
/// Used when no remote account service is configured - the ledger is then
/// the system of record for existence and status.
pub struct LedgerAccountValidator {
    ledger: Arc<dyn LedgerEngine>,
}

impl LedgerAccountValidator {
    pub fn new(ledger: Arc<dyn LedgerEngine>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl AccountValidator for LedgerAccountValidator {
    async fn validate(&self, account_no: &str) -> Result<AccountCheck, CollaboratorError> {
        match self.ledger.snapshot(account_no).await {
            Ok(snapshot) => Ok(AccountCheck {
                exists: true,
                active: snapshot.status == AccountStatus::Active,
            }),
            Err(LedgerError::AccountNotFound(_)) => Ok(AccountCheck {
                exists: false,
                active: false,
            }),
            Err(e) => Err(CollaboratorError::Unavailable(e.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
struct IssuedCode {
    code: String,
    expires_at: DateTime<Utc>,
}

/// In-process second-factor stub
///
/// Generates and checks codes locally instead of calling the OTP service.
/// Delivery is a log line; suitable for local development and tests only.
pub struct LocalSecondFactor {
    codes: DashMap<String, IssuedCode>,
    ttl_secs: u64,
}

impl LocalSecondFactor {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            codes: DashMap::new(),
            ttl_secs,
        }
    }

    /// Current code for a transfer, if any. Stub-only escape hatch so local
    /// tooling and tests can complete the confirm flow.
    pub fn issued_code(&self, transfer_id: &TransferId) -> Option<String> {
        self.codes
            .get(&transfer_id.to_string())
            .map(|e| e.value().code.clone())
    }

    /// Force-expire an outstanding code (stub-only, for TTL tests).
    pub fn expire_now(&self, transfer_id: &TransferId) {
        if let Some(mut entry) = self.codes.get_mut(&transfer_id.to_string()) {
            entry.value_mut().expires_at = Utc::now() - Duration::seconds(1);
        }
    }
}

#[async_trait]
impl SecondFactorService for LocalSecondFactor {
    async fn issue(
        &self,
        transfer_id: &TransferId,
        contact: &str,
    ) -> Result<SecondFactorIssue, CollaboratorError> {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        self.codes.insert(
            transfer_id.to_string(),
            IssuedCode {
                code: code.clone(),
                expires_at: Utc::now() + Duration::seconds(self.ttl_secs as i64),
            },
        );
        debug!(transfer_id = %transfer_id, "Local second-factor stub issued code {}", code);

        Ok(SecondFactorIssue {
            masked_contact: mask_contact(contact),
            ttl_secs: self.ttl_secs,
        })
    }

    async fn validate(
        &self,
        transfer_id: &TransferId,
        code: &str,
    ) -> Result<SecondFactorCheck, CollaboratorError> {
        let Some(entry) = self.codes.get(&transfer_id.to_string()) else {
            return Ok(SecondFactorCheck::Invalid);
        };

        if entry.value().expires_at < Utc::now() {
            return Ok(SecondFactorCheck::Expired);
        }
        if entry.value().code != code {
            return Ok(SecondFactorCheck::Invalid);
        }
        Ok(SecondFactorCheck::Valid)
    }

    async fn invalidate(&self, transfer_id: &TransferId) -> Result<(), CollaboratorError> {
        self.codes.remove(&transfer_id.to_string());
        Ok(())
    }
}

/// Mock collaborators for tests
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct MockValidator {
        accounts: Mutex<HashMap<String, AccountCheck>>,
        unavailable: Mutex<bool>,
    }

    impl MockValidator {
        pub fn new() -> Self {
            Self {
                accounts: Mutex::new(HashMap::new()),
                unavailable: Mutex::new(false),
            }
        }

        pub fn set_account(&self, account_no: &str, exists: bool, active: bool) {
            self.accounts
                .lock()
                .unwrap()
                .insert(account_no.to_string(), AccountCheck { exists, active });
        }

        pub fn set_unavailable(&self, unavailable: bool) {
            *self.unavailable.lock().unwrap() = unavailable;
        }
    }

    #[async_trait]
    impl AccountValidator for MockValidator {
        async fn validate(&self, account_no: &str) -> Result<AccountCheck, CollaboratorError> {
            if *self.unavailable.lock().unwrap() {
                return Err(CollaboratorError::Unavailable(
                    "mock validator down".to_string(),
                ));
            }
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .get(account_no)
                .copied()
                .unwrap_or(AccountCheck {
                    exists: false,
                    active: false,
                }))
        }
    }

    pub struct MockSecondFactor {
        expected_code: Mutex<String>,
        force_expired: Mutex<bool>,
        issue_count: AtomicUsize,
        invalidate_count: AtomicUsize,
    }

    impl MockSecondFactor {
        pub fn new() -> Self {
            Self {
                expected_code: Mutex::new("123456".to_string()),
                force_expired: Mutex::new(false),
                issue_count: AtomicUsize::new(0),
                invalidate_count: AtomicUsize::new(0),
            }
        }

        pub fn set_force_expired(&self, expired: bool) {
            *self.force_expired.lock().unwrap() = expired;
        }

        pub fn issue_count(&self) -> usize {
            self.issue_count.load(Ordering::SeqCst)
        }

        pub fn invalidate_count(&self) -> usize {
            self.invalidate_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SecondFactorService for MockSecondFactor {
        async fn issue(
            &self,
            _transfer_id: &TransferId,
            contact: &str,
        ) -> Result<SecondFactorIssue, CollaboratorError> {
            self.issue_count.fetch_add(1, Ordering::SeqCst);
            Ok(SecondFactorIssue {
                masked_contact: mask_contact(contact),
                ttl_secs: 180,
            })
        }

        async fn validate(
            &self,
            _transfer_id: &TransferId,
            code: &str,
        ) -> Result<SecondFactorCheck, CollaboratorError> {
            if *self.force_expired.lock().unwrap() {
                return Ok(SecondFactorCheck::Expired);
            }
            if *self.expected_code.lock().unwrap() == code {
                Ok(SecondFactorCheck::Valid)
            } else {
                Ok(SecondFactorCheck::Invalid)
            }
        }

        async fn invalidate(&self, _transfer_id: &TransferId) -> Result<(), CollaboratorError> {
            self.invalidate_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use rust_decimal::Decimal;

    #[test]
    fn test_mask_contact() {
        assert_eq!(mask_contact("jondoe@example.com"), "jo***@example.com");
        assert_eq!(mask_contact("+15551237890"), "********7890");
        assert_eq!(mask_contact("123"), "****");
    }

    #[tokio::test]
    async fn test_ledger_validator() {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.open_account("1001", "USD", Decimal::new(100000, 2));
        ledger.open_account("1002", "USD", Decimal::ZERO);
        ledger.set_status("1002", AccountStatus::Frozen).unwrap();

        let validator = LedgerAccountValidator::new(ledger);

        let check = validator.validate("1001").await.unwrap();
        assert!(check.exists && check.active);

        let check = validator.validate("1002").await.unwrap();
        assert!(check.exists && !check.active);

        let check = validator.validate("nope").await.unwrap();
        assert!(!check.exists);
    }

    #[tokio::test]
    async fn test_local_second_factor_lifecycle() {
        let otp = LocalSecondFactor::new(60);
        let id = TransferId::new();

        otp.issue(&id, "jondoe@example.com").await.unwrap();
        let code = otp.issued_code(&id).unwrap();

        assert_eq!(
            otp.validate(&id, "000000x").await.unwrap(),
            SecondFactorCheck::Invalid
        );
        assert_eq!(
            otp.validate(&id, &code).await.unwrap(),
            SecondFactorCheck::Valid
        );

        otp.expire_now(&id);
        assert_eq!(
            otp.validate(&id, &code).await.unwrap(),
            SecondFactorCheck::Expired
        );

        otp.invalidate(&id).await.unwrap();
        assert_eq!(
            otp.validate(&id, &code).await.unwrap(),
            SecondFactorCheck::Invalid
        );
    }
}
