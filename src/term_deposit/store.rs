//! Term deposit draft persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use std::fmt;
use uuid::Uuid;

use super::service::DepositError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum DepositStatus {
    /// Local record exists; obligation not yet registered externally.
    Draft = 0,
    /// Obligation registered; deposit is live.
    Active = 1,
}

impl DepositStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(DepositStatus::Draft),
            1 => Some(DepositStatus::Active),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DepositStatus::Draft => "DRAFT",
            DepositStatus::Active => "ACTIVE",
        }
    }
}

impl fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DepositDraft {
    pub deposit_id: Uuid,
    pub account_no: String,
    pub amount: Decimal,
    pub product_code: String,
    pub status: DepositStatus,
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DepositDraft {
    pub fn new(account_no: impl Into<String>, amount: Decimal, product_code: impl Into<String>) -> Self {
        Self {
            deposit_id: Uuid::new_v4(),
            account_no: account_no.into(),
            amount,
            product_code: product_code.into(),
            status: DepositStatus::Draft,
            external_ref: None,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn create(&self, draft: &DepositDraft) -> Result<(), DepositError>;
    async fn activate(&self, deposit_id: Uuid, external_ref: &str) -> Result<(), DepositError>;
    async fn delete(&self, deposit_id: Uuid) -> Result<(), DepositError>;
    async fn get(&self, deposit_id: Uuid) -> Result<Option<DepositDraft>, DepositError>;
}

/// PostgreSQL-backed store over `deposit_drafts_tb`
pub struct PgDepositStore {
    pool: PgPool,
}

impl PgDepositStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DraftStore for PgDepositStore {
    async fn create(&self, draft: &DepositDraft) -> Result<(), DepositError> {
        sqlx::query(
            r#"
            INSERT INTO deposit_drafts_tb
                (deposit_id, account_no, amount, product_code, status)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(draft.deposit_id)
        .bind(&draft.account_no)
        .bind(draft.amount)
        .bind(&draft.product_code)
        .bind(draft.status.id())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn activate(&self, deposit_id: Uuid, external_ref: &str) -> Result<(), DepositError> {
        let result = sqlx::query(
            r#"
            UPDATE deposit_drafts_tb
            SET status = $1, external_ref = $2
            WHERE deposit_id = $3 AND status = $4
            "#,
        )
        .bind(DepositStatus::Active.id())
        .bind(external_ref)
        .bind(deposit_id)
        .bind(DepositStatus::Draft.id())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DepositError::NotFound(deposit_id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, deposit_id: Uuid) -> Result<(), DepositError> {
        sqlx::query("DELETE FROM deposit_drafts_tb WHERE deposit_id = $1")
            .bind(deposit_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, deposit_id: Uuid) -> Result<Option<DepositDraft>, DepositError> {
        let row = sqlx::query(
            r#"
            SELECT deposit_id, account_no, amount, product_code, status,
                   external_ref, created_at
            FROM deposit_drafts_tb
            WHERE deposit_id = $1
            "#,
        )
        .bind(deposit_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let status_id: i16 = r.get("status");
            let status = DepositStatus::from_id(status_id).ok_or_else(|| {
                DepositError::Database(format!("invalid deposit status id: {}", status_id))
            })?;
            Ok(DepositDraft {
                deposit_id: r.get("deposit_id"),
                account_no: r.get("account_no"),
                amount: r.get("amount"),
                product_code: r.get("product_code"),
                status,
                external_ref: r.get("external_ref"),
                created_at: r.get("created_at"),
            })
        })
        .transpose()
    }
}

/// In-process store for the memory backend and tests
pub struct MemoryDepositStore {
    drafts: DashMap<Uuid, DepositDraft>,
}

impl MemoryDepositStore {
    pub fn new() -> Self {
        Self {
            drafts: DashMap::new(),
        }
    }
}

impl Default for MemoryDepositStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DraftStore for MemoryDepositStore {
    async fn create(&self, draft: &DepositDraft) -> Result<(), DepositError> {
        self.drafts.insert(draft.deposit_id, draft.clone());
        Ok(())
    }

    async fn activate(&self, deposit_id: Uuid, external_ref: &str) -> Result<(), DepositError> {
        let mut draft = self
            .drafts
            .get_mut(&deposit_id)
            .ok_or_else(|| DepositError::NotFound(deposit_id.to_string()))?;
        draft.status = DepositStatus::Active;
        draft.external_ref = Some(external_ref.to_string());
        Ok(())
    }

    async fn delete(&self, deposit_id: Uuid) -> Result<(), DepositError> {
        self.drafts.remove(&deposit_id);
        Ok(())
    }

    async fn get(&self, deposit_id: Uuid) -> Result<Option<DepositDraft>, DepositError> {
        Ok(self.drafts.get(&deposit_id).map(|e| e.value().clone()))
    }
}
