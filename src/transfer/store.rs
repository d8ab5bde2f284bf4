//! Transfer persistence
//!
//! All state updates are CAS operations (`UPDATE ... WHERE status =
//! expected`) so concurrent confirm/cancel attempts race safely at the
//! store, not in application code.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use super::error::TransferError;
use super::state::TransferStatus;
use super::types::{TransferId, TransferRecord};

#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Insert a new PENDING record. `DuplicateRequest` when the cid is taken.
    async fn create(&self, record: &TransferRecord) -> Result<(), TransferError>;

    async fn get(&self, transfer_id: &TransferId)
    -> Result<Option<TransferRecord>, TransferError>;

    async fn get_by_cid(&self, cid: &str) -> Result<Option<TransferRecord>, TransferError>;

    /// Atomic CAS: returns false when the current status did not match
    /// (another worker transitioned first).
    async fn update_status_if(
        &self,
        transfer_id: &TransferId,
        expected: TransferStatus,
        new: TransferStatus,
    ) -> Result<bool, TransferError>;

    /// CAS with an error/reconciliation note attached.
    async fn update_status_with_error(
        &self,
        transfer_id: &TransferId,
        expected: TransferStatus,
        new: TransferStatus,
        error: &str,
    ) -> Result<bool, TransferError>;
}

/// PostgreSQL-backed store over `transfers_tb`
pub struct PgTransferStore {
    pool: PgPool,
}

impl PgTransferStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransferStore for PgTransferStore {
    async fn create(&self, record: &TransferRecord) -> Result<(), TransferError> {
        let result = sqlx::query(
            r#"
            INSERT INTO transfers_tb
                (transfer_id, reference_no, cid, source_account, dest_account,
                 amount, currency, status, description, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.transfer_id.to_string())
        .bind(&record.reference_no)
        .bind(&record.cid)
        .bind(&record.source_account)
        .bind(&record.dest_account)
        .bind(record.amount)
        .bind(&record.currency)
        .bind(record.status.id())
        .bind(&record.description)
        .bind(&record.created_by)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
                Err(TransferError::DuplicateRequest)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(
        &self,
        transfer_id: &TransferId,
    ) -> Result<Option<TransferRecord>, TransferError> {
        let row = sqlx::query(
            r#"
            SELECT transfer_id, reference_no, cid, source_account, dest_account,
                   amount, currency, status, description, created_by,
                   error_message, created_at, updated_at
            FROM transfers_tb
            WHERE transfer_id = $1
            "#,
        )
        .bind(transfer_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_record(&r)).transpose()
    }

    async fn get_by_cid(&self, cid: &str) -> Result<Option<TransferRecord>, TransferError> {
        let row = sqlx::query(
            r#"
            SELECT transfer_id, reference_no, cid, source_account, dest_account,
                   amount, currency, status, description, created_by,
                   error_message, created_at, updated_at
            FROM transfers_tb
            WHERE cid = $1
            "#,
        )
        .bind(cid)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_record(&r)).transpose()
    }

    async fn update_status_if(
        &self,
        transfer_id: &TransferId,
        expected: TransferStatus,
        new: TransferStatus,
    ) -> Result<bool, TransferError> {
        let result = sqlx::query(
            r#"
            UPDATE transfers_tb
            SET status = $1, updated_at = NOW()
            WHERE transfer_id = $2 AND status = $3
            "#,
        )
        .bind(new.id())
        .bind(transfer_id.to_string())
        .bind(expected.id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_status_with_error(
        &self,
        transfer_id: &TransferId,
        expected: TransferStatus,
        new: TransferStatus,
        error: &str,
    ) -> Result<bool, TransferError> {
        let result = sqlx::query(
            r#"
            UPDATE transfers_tb
            SET status = $1, error_message = $2, updated_at = NOW()
            WHERE transfer_id = $3 AND status = $4
            "#,
        )
        .bind(new.id())
        .bind(error)
        .bind(transfer_id.to_string())
        .bind(expected.id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<TransferRecord, TransferError> {
    let transfer_id_str: String = row.get("transfer_id");
    let transfer_id: TransferId = transfer_id_str
        .parse()
        .map_err(|_| TransferError::Database("Invalid transfer_id format".to_string()))?;

    let status_id: i16 = row.get("status");
    let status = TransferStatus::from_id(status_id)
        .ok_or_else(|| TransferError::Database(format!("Invalid status ID: {}", status_id)))?;

    let amount: Decimal = row.get("amount");

    Ok(TransferRecord {
        transfer_id,
        reference_no: row.get("reference_no"),
        cid: row.get("cid"),
        source_account: row.get("source_account"),
        dest_account: row.get("dest_account"),
        amount,
        currency: row.get("currency"),
        status,
        description: row.get("description"),
        created_by: row.get("created_by"),
        error: row.get("error_message"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// In-process store; CAS semantics match the PostgreSQL store.
pub struct MemoryTransferStore {
    records: DashMap<String, TransferRecord>,
    cid_index: DashMap<String, String>,
}

impl MemoryTransferStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            cid_index: DashMap::new(),
        }
    }
}

impl Default for MemoryTransferStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransferStore for MemoryTransferStore {
    async fn create(&self, record: &TransferRecord) -> Result<(), TransferError> {
        if let Some(cid) = &record.cid {
            match self.cid_index.entry(cid.clone()) {
                Entry::Occupied(_) => return Err(TransferError::DuplicateRequest),
                Entry::Vacant(slot) => {
                    slot.insert(record.transfer_id.to_string());
                }
            }
        }
        self.records
            .insert(record.transfer_id.to_string(), record.clone());
        Ok(())
    }

    async fn get(
        &self,
        transfer_id: &TransferId,
    ) -> Result<Option<TransferRecord>, TransferError> {
        Ok(self
            .records
            .get(&transfer_id.to_string())
            .map(|e| e.value().clone()))
    }

    async fn get_by_cid(&self, cid: &str) -> Result<Option<TransferRecord>, TransferError> {
        let Some(id) = self.cid_index.get(cid).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        Ok(self.records.get(&id).map(|e| e.value().clone()))
    }

    async fn update_status_if(
        &self,
        transfer_id: &TransferId,
        expected: TransferStatus,
        new: TransferStatus,
    ) -> Result<bool, TransferError> {
        let Some(mut record) = self.records.get_mut(&transfer_id.to_string()) else {
            return Ok(false);
        };
        if record.status != expected {
            return Ok(false);
        }
        record.status = new;
        record.updated_at = chrono::Utc::now();
        Ok(true)
    }

    async fn update_status_with_error(
        &self,
        transfer_id: &TransferId,
        expected: TransferStatus,
        new: TransferStatus,
        error: &str,
    ) -> Result<bool, TransferError> {
        let Some(mut record) = self.records.get_mut(&transfer_id.to_string()) else {
            return Ok(false);
        };
        if record.status != expected {
            return Ok(false);
        }
        record.status = new;
        record.error = Some(error.to_string());
        record.updated_at = chrono::Utc::now();
        Ok(true)
    }
}
