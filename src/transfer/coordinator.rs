//! Transfer Coordinator
//!
//! Orchestrates the transfer state machine:
//! PENDING -> PROCESSING -> {COMPLETED, FAILED}, PENDING -> CANCELLED.
//!
//! The confirm path runs the two ledger legs sequentially, debit before
//! credit. When the credit leg fails after a committed debit, the
//! coordinator issues a compensating credit back to the source under a
//! reference derived from the transfer id, so the compensation is replay-safe
//! too. A failed compensation leaves the transfer FAILED with an operator
//! note; it is never retried automatically and never marked COMPLETED.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::collaborators::{AccountValidator, SecondFactorCheck, SecondFactorService};
use super::error::TransferError;
use super::state::TransferStatus;
use super::store::TransferStore;
use super::types::{
    CancelReceipt, ConfirmReceipt, InitiateReceipt, InitiateRequest, TransferId, TransferRecord,
};
use crate::ledger::{BalanceOpRequest, LedgerEngine};
use crate::money;

/// Actor stamped on ledger operations performed by the saga.
const SAGA_ACTOR: &str = "transfer-saga";

pub struct TransferCoordinator {
    store: Arc<dyn TransferStore>,
    ledger: Arc<dyn LedgerEngine>,
    validator: Arc<dyn AccountValidator>,
    second_factor: Arc<dyn SecondFactorService>,
}

impl TransferCoordinator {
    pub fn new(
        store: Arc<dyn TransferStore>,
        ledger: Arc<dyn LedgerEngine>,
        validator: Arc<dyn AccountValidator>,
        second_factor: Arc<dyn SecondFactorService>,
    ) -> Self {
        Self {
            store,
            ledger,
            validator,
            second_factor,
        }
    }

    /// Create a PENDING transfer and issue the second factor.
    pub async fn initiate(
        &self,
        req: InitiateRequest,
    ) -> Result<InitiateReceipt, TransferError> {
        let amount = money::validate_amount(req.amount)?;

        if req.source_account == req.dest_account {
            return Err(TransferError::SameAccount);
        }

        // Idempotent re-initiation: a known cid re-issues the code for the
        // still-pending transfer instead of creating a second one.
        if let Some(cid) = &req.cid {
            if let Some(existing) = self.store.get_by_cid(cid).await? {
                return self.reissue_for(existing, &req.contact).await;
            }
        }

        let source = self
            .validator
            .validate(&req.source_account)
            .await
            .map_err(|e| TransferError::ExternalServiceUnavailable(e.to_string()))?;
        if !source.exists {
            return Err(TransferError::SourceAccountNotFound(
                req.source_account.clone(),
            ));
        }
        if !source.active {
            return Err(TransferError::AccountNotEligible(req.source_account.clone()));
        }

        let dest = self
            .validator
            .validate(&req.dest_account)
            .await
            .map_err(|e| TransferError::ExternalServiceUnavailable(e.to_string()))?;
        if !dest.exists {
            return Err(TransferError::DestinationAccountNotFound(
                req.dest_account.clone(),
            ));
        }
        if !dest.active {
            return Err(TransferError::AccountNotEligible(req.dest_account.clone()));
        }

        // Advisory check; the debit re-checks under the row lock.
        let snapshot = self.ledger.snapshot(&req.source_account).await?;
        if amount > snapshot.available {
            return Err(TransferError::InsufficientFunds {
                available: snapshot.available,
                requested: amount,
            });
        }

        let currency = req.currency.clone().unwrap_or(snapshot.currency);
        let record = TransferRecord::new(
            TransferId::new(),
            req.source_account,
            req.dest_account,
            amount,
            currency,
            req.description,
            req.created_by,
            req.cid.clone(),
        );

        match self.store.create(&record).await {
            Ok(()) => {}
            Err(TransferError::DuplicateRequest) => {
                // Lost the cid race - hand back the winner.
                let cid = req.cid.as_deref().unwrap_or_default();
                let existing = self
                    .store
                    .get_by_cid(cid)
                    .await?
                    .ok_or(TransferError::DuplicateRequest)?;
                return self.reissue_for(existing, &req.contact).await;
            }
            Err(e) => return Err(e),
        }

        info!(
            transfer_id = %record.transfer_id,
            reference = %record.reference_no,
            "Transfer initiated: {} -> {} amount={} {}",
            record.source_account, record.dest_account, record.amount, record.currency
        );

        let issue = self
            .second_factor
            .issue(&record.transfer_id, &req.contact)
            .await
            .map_err(|e| TransferError::ExternalServiceUnavailable(e.to_string()))?;

        Ok(InitiateReceipt {
            transfer_id: record.transfer_id.to_string(),
            reference_no: record.reference_no,
            masked_contact: issue.masked_contact,
            code_ttl_secs: issue.ttl_secs,
        })
    }

    async fn reissue_for(
        &self,
        existing: TransferRecord,
        contact: &str,
    ) -> Result<InitiateReceipt, TransferError> {
        if existing.status != TransferStatus::Pending {
            return Err(TransferError::InvalidState(format!(
                "transfer {} already {}",
                existing.transfer_id, existing.status
            )));
        }

        info!(
            transfer_id = %existing.transfer_id,
            "Duplicate cid - re-issuing second factor for existing transfer"
        );

        let issue = self
            .second_factor
            .issue(&existing.transfer_id, contact)
            .await
            .map_err(|e| TransferError::ExternalServiceUnavailable(e.to_string()))?;

        Ok(InitiateReceipt {
            transfer_id: existing.transfer_id.to_string(),
            reference_no: existing.reference_no,
            masked_contact: issue.masked_contact,
            code_ttl_secs: issue.ttl_secs,
        })
    }

    /// Validate the second factor, then run debit-before-credit with
    /// compensation on a half-completed movement.
    pub async fn confirm(
        &self,
        transfer_id: TransferId,
        code: &str,
    ) -> Result<ConfirmReceipt, TransferError> {
        let record = self
            .store
            .get(&transfer_id)
            .await?
            .ok_or_else(|| TransferError::TransferNotFound(transfer_id.to_string()))?;

        if record.status != TransferStatus::Pending {
            return Err(TransferError::InvalidState(format!(
                "transfer {} is {}, expected PENDING",
                transfer_id, record.status
            )));
        }

        match self
            .second_factor
            .validate(&transfer_id, code)
            .await
            .map_err(|e| TransferError::ExternalServiceUnavailable(e.to_string()))?
        {
            SecondFactorCheck::Valid => {}
            SecondFactorCheck::Invalid => return Err(TransferError::SecondFactorInvalid),
            SecondFactorCheck::Expired => return Err(TransferError::SecondFactorExpired),
        }

        // Single use: burn the code before any money moves.
        if let Err(e) = self.second_factor.invalidate(&transfer_id).await {
            warn!(transfer_id = %transfer_id, error = %e, "Failed to invalidate second factor");
        }

        if !self
            .store
            .update_status_if(&transfer_id, TransferStatus::Pending, TransferStatus::Processing)
            .await?
        {
            // Another worker confirmed or cancelled first.
            return Err(TransferError::InvalidState(format!(
                "transfer {} left PENDING concurrently",
                transfer_id
            )));
        }

        // === Leg 1: debit source ===
        let debit_req = BalanceOpRequest::new(
            record.source_account.clone(),
            record.amount,
            record.debit_reference(),
            SAGA_ACTOR,
        )
        .with_description(format!("Transfer {} to {}", record.reference_no, record.dest_account))
        .with_currency(record.currency.clone());

        if let Err(e) = self.ledger.debit(&debit_req).await {
            let note = format!("debit failed: {}", e);
            self.store
                .update_status_with_error(
                    &transfer_id,
                    TransferStatus::Processing,
                    TransferStatus::Failed,
                    &note,
                )
                .await?;
            info!(transfer_id = %transfer_id, error = %e, "Transfer failed at debit leg");
            return Err(e.into());
        }

        // === Leg 2: credit destination ===
        let credit_req = BalanceOpRequest::new(
            record.dest_account.clone(),
            record.amount,
            record.credit_reference(),
            SAGA_ACTOR,
        )
        .with_description(format!(
            "Transfer {} from {}",
            record.reference_no, record.source_account
        ))
        .with_currency(record.currency.clone());

        if let Err(e) = self.ledger.credit(&credit_req).await {
            let note = self.compensate(&record, &e).await;
            self.store
                .update_status_with_error(
                    &transfer_id,
                    TransferStatus::Processing,
                    TransferStatus::Failed,
                    &note,
                )
                .await?;
            return Err(e.into());
        }

        self.store
            .update_status_if(&transfer_id, TransferStatus::Processing, TransferStatus::Completed)
            .await?;

        info!(
            transfer_id = %transfer_id,
            reference = %record.reference_no,
            "Transfer completed: {} -> {} amount={} {}",
            record.source_account, record.dest_account, record.amount, record.currency
        );

        Ok(ConfirmReceipt {
            transfer_id: transfer_id.to_string(),
            status: TransferStatus::Completed.as_str(),
            message: format!("Transfer {} completed", record.reference_no),
        })
    }

    /// Credit the debited amount back to the source. Returns the operator
    /// note to record on the FAILED transfer. A failed compensation is
    /// logged and left for manual reconciliation - this is a best-effort
    /// saga, not a two-phase commit.
    async fn compensate(&self, record: &TransferRecord, cause: &crate::ledger::LedgerError) -> String {
        warn!(
            transfer_id = %record.transfer_id,
            error = %cause,
            "Credit leg failed after committed debit - compensating source"
        );

        let compensation = BalanceOpRequest::new(
            record.source_account.clone(),
            record.amount,
            record.compensation_reference(),
            SAGA_ACTOR,
        )
        .with_description(format!(
            "Reversal of transfer {} (credit leg failed)",
            record.reference_no
        ))
        .with_currency(record.currency.clone());

        match self.ledger.credit(&compensation).await {
            Ok(_) => {
                info!(
                    transfer_id = %record.transfer_id,
                    "Source balance restored after failed credit leg"
                );
                format!("credit failed: {}; source compensated", cause)
            }
            Err(comp_err) => {
                error!(
                    transfer_id = %record.transfer_id,
                    credit_error = %cause,
                    compensation_error = %comp_err,
                    "COMPENSATION FAILED - manual reconciliation required"
                );
                format!(
                    "credit failed: {}; compensation failed: {}; manual reconciliation required",
                    cause, comp_err
                )
            }
        }
    }

    /// Cancel a PENDING transfer and invalidate its second factor.
    pub async fn cancel(&self, transfer_id: TransferId) -> Result<CancelReceipt, TransferError> {
        let record = self
            .store
            .get(&transfer_id)
            .await?
            .ok_or_else(|| TransferError::TransferNotFound(transfer_id.to_string()))?;

        if !self
            .store
            .update_status_if(&transfer_id, TransferStatus::Pending, TransferStatus::Cancelled)
            .await?
        {
            return Err(TransferError::InvalidState(format!(
                "transfer {} is {}, only PENDING can be cancelled",
                transfer_id, record.status
            )));
        }

        if let Err(e) = self.second_factor.invalidate(&transfer_id).await {
            warn!(transfer_id = %transfer_id, error = %e, "Failed to invalidate second factor");
        }

        info!(transfer_id = %transfer_id, "Transfer cancelled");

        Ok(CancelReceipt {
            transfer_id: transfer_id.to_string(),
            status: TransferStatus::Cancelled.as_str(),
        })
    }

    /// Operator/client view of a transfer.
    pub async fn get(&self, transfer_id: TransferId) -> Result<TransferRecord, TransferError> {
        self.store
            .get(&transfer_id)
            .await?
            .ok_or_else(|| TransferError::TransferNotFound(transfer_id.to_string()))
    }
}
