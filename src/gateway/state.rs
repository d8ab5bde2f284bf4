//! Gateway shared state

use std::sync::Arc;

use crate::ledger::LedgerEngine;
use crate::locks::FundLockRegistry;
use crate::term_deposit::TermDepositService;
use crate::transfer::TransferCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerEngine>,
    pub locks: Arc<dyn FundLockRegistry>,
    pub transfers: Arc<TransferCoordinator>,
    pub deposits: Arc<TermDepositService>,
}
