//! bankcore service binary
//!
//! Wires the stores, collaborators and gateway from config. With a
//! `postgres_url` the PostgreSQL stores are used; without one the in-process
//! backend runs with two demo accounts (local development only).

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use bankcore::config::AppConfig;
use bankcore::db::Database;
use bankcore::gateway::{self, AppState};
use bankcore::ledger::{LedgerEngine, MemoryLedger, PgLedger};
use bankcore::locks::{FundLockRegistry, PgFundLockRegistry};
use bankcore::logging::init_logging;
use bankcore::term_deposit::{
    DraftStore, HttpObligationRegistrar, LocalObligationRegistrar, MemoryDepositStore,
    ObligationRegistrar, PgDepositStore, TermDepositService,
};
use bankcore::transfer::{
    AccountValidator, LedgerAccountValidator, LocalSecondFactor, MemoryTransferStore,
    PgTransferStore, SecondFactorService, TransferCoordinator, TransferStore,
    remote::{HttpAccountValidator, HttpSecondFactor},
};

fn get_env() -> String {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("APP_ENV").ok())
        .unwrap_or_else(|| "dev".to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env);
    let _guard = init_logging(&config);

    info!("bankcore starting (env={}, build={})", env, env!("GIT_HASH"));

    // === Stores ===
    let (ledger, locks, transfers_store, drafts): (
        Arc<dyn LedgerEngine>,
        Arc<dyn FundLockRegistry>,
        Arc<dyn TransferStore>,
        Arc<dyn DraftStore>,
    ) = match &config.postgres_url {
        Some(url) => {
            let db = Database::connect(url)
                .await
                .context("connecting to PostgreSQL")?;
            if config.auto_migrate {
                db.ensure_schema().await.context("applying schema")?;
            }
            db.health_check().await.context("database health check")?;
            let pool = db.pool().clone();
            (
                Arc::new(PgLedger::new(pool.clone())),
                Arc::new(PgFundLockRegistry::new(pool.clone())),
                Arc::new(PgTransferStore::new(pool.clone())),
                Arc::new(PgDepositStore::new(pool)),
            )
        }
        None => {
            warn!("No postgres_url configured - running the in-process store");
            let memory = Arc::new(MemoryLedger::new());
            // Demo accounts so the API is usable out of the box
            memory.open_account("1001", "USD", rust_decimal::Decimal::new(100_000, 2));
            memory.open_account("1002", "USD", rust_decimal::Decimal::new(50_000, 2));
            info!("Seeded demo accounts 1001 (1000.00 USD) and 1002 (500.00 USD)");
            (
                memory.clone(),
                memory,
                Arc::new(MemoryTransferStore::new()),
                Arc::new(MemoryDepositStore::new()),
            )
        }
    };

    // === Collaborators ===
    let validator: Arc<dyn AccountValidator> = match &config.collaborators.account_service_url {
        Some(url) => Arc::new(HttpAccountValidator::new(url.clone())),
        None => Arc::new(LedgerAccountValidator::new(ledger.clone())),
    };

    let second_factor: Arc<dyn SecondFactorService> = match &config.collaborators.otp_service_url {
        Some(url) => Arc::new(HttpSecondFactor::new(url.clone())),
        None => {
            warn!("No otp_service_url configured - using the local second-factor stub");
            Arc::new(LocalSecondFactor::new(config.second_factor.ttl_secs))
        }
    };

    let registrar: Arc<dyn ObligationRegistrar> =
        match &config.collaborators.deposit_registrar_url {
            Some(url) => Arc::new(HttpObligationRegistrar::new(url.clone())),
            None => Arc::new(LocalObligationRegistrar),
        };

    // === Coordinators ===
    let transfers = Arc::new(TransferCoordinator::new(
        transfers_store,
        ledger.clone(),
        validator,
        second_factor,
    ));
    let deposits = Arc::new(TermDepositService::new(drafts, locks.clone(), registrar));

    let state = AppState {
        ledger,
        locks,
        transfers,
        deposits,
    };

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Gateway listening on {}", addr);

    axum::serve(listener, gateway::router(state))
        .await
        .context("serving gateway")?;

    Ok(())
}
