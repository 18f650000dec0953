//! The mutable "world": every piece of state that `/reset` wipes. Bundled
//! behind one `Arc` so a reset can atomically swap the whole thing out
//! from under the scheduler and API handlers without per-subsystem
//! coordination — the way the teacher swaps nothing (it persists to
//! Postgres/Redis instead), but the equivalent idiomatic move for an
//! in-memory backing store is a single swappable snapshot.

use std::sync::Arc;

use crate::books::BookRegistry;
use crate::config::AppConfig;
use crate::contract::ContractRegistry;
use crate::error::AnomalyLog;
use crate::ledger::Ledger;
use crate::matching::MatchingEngine;
use crate::order_store::OrderStore;
use crate::settlement::SettlementService;

pub struct World {
    pub ledger: Arc<Ledger>,
    pub order_store: Arc<OrderStore>,
    pub books: Arc<BookRegistry>,
    pub contracts: Arc<ContractRegistry>,
    pub settlement: Arc<SettlementService>,
    pub engine: Arc<MatchingEngine>,
    /// `/reset` wipes this along with everything else — the anomaly log
    /// is diagnostic about the run in progress, not a durable audit trail
    /// (persistence/recovery across restarts is out of scope, spec.md §1).
    pub anomalies: Arc<AnomalyLog>,
}

impl World {
    pub fn fresh(config: &AppConfig) -> Arc<World> {
        let ledger = Arc::new(Ledger::new());
        let order_store = Arc::new(OrderStore::new());
        let books = Arc::new(BookRegistry::new());
        let contracts = Arc::new(ContractRegistry::new());
        let anomalies = Arc::new(AnomalyLog::new());
        let settlement = Arc::new(SettlementService::with_anomaly_log(
            ledger.clone(),
            contracts.clone(),
            config.platform_trader_id.clone(),
            config.platform_fee_rate,
            anomalies.clone(),
        ));
        let engine = Arc::new(MatchingEngine::new(
            books.clone(),
            ledger.clone(),
            order_store.clone(),
            contracts.clone(),
            settlement.clone(),
            anomalies.clone(),
        ));
        Arc::new(World { ledger, order_store, books, contracts, settlement, engine, anomalies })
    }
}
