//! Settlement (spec.md §4.5): immediate for `CONTRACT_OWNERSHIP` matches,
//! deferred (hold-based) for `LEG_FREIGHT` matches, grounded on the
//! teacher's `services::settlement::SettlementService` — generalized
//! from prediction-market share redemption to freight-hold settlement.

use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::contract::{parse_leg_book_id, ContractRegistry};
use crate::error::{AnomalyLog, SettlementError};
use crate::ledger::Ledger;
use crate::models::account::Field;
use crate::models::hold::{HoldStatus, SettlementHold};
use crate::models::match_record::MatchRecord;
use crate::models::order::OrderType;

/// Holds are append-only; settled ones are pruned only from the
/// `(leg_id, contract_id)` pending index (spec.md §9), not from the store.
#[derive(Default)]
struct HoldStore {
    holds: DashMap<Uuid, Mutex<SettlementHold>>,
    pending_by_leg: DashMap<(String, String), Mutex<Vec<Uuid>>>,
}

impl HoldStore {
    fn insert(&self, hold: SettlementHold) {
        let key = (hold.leg_id.clone(), hold.contract_id.clone());
        let id = hold.match_id;
        self.holds.insert(id, Mutex::new(hold));
        self.pending_by_leg.entry(key).or_default().lock().push(id);
    }

    fn pending_for(&self, leg_id: &str, contract_id: &str) -> Vec<Uuid> {
        self.pending_by_leg
            .get(&(leg_id.to_string(), contract_id.to_string()))
            .map(|ids| ids.lock().clone())
            .unwrap_or_default()
    }

    fn clear_pending(&self, leg_id: &str, contract_id: &str) {
        self.pending_by_leg.remove(&(leg_id.to_string(), contract_id.to_string()));
    }

    fn get(&self, id: Uuid) -> Option<SettlementHold> {
        self.holds.get(&id).map(|h| h.lock().clone())
    }

    fn all(&self) -> Vec<SettlementHold> {
        self.holds.iter().map(|r| r.value().lock().clone()).collect()
    }
}

pub struct SettlementService {
    ledger: std::sync::Arc<Ledger>,
    contracts: std::sync::Arc<ContractRegistry>,
    holds: HoldStore,
    platform_trader_id: String,
    platform_fee_rate: Decimal,
    anomalies: std::sync::Arc<AnomalyLog>,
}

impl SettlementService {
    pub fn new(
        ledger: std::sync::Arc<Ledger>,
        contracts: std::sync::Arc<ContractRegistry>,
        platform_trader_id: impl Into<String>,
        platform_fee_rate: Decimal,
    ) -> Self {
        Self::with_anomaly_log(ledger, contracts, platform_trader_id, platform_fee_rate, std::sync::Arc::new(AnomalyLog::new()))
    }

    pub fn with_anomaly_log(
        ledger: std::sync::Arc<Ledger>,
        contracts: std::sync::Arc<ContractRegistry>,
        platform_trader_id: impl Into<String>,
        platform_fee_rate: Decimal,
        anomalies: std::sync::Arc<AnomalyLog>,
    ) -> Self {
        Self {
            ledger,
            contracts,
            holds: HoldStore::default(),
            platform_trader_id: platform_trader_id.into(),
            platform_fee_rate,
            anomalies,
        }
    }

    /// spec.md §4.5 immediate branch. `m.price` is the match price
    /// (resting order's price, per §4.4's price-time-priority rule), so
    /// `amount` here is already the traded amount, not the incoming
    /// bidder's original limit price.
    pub fn settle_ownership_match(&self, m: &MatchRecord) -> Result<(), SettlementError> {
        let amount = m.price * Decimal::from(m.qty);
        let fee = amount * self.platform_fee_rate;
        let payout = amount - fee;

        self.ledger.debit(&m.bid_trader, amount, Field::Locked)?;
        self.ledger.credit(&m.ask_trader, payout, Field::Available);
        self.ledger.credit(&self.platform_trader_id, fee, Field::Available);

        if let Some(contract_id) = &m.contract_id {
            self.contracts.set_current_owner(contract_id, &m.bid_trader);
            self.contracts.advance_contract_status(contract_id);
        }

        info!(match_id = %m.id, %amount, %fee, "ownership match settled immediately");
        Ok(())
    }

    /// spec.md §4.5 deferred branch: no balance change until delivery.
    /// Also the "note in-transit" trigger spec.md §4.6 calls for — the
    /// freight match itself is what names the winning carrier and the
    /// agreed cost, so the leg advances to `IN_TRANSIT` here.
    pub fn open_freight_hold(&self, m: &MatchRecord) -> Result<(), SettlementError> {
        let (leg_id, contract_id) = parse_leg_book_id(&m.book_id)
            .ok_or_else(|| SettlementError::UnknownLeg { leg_id: m.book_id.clone(), contract_id: String::new() })?;
        let amount = m.price * Decimal::from(m.qty);
        self.contracts.record_leg_win(&leg_id, m.ask_trader.clone(), amount);
        self.holds.insert(SettlementHold {
            match_id: m.id,
            leg_id,
            contract_id,
            amount,
            payer: m.bid_trader.clone(),
            payee: m.ask_trader.clone(),
            status: HoldStatus::PendingDelivery,
        });
        Ok(())
    }

    /// On a delivery IoT event for `(leg_id, contract_id)`: settle every
    /// still-pending hold independently. A per-hold failure is recorded
    /// on that hold and does not roll back siblings (spec.md §7).
    pub fn on_delivery(&self, leg_id: &str, contract_id: &str) {
        let pending = self.holds.pending_for(leg_id, contract_id);
        if pending.is_empty() {
            // Idempotent replay: nothing left pending for this leg.
            return;
        }

        for hold_id in pending {
            let Some(hold) = self.holds.get(hold_id) else { continue };
            if hold.status != HoldStatus::PendingDelivery {
                continue;
            }
            match self.settle_hold(&hold) {
                Ok(()) => {
                    if let Some(entry) = self.holds.holds.get(&hold_id) {
                        entry.lock().status = HoldStatus::Settled;
                    }
                }
                Err(err) => {
                    error!(hold_id = %hold_id, %err, "hold settlement failed; marking for operator review");
                    self.anomalies.record(
                        "partial_settlement_failure",
                        format!("hold {hold_id} for leg {leg_id}/{contract_id} failed to settle: {err}"),
                    );
                    if let Some(entry) = self.holds.holds.get(&hold_id) {
                        entry.lock().status = HoldStatus::Error;
                    }
                }
            }
        }

        self.holds.clear_pending(leg_id, contract_id);
        self.contracts.mark_leg_settled(leg_id);
        self.contracts.release_escrow_if_final(&self.ledger, contract_id);
    }

    fn settle_hold(&self, hold: &SettlementHold) -> Result<(), SettlementError> {
        let fee = hold.amount * self.platform_fee_rate;
        let payout = hold.amount - fee;
        self.ledger.debit(&hold.payer, hold.amount, Field::Locked)?;
        self.ledger.credit(&hold.payee, payout, Field::Available);
        self.ledger.credit(&self.platform_trader_id, fee, Field::Available);
        Ok(())
    }

    pub fn holds_snapshot(&self) -> Vec<SettlementHold> {
        self.holds.all()
    }

    pub fn dispatch(&self, m: &MatchRecord) -> Result<(), SettlementError> {
        match m.match_type {
            OrderType::ContractOwnership => self.settle_ownership_match(m),
            OrderType::LegFreight => self.open_freight_hold(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::Field as AccField;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn settlement() -> (Arc<Ledger>, Arc<ContractRegistry>, SettlementService) {
        let ledger = Arc::new(Ledger::new());
        let contracts = Arc::new(ContractRegistry::new());
        let svc =
            SettlementService::new(ledger.clone(), contracts.clone(), "Platform", dec!(0.01));
        (ledger, contracts, svc)
    }

    fn record(book_id: &str, match_type: OrderType, contract_id: Option<&str>, price: Decimal, qty: i64) -> MatchRecord {
        MatchRecord {
            id: Uuid::new_v4(),
            book_id: book_id.into(),
            bid_id: Uuid::new_v4(),
            ask_id: Uuid::new_v4(),
            bid_trader: "WealthyCorp".into(),
            ask_trader: "ShipperA".into(),
            price,
            qty,
            match_type,
            contract_id: contract_id.map(String::from),
            ts: Utc::now(),
        }
    }

    #[test]
    fn ownership_match_settles_immediately_with_fee_split() {
        let (ledger, contracts, svc) = settlement();
        ledger.credit("WealthyCorp", dec!(1450), AccField::Locked);
        contracts
            .create_contract(&ledger, "C1", "40ft", "A", "B", "ShipperA", dec!(0), Utc::now(), None)
            .unwrap();

        let m = record("contract:C1", OrderType::ContractOwnership, Some("C1"), dec!(1450), 1);
        svc.settle_ownership_match(&m).unwrap();

        assert_eq!(ledger.balance("WealthyCorp").locked, dec!(0));
        assert_eq!(ledger.balance("ShipperA").available, dec!(1435.50));
        assert_eq!(ledger.balance("Platform").available, dec!(14.50));
        assert_eq!(contracts.get_contract("C1").unwrap().current_owner, "WealthyCorp");
    }

    #[test]
    fn freight_hold_settles_on_delivery_and_is_idempotent() {
        let (ledger, contracts, svc) = settlement();
        ledger.credit("ShipperA", dec!(7800), AccField::Locked);
        contracts
            .create_contract(&ledger, "C1", "40ft", "A", "B", "ShipperA", dec!(0), Utc::now(), None)
            .unwrap();
        contracts.add_leg("L1", "C1", "A", "B");

        let mut m = record("L1_C1", OrderType::LegFreight, Some("C1"), dec!(7800), 1);
        m.bid_trader = "ShipperA".into();
        m.ask_trader = "Maersk".into();
        svc.open_freight_hold(&m).unwrap();

        assert_eq!(ledger.balance("ShipperA").locked, dec!(7800));
        assert_eq!(ledger.balance("Maersk").available, dec!(0));

        svc.on_delivery("L1", "C1");
        assert_eq!(ledger.balance("ShipperA").locked, dec!(0));
        assert_eq!(ledger.balance("Maersk").available, dec!(7722));
        assert_eq!(ledger.balance("Platform").available, dec!(78));
        assert_eq!(contracts.get_leg("L1").unwrap().status, crate::models::contract::LegStatus::Settled);

        // Replaying is a no-op: nothing left pending.
        svc.on_delivery("L1", "C1");
        assert_eq!(ledger.balance("Maersk").available, dec!(7722));
    }
}
