//! Contract / leg lifecycle state machine (spec.md §4.6), single-writer
//! (the scheduler) with many readers — settlement only ever touches
//! leg/hold status, never the contract's own `status`/`current_owner`
//! fields except through the two methods below that settlement calls.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::models::account::Field;
use crate::models::contract::{Contract, ContractStatus, Leg, LegStatus};

/// `book_id` for a leg is `<leg_id>_<contract_id>`; split back out on the
/// settlement path where only the book id travels with a match record.
pub fn parse_leg_book_id(book_id: &str) -> Option<(String, String)> {
    book_id.rsplit_once('_').map(|(leg, contract)| (leg.to_string(), contract.to_string()))
}

#[derive(Default)]
pub struct ContractRegistry {
    contracts: DashMap<String, RwLock<Contract>>,
    legs: DashMap<String, RwLock<Leg>>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks `max_prepaid_cost` from the shipper's available balance
    /// (spec.md §4.6) and registers the contract in `BOOKED`.
    pub fn create_contract(
        &self,
        ledger: &Ledger,
        id: impl Into<String>,
        contract_type: impl Into<String>,
        origin: impl Into<String>,
        final_destination: impl Into<String>,
        initial_shipper: impl Into<String>,
        max_prepaid_cost: Decimal,
        creation_ts: DateTime<Utc>,
        final_eta_ts: Option<DateTime<Utc>>,
    ) -> Result<Contract, LedgerError> {
        let id = id.into();
        let initial_shipper = initial_shipper.into();
        ledger.lock(&initial_shipper, max_prepaid_cost)?;
        let contract = Contract {
            id: id.clone(),
            contract_type: contract_type.into(),
            origin: origin.into(),
            final_destination: final_destination.into(),
            initial_shipper: initial_shipper.clone(),
            current_owner: initial_shipper,
            status: ContractStatus::Booked,
            max_prepaid_cost,
            creation_ts,
            final_eta_ts,
        };
        self.contracts.insert(id, RwLock::new(contract.clone()));
        Ok(contract)
    }

    pub fn add_leg(
        &self,
        leg_id: impl Into<String>,
        contract_id: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
    ) -> Leg {
        let leg = Leg {
            leg_id: leg_id.into(),
            contract_id: contract_id.into(),
            origin: origin.into(),
            destination: destination.into(),
            status: LegStatus::PendingAuction,
            carrier: None,
            freight_cost: None,
            start_sim_time: None,
            eta_duration: None,
        };
        self.legs.insert(leg.leg_id.clone(), RwLock::new(leg.clone()));
        leg
    }

    pub fn get_contract(&self, id: &str) -> Option<Contract> {
        self.contracts.get(id).map(|r| r.read().clone())
    }

    pub fn get_leg(&self, leg_id: &str) -> Option<Leg> {
        self.legs.get(leg_id).map(|r| r.read().clone())
    }

    /// All legs belonging to `contract_id`, for streaming IoT progress
    /// (SPEC_FULL.md §6). Small per-contract scan; legs number in the
    /// single digits for any one contract.
    pub fn legs_for_contract(&self, contract_id: &str) -> Vec<Leg> {
        self.legs.iter().map(|r| r.read().clone()).filter(|leg| leg.contract_id == contract_id).collect()
    }

    pub fn set_leg_status(&self, leg_id: &str, status: LegStatus) {
        if let Some(leg) = self.legs.get(leg_id) {
            leg.write().status = status;
        }
    }

    pub fn open_leg_auction(&self, leg_id: &str, start_sim_time: u64) {
        if let Some(leg) = self.legs.get(leg_id) {
            let mut leg = leg.write();
            leg.status = LegStatus::AuctionOpen;
            leg.start_sim_time = Some(start_sim_time);
        }
    }

    pub fn record_leg_win(&self, leg_id: &str, carrier: impl Into<String>, freight_cost: Decimal) {
        if let Some(leg) = self.legs.get(leg_id) {
            let mut leg = leg.write();
            leg.carrier = Some(carrier.into());
            leg.freight_cost = Some(freight_cost);
            leg.status = LegStatus::InTransit;
        }
    }

    pub fn advance_contract_status(&self, contract_id: &str) {
        if let Some(contract) = self.contracts.get(contract_id) {
            let mut contract = contract.write();
            if let Some(next) = contract.status.next() {
                debug!(contract_id, from = ?contract.status, to = ?next, "contract status advanced");
                contract.status = next;
            }
        }
    }

    /// Called from the immediate (`CONTRACT_OWNERSHIP`) settlement path
    /// (spec.md §4.5): the winning bidder becomes the owner of record.
    pub fn set_current_owner(&self, contract_id: &str, trader: impl Into<String>) {
        if let Some(contract) = self.contracts.get(contract_id) {
            contract.write().current_owner = trader.into();
        }
    }

    /// Called after a bid rests on a `CONTRACT_OWNERSHIP` book without
    /// matching (spec.md §4.4's ownership side-effect): ownership tracks
    /// whoever is currently the highest bidder, even with no trade.
    pub fn update_owner_from_best_bid(&self, contract_id: &str, top_bidder: Option<&str>) {
        if let (Some(contract), Some(trader)) = (self.contracts.get(contract_id), top_bidder) {
            contract.write().current_owner = trader.to_string();
        }
    }

    /// spec.md §4.6: on `DELIVERED_FINAL`, release any residual escrow
    /// locked at contract creation back to the shipper. The prepaid
    /// escrow is never drawn from directly — each leg's freight is paid
    /// through its own independent lock/settlement cycle — so the whole
    /// amount is released.
    pub fn release_escrow_if_final(&self, ledger: &Ledger, contract_id: &str) {
        if let Some(contract) = self.contracts.get(contract_id) {
            let contract = contract.read();
            if contract.status.is_terminal() {
                ledger.release(&contract.initial_shipper, contract.max_prepaid_cost, "contract delivered final");
            }
        }
    }

    pub fn mark_leg_settled(&self, leg_id: &str) {
        self.set_leg_status(leg_id, LegStatus::Settled);
    }

    pub fn mark_leg_delivered(&self, leg_id: &str) {
        self.set_leg_status(leg_id, LegStatus::Delivered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_leg_book_id_splits_on_last_underscore() {
        let (leg, contract) = parse_leg_book_id("L1_C1").unwrap();
        assert_eq!(leg, "L1");
        assert_eq!(contract, "C1");
    }

    #[test]
    fn create_contract_locks_prepaid_escrow_from_shipper() {
        let ledger = Ledger::new();
        ledger.credit("ShipperA", dec!(20000), Field::Available);
        let registry = ContractRegistry::new();
        let contract = registry
            .create_contract(
                &ledger,
                "C1",
                "40ft_STD_USE",
                "SHZ",
                "RTM",
                "ShipperA",
                dec!(15000),
                Utc::now(),
                None,
            )
            .unwrap();

        assert_eq!(contract.current_owner, "ShipperA");
        let bal = ledger.balance("ShipperA");
        assert_eq!(bal.available, dec!(5000));
        assert_eq!(bal.locked, dec!(15000));
    }

    #[test]
    fn release_escrow_if_final_only_fires_at_terminal_status() {
        let ledger = Ledger::new();
        ledger.credit("ShipperA", dec!(1000), Field::Available);
        let registry = ContractRegistry::new();
        registry
            .create_contract(&ledger, "C1", "40ft", "A", "B", "ShipperA", dec!(500), Utc::now(), None)
            .unwrap();

        registry.release_escrow_if_final(&ledger, "C1");
        assert_eq!(ledger.balance("ShipperA").locked, dec!(500));

        for _ in 0..9 {
            registry.advance_contract_status("C1");
        }
        registry.release_escrow_if_final(&ledger, "C1");
        assert_eq!(ledger.balance("ShipperA").locked, dec!(0));
    }
}
