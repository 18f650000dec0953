//! Container contract / leg lifecycle (spec.md §3/§4.6).
//!
//! Unidirectional ownership per spec.md §9: a `Contract` owns its `Leg`s;
//! legs reference their contract by id only, never by back-pointer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The ten-state contract DAG from spec.md §4.6. Linear in this build —
/// no branching — so `next()` is total except at the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Booked,
    AuctioningL1,
    InTransitL1,
    DeliveredL1AwaitingL2,
    AuctioningL2,
    InTransitL2,
    DeliveredL2AwaitingL3,
    AuctioningL3,
    InTransitL3,
    DeliveredFinal,
}

impl ContractStatus {
    /// Advance one step along the DAG; `None` once `DeliveredFinal`.
    pub fn next(self) -> Option<ContractStatus> {
        use ContractStatus::*;
        Some(match self {
            Booked => AuctioningL1,
            AuctioningL1 => InTransitL1,
            InTransitL1 => DeliveredL1AwaitingL2,
            DeliveredL1AwaitingL2 => AuctioningL2,
            AuctioningL2 => InTransitL2,
            InTransitL2 => DeliveredL2AwaitingL3,
            DeliveredL2AwaitingL3 => AuctioningL3,
            AuctioningL3 => InTransitL3,
            InTransitL3 => DeliveredFinal,
            DeliveredFinal => return None,
        })
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ContractStatus::DeliveredFinal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegStatus {
    PendingAuction,
    AuctionOpen,
    InTransit,
    Delivered,
    Settled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    /// Descriptive only; carried forward from the original scenario data
    /// (SPEC_FULL.md §4.6) — does not participate in any invariant.
    pub contract_type: String,
    pub origin: String,
    pub final_destination: String,
    pub initial_shipper: String,
    pub current_owner: String,
    pub status: ContractStatus,
    pub max_prepaid_cost: Decimal,
    pub creation_ts: DateTime<Utc>,
    pub final_eta_ts: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leg {
    pub leg_id: String,
    pub contract_id: String,
    pub origin: String,
    pub destination: String,
    pub status: LegStatus,
    pub carrier: Option<String>,
    pub freight_cost: Option<Decimal>,
    pub start_sim_time: Option<u64>,
    pub eta_duration: Option<u64>,
}

impl Leg {
    /// spec.md §6: `book_id` for a leg is `<leg_id>_<contract_id>`.
    pub fn book_id(&self) -> String {
        format!("{}_{}", self.leg_id, self.contract_id)
    }
}

/// spec.md §6: `book_id` for an ownership book is `contract:<contract_id>`.
pub fn ownership_book_id(contract_id: &str) -> String {
    format!("contract:{}", contract_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_dag_is_linear_and_terminates() {
        let mut status = ContractStatus::Booked;
        let mut steps = 0;
        while let Some(next) = status.next() {
            status = next;
            steps += 1;
            assert!(steps <= 9, "DAG should have exactly 9 transitions");
        }
        assert_eq!(status, ContractStatus::DeliveredFinal);
        assert!(status.is_terminal());
    }

    #[test]
    fn leg_book_id_matches_spec_shape() {
        let leg = Leg {
            leg_id: "L1".into(),
            contract_id: "C1".into(),
            origin: "SHZ".into(),
            destination: "RTM".into(),
            status: LegStatus::PendingAuction,
            carrier: None,
            freight_cost: None,
            start_sim_time: None,
            eta_duration: None,
        };
        assert_eq!(leg.book_id(), "L1_C1");
        assert_eq!(ownership_book_id("C1"), "contract:C1");
    }
}
