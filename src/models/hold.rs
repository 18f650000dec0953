//! Settlement hold — deferred freight settlement, pending a delivery
//! event (spec.md §3/§4.5).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldStatus {
    PendingDelivery,
    Settled,
    /// spec.md §7: a hold whose settlement debit failed even though the
    /// invariant says it should have been impossible. Flagged for operator
    /// review; siblings still settle.
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementHold {
    pub match_id: Uuid,
    pub leg_id: String,
    pub contract_id: String,
    pub amount: Decimal,
    pub payer: String,
    pub payee: String,
    pub status: HoldStatus,
}
