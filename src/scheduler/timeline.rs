//! Scripted timeline (spec.md §4.7), grounded in
//! `original_source/backend/app/seed.py`'s script beats, reproduced
//! beat-for-beat as the default scenario. The scheduler itself is
//! generic over any `Vec<(u64, Action)>` — this is just the one shipped
//! as the default.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::order::{OrderType, Side};

/// A single scripted step. Mirrors the original's actions (`fund`,
/// `submit_order`, `xadd("iot", ...)`) without back-references into the
/// scheduler itself — execution is a free function over a `SchedulerContext`.
#[derive(Debug, Clone)]
pub enum Action {
    FundAccount { trader: String, amount: Decimal },
    CreateContract {
        id: String,
        contract_type: String,
        origin: String,
        final_destination: String,
        initial_shipper: String,
        max_prepaid_cost: Decimal,
    },
    AddLeg { leg_id: String, contract_id: String, origin: String, destination: String },
    OpenLegAuction { leg_id: String },
    SubmitOrder {
        side: Side,
        book_id: String,
        price: Decimal,
        qty: i64,
        trader: String,
        order_type: OrderType,
        contract_id: Option<String>,
    },
    DeliverLeg { leg_id: String, contract_id: String },
    Log(String),
}

pub struct Timeline {
    pub entries: Vec<(u64, Action)>,
}

impl Timeline {
    const CARRIERS: [&'static str; 5] = ["Maersk", "Evergreen", "COSCO", "MSC", "Hapag"];
    const CONTRACT_ID: &'static str = "C1";
    const SHIPPER: &'static str = "ShipperA";

    fn submit(t: u64, side: Side, book_id: &str, price: Decimal, qty: i64, trader: &str, order_type: OrderType, contract_id: Option<&str>) -> (u64, Action) {
        (
            t,
            Action::SubmitOrder {
                side,
                book_id: book_id.to_string(),
                price,
                qty,
                trader: trader.to_string(),
                order_type,
                contract_id: contract_id.map(String::from),
            },
        )
    }

    /// The reference scenario shipped as the default simulation script,
    /// matching `original_source/backend/app/seed.py` second for second.
    pub fn reference_scenario() -> Self {
        let mut entries = Vec::new();

        entries.push((
            0,
            Action::FundAccount { trader: Self::SHIPPER.to_string(), amount: dec!(20000) },
        ));
        entries.push((
            0,
            Action::CreateContract {
                id: Self::CONTRACT_ID.to_string(),
                contract_type: "40ft_STD_USE".to_string(),
                origin: "SHZ".to_string(),
                final_destination: "DUB".to_string(),
                initial_shipper: Self::SHIPPER.to_string(),
                max_prepaid_cost: dec!(15400),
            },
        ));

        let legs = [
            ("L1", "SHZ", "RTM", dec!(8000)),
            ("L2", "RTM", "HAM", dec!(4000)),
            ("L3", "HAM", "DUB", dec!(2000)),
        ];
        for (leg_id, origin, destination, base) in legs {
            entries.push((
                0,
                Action::AddLeg {
                    leg_id: leg_id.to_string(),
                    contract_id: Self::CONTRACT_ID.to_string(),
                    origin: origin.to_string(),
                    destination: destination.to_string(),
                },
            ));
            entries.push((0, Action::OpenLegAuction { leg_id: leg_id.to_string() }));
            let book_id = format!("{leg_id}_{}", Self::CONTRACT_ID);
            for (i, carrier) in Self::CARRIERS.iter().enumerate() {
                let price = base - Decimal::from(i as i64) * dec!(500);
                entries.push(Self::submit(0, Side::Ask, &book_id, price, 1, carrier, OrderType::LegFreight, Some(Self::CONTRACT_ID)));
            }
        }

        // +10s: ShipperA bids L1 at 8000, matches Maersk's 8000 ask.
        entries.push(Self::submit(10, Side::Bid, "L1_C1", dec!(8000), 1, Self::SHIPPER, OrderType::LegFreight, Some(Self::CONTRACT_ID)));

        // +25s: L1 delivered.
        entries.push((25, Action::DeliverLeg { leg_id: "L1".to_string(), contract_id: Self::CONTRACT_ID.to_string() }));

        // +30s: two bids for container ownership.
        entries.push(Self::submit(30, Side::Bid, "contract:C1", dec!(1000), 1, "CheapLtd", OrderType::ContractOwnership, Some(Self::CONTRACT_ID)));
        entries.push(Self::submit(30, Side::Bid, "contract:C1", dec!(1200), 1, "FastPLC", OrderType::ContractOwnership, Some(Self::CONTRACT_ID)));

        // +40s: WealthyCorp outbids everyone.
        entries.push(Self::submit(40, Side::Bid, "contract:C1", dec!(1500), 1, "WealthyCorp", OrderType::ContractOwnership, Some(Self::CONTRACT_ID)));

        // +55s: ShipperA bids L2.
        entries.push(Self::submit(55, Side::Bid, "L2_C1", dec!(4000), 1, Self::SHIPPER, OrderType::LegFreight, Some(Self::CONTRACT_ID)));

        // +70s: L2 and L3 delivered.
        entries.push((70, Action::DeliverLeg { leg_id: "L2".to_string(), contract_id: Self::CONTRACT_ID.to_string() }));
        entries.push((70, Action::DeliverLeg { leg_id: "L3".to_string(), contract_id: Self::CONTRACT_ID.to_string() }));

        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_scenario_is_sorted_by_sim_time() {
        let timeline = Timeline::reference_scenario();
        let mut last = 0;
        for (t, _) in &timeline.entries {
            assert!(*t >= last);
            last = *t;
        }
    }

    #[test]
    fn reference_scenario_preloads_fifteen_carrier_asks() {
        let timeline = Timeline::reference_scenario();
        let ask_count = timeline
            .entries
            .iter()
            .filter(|(_, a)| matches!(a, Action::SubmitOrder { side: Side::Ask, .. }))
            .count();
        assert_eq!(ask_count, 15);
    }
}
