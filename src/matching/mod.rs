//! Matching engine (spec.md §4.4), grounded on the teacher's
//! `services::matching::orchestrator::OrderFlowOrchestrator` — one
//! `Arc<Book>` per `book_id` behind a `DashMap`, so `submit` for book A
//! never blocks `submit` for book B (spec.md §5).

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::books::{BookRegistry, RestingOrder};
use crate::contract::ContractRegistry;
use crate::error::{AnomalyLog, MatchingError};
use crate::ledger::Ledger;
use crate::models::account::Field;
use crate::models::match_record::MatchRecord;
use crate::models::order::{Order, OrderType, Side};
use crate::order_store::OrderStore;
use crate::settlement::SettlementService;

pub struct MatchingEngine {
    books: Arc<BookRegistry>,
    ledger: Arc<Ledger>,
    order_store: Arc<OrderStore>,
    contracts: Arc<ContractRegistry>,
    settlement: Arc<SettlementService>,
    anomalies: Arc<AnomalyLog>,
    match_log: DashMap<String, Mutex<Vec<MatchRecord>>>,
}

impl MatchingEngine {
    pub fn new(
        books: Arc<BookRegistry>,
        ledger: Arc<Ledger>,
        order_store: Arc<OrderStore>,
        contracts: Arc<ContractRegistry>,
        settlement: Arc<SettlementService>,
        anomalies: Arc<AnomalyLog>,
    ) -> Self {
        Self { books, ledger, order_store, contracts, settlement, anomalies, match_log: DashMap::new() }
    }

    /// spec.md §4.4's `submit` algorithm. Returns the matches produced
    /// (zero, one, or more under the multi-level loop — see
    /// DESIGN.md's Open Question resolution), or a `MatchingError` for a
    /// synchronous rejection.
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        &self,
        side: Side,
        book_id: &str,
        price: Decimal,
        qty: i64,
        trader: &str,
        order_type: OrderType,
        contract_id: Option<String>,
    ) -> Result<Vec<MatchRecord>, MatchingError> {
        if price <= Decimal::ZERO {
            return Err(MatchingError::BadOrder(format!("price must be positive, got {price}")));
        }
        if qty <= 0 {
            return Err(MatchingError::BadOrder(format!("qty must be positive, got {qty}")));
        }

        let order = Order {
            id: Uuid::new_v4(),
            book_id: book_id.to_string(),
            trader: trader.to_string(),
            side,
            price,
            qty,
            order_type,
            contract_id: contract_id.clone(),
            ts: Utc::now(),
        };
        self.order_store.put(order.clone());
        crate::metrics::record_order_submitted(book_id, &side.to_string());

        if side == Side::Bid {
            if let Err(err) = self.ledger.lock(trader, price * Decimal::from(qty)) {
                self.order_store.remove(order.id);
                crate::metrics::record_ledger_rejection("insufficient_funds");
                return Err(MatchingError::InsufficientFunds(err));
            }
        }

        let book = self.books.get_or_create(book_id);
        // Serializes the whole crossing loop for this book_id (spec.md
        // §5): without this, two concurrent submissions could both peek
        // the same resting order and race into consume_best.
        let _book_guard = book.lock_submissions();
        let mut matches = Vec::new();
        let mut remaining = qty;

        loop {
            let opposite = side.opposite();
            let best = book.peek(opposite);
            let crosses = match &best {
                Some(resting) => match side {
                    Side::Bid => price >= resting.price,
                    Side::Ask => price <= resting.price,
                },
                None => false,
            };
            if !crosses {
                break;
            }
            let resting = best.expect("crosses implies Some");

            if self.order_store.get(resting.id).is_none() {
                error!(book_id, order_id = %resting.id, "book references an order missing from the order store");
                self.anomalies.record(
                    "lost_resting_order",
                    format!("book {book_id} referenced order {} with no record in the order store", resting.id),
                );
                book.remove(resting.id);
                // Unmatched remainder was locked at the original incoming
                // price, not at any prior level's (lower) match price —
                // each level's price-improvement refund already accounts
                // for the difference, so the remainder is always still
                // `price * remaining` in locked funds (spec.md §8).
                self.release_incoming(side, trader, price, remaining);
                return Err(MatchingError::LostRestingOrder(resting.id));
            }

            let match_price = resting.price;
            let match_qty = remaining.min(resting.qty);

            let consumed_order = book
                .consume_best(opposite, match_qty)
                .expect("resting order was just verified present under the book lock");
            debug_assert_eq!(
                consumed_order.id, resting.id,
                "book lock held across peek and consume_best; resting order must not change underneath"
            );
            if consumed_order.qty <= match_qty {
                self.order_store.remove(consumed_order.id);
            }

            let (bid_id, ask_id, bid_trader, ask_trader) = match side {
                Side::Bid => (order.id, consumed_order.id, trader.to_string(), consumed_order.trader.clone()),
                Side::Ask => (consumed_order.id, order.id, consumed_order.trader.clone(), trader.to_string()),
            };

            let record = MatchRecord {
                id: Uuid::new_v4(),
                book_id: book_id.to_string(),
                bid_id,
                ask_id,
                bid_trader,
                ask_trader,
                price: match_price,
                qty: match_qty,
                match_type: order_type,
                contract_id: contract_id.clone(),
                ts: Utc::now(),
            };

            if let Err(err) = self.settlement.dispatch(&record) {
                warn!(match_id = %record.id, %err, "settlement dispatch failed after match was recorded");
            }
            self.match_log.entry(book_id.to_string()).or_default().lock().push(record.clone());
            crate::metrics::record_match(book_id, match_qty);
            matches.push(record);

            if side == Side::Bid && price > match_price {
                let improvement = (price - match_price) * Decimal::from(match_qty);
                self.ledger.release(trader, improvement, "price improvement refund");
            }

            remaining -= match_qty;
            if remaining <= 0 {
                break;
            }
        }

        if remaining > 0 {
            book.insert(
                side,
                RestingOrder { id: order.id, trader: trader.to_string(), price, qty: remaining, ts: order.ts },
            );
        } else {
            self.order_store.remove(order.id);
        }

        if order_type == OrderType::ContractOwnership && side == Side::Bid {
            if let Some(contract_id) = &contract_id {
                if matches.is_empty() {
                    let top = book.peek(Side::Bid);
                    self.contracts.update_owner_from_best_bid(contract_id, top.as_ref().map(|o| o.trader.as_str()));
                }
            }
        }

        Ok(matches)
    }

    fn release_incoming(&self, side: Side, trader: &str, price: Decimal, remaining_qty: i64) {
        if side == Side::Bid {
            self.ledger.release(trader, price * Decimal::from(remaining_qty), "aborted match: lost resting order");
        }
    }

    pub fn match_log(&self, book_id: &str) -> Vec<MatchRecord> {
        self.match_log.get(book_id).map(|v| v.lock().clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::Field as AccField;
    use rust_decimal_macros::dec;

    fn engine() -> (Arc<Ledger>, Arc<OrderStore>, MatchingEngine) {
        let ledger = Arc::new(Ledger::new());
        let books = Arc::new(BookRegistry::new());
        let order_store = Arc::new(OrderStore::new());
        let contracts = Arc::new(ContractRegistry::new());
        let settlement = Arc::new(SettlementService::new(ledger.clone(), contracts.clone(), "Platform", dec!(0.01)));
        let anomalies = Arc::new(crate::error::AnomalyLog::new());
        let engine =
            MatchingEngine::new(books, ledger.clone(), order_store.clone(), contracts, settlement, anomalies);
        (ledger, order_store, engine)
    }

    #[test]
    fn empty_ask_bid_rests_and_locks_funds() {
        let (ledger, _order_store, engine) = engine();
        ledger.credit("T1", dec!(1000), AccField::Available);

        let matches = engine
            .submit(Side::Bid, "L1_C1", dec!(100), 1, "T1", OrderType::LegFreight, Some("C1".into()))
            .unwrap();

        assert!(matches.is_empty());
        let bal = ledger.balance("T1");
        assert_eq!(bal.available, dec!(900));
        assert_eq!(bal.locked, dec!(100));
    }

    #[test]
    fn immediate_cross_applies_price_improvement_refund() {
        let (ledger, _order_store, engine) = engine();
        ledger.credit("T2", dec!(0), AccField::Available);
        ledger.credit("T1", dec!(1000), AccField::Available);

        engine.submit(Side::Ask, "L1_C1", dec!(80), 1, "T2", OrderType::LegFreight, Some("C1".into())).unwrap();
        let matches = engine
            .submit(Side::Bid, "L1_C1", dec!(100), 1, "T1", OrderType::LegFreight, Some("C1".into()))
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].price, dec!(80));
        let t1 = ledger.balance("T1");
        assert_eq!(t1.available, dec!(920));
        assert_eq!(t1.locked, dec!(0));
    }

    #[test]
    fn partial_fill_reduces_resting_order_and_keeps_remainder_resting() {
        let (ledger, _order_store, engine) = engine();
        ledger.credit("T2", dec!(0), AccField::Available);
        ledger.credit("T1", dec!(300), AccField::Available);

        engine.submit(Side::Ask, "L1_C1", dec!(10), 50, "T2", OrderType::LegFreight, Some("C1".into())).unwrap();
        let matches = engine
            .submit(Side::Bid, "L1_C1", dec!(10), 30, "T1", OrderType::LegFreight, Some("C1".into()))
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].qty, 30);
        assert_eq!(ledger.balance("T2").available, dec!(297));
    }

    #[test]
    fn rejects_non_positive_price_without_mutating_state() {
        let (ledger, _order_store, engine) = engine();
        ledger.credit("T1", dec!(100), AccField::Available);
        let err = engine
            .submit(Side::Bid, "L1_C1", dec!(0), 1, "T1", OrderType::LegFreight, None)
            .unwrap_err();
        assert!(matches!(err, MatchingError::BadOrder(_)));
        assert_eq!(ledger.balance("T1").available, dec!(100));
    }

    #[test]
    fn insufficient_funds_rejects_and_deletes_partial_order() {
        let (_ledger, _order_store, engine) = engine();
        let err = engine
            .submit(Side::Bid, "L1_C1", dec!(100), 1, "Poor", OrderType::LegFreight, None)
            .unwrap_err();
        assert!(matches!(err, MatchingError::InsufficientFunds(_)));
    }

    /// A lost resting order hit on the *second* level of a multi-level
    /// match must release the unmatched remainder at the original
    /// incoming price, not at the first level's (lower) match price —
    /// otherwise the cumulative price-improvement refund already paid out
    /// on level one leaves a shortfall permanently stranded in `locked`.
    #[test]
    fn lost_resting_order_on_a_later_level_releases_at_original_price_not_last_match_price() {
        let ledger = Arc::new(Ledger::new());
        let books = Arc::new(BookRegistry::new());
        let order_store = Arc::new(OrderStore::new());
        let contracts = Arc::new(ContractRegistry::new());
        let settlement = Arc::new(SettlementService::new(ledger.clone(), contracts.clone(), "Platform", dec!(0.01)));
        let anomalies = Arc::new(crate::error::AnomalyLog::new());
        let engine = MatchingEngine::new(
            books.clone(),
            ledger.clone(),
            order_store.clone(),
            contracts,
            settlement,
            anomalies,
        );

        engine.submit(Side::Ask, "L1_C1", dec!(80), 1, "T2a", OrderType::LegFreight, Some("C1".into())).unwrap();
        engine.submit(Side::Ask, "L1_C1", dec!(90), 1, "T2b", OrderType::LegFreight, Some("C1".into())).unwrap();

        // Desync the book from the order store for the second (worse-
        // price) resting ask, simulating a lost record.
        let book = books.get("L1_C1").unwrap();
        let second_level_id = book.snapshot().asks[1].order_id;
        order_store.remove(second_level_id);

        ledger.credit("T1", dec!(1000), AccField::Available);
        let err = engine
            .submit(Side::Bid, "L1_C1", dec!(100), 2, "T1", OrderType::LegFreight, Some("C1".into()))
            .unwrap_err();
        assert!(matches!(err, MatchingError::LostRestingOrder(_)));

        // Level one matched 1@80 (hold amount 80 stays locked pending
        // delivery, the 20 price-improvement refund goes to available).
        // Level two aborted: the other unit's remainder was locked at the
        // original price of 100, not at level one's match price of 80.
        let t1 = ledger.balance("T1");
        assert_eq!(t1.available, dec!(920));
        assert_eq!(t1.locked, dec!(80));
        assert_eq!(t1.available + t1.locked, dec!(1000));
    }
}
