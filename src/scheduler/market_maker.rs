//! Market-maker policy (spec.md §4.7): posts a bid/ask pair around a
//! reference price — the book's current best ask if one rests, else a
//! per-book configured default. Offsets are parameters. This is a
//! standalone capability the timeline can invoke per scripted tick; the
//! shipped reference scenario does not call it (the original script
//! preloads static carrier asks instead), but it is exercised directly
//! in the tests below and is available to any custom timeline.

use rust_decimal::Decimal;

use crate::books::BookRegistry;
use crate::error::MatchingError;
use crate::matching::MatchingEngine;
use crate::models::match_record::MatchRecord;
use crate::models::order::{OrderType, Side};

/// spec.md §4.7: reference price is the book's current best ask if one
/// rests, otherwise the per-book configured default.
pub fn reference_price(books: &BookRegistry, book_id: &str, default: Decimal) -> Decimal {
    books.get(book_id).ok().and_then(|b| b.best_ask()).unwrap_or(default)
}

/// Submits a bid and an ask around `reference` offset by the configured
/// margins, on behalf of `trader`. Both legs are independent `submit`
/// calls — a market-maker order can itself cross and match like any
/// other order.
pub fn quote(
    engine: &MatchingEngine,
    book_id: &str,
    trader: &str,
    order_type: OrderType,
    contract_id: Option<String>,
    reference: Decimal,
    bid_offset: Decimal,
    ask_offset: Decimal,
    qty: i64,
) -> Result<(Vec<MatchRecord>, Vec<MatchRecord>), MatchingError> {
    let bid_price = reference - bid_offset;
    let ask_price = reference + ask_offset;

    let bid_matches = engine.submit(Side::Bid, book_id, bid_price, qty, trader, order_type, contract_id.clone())?;
    let ask_matches = engine.submit(Side::Ask, book_id, ask_price, qty, trader, order_type, contract_id)?;

    Ok((bid_matches, ask_matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractRegistry;
    use crate::ledger::Ledger;
    use crate::models::account::Field;
    use crate::order_store::OrderStore;
    use crate::settlement::SettlementService;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[test]
    fn quote_posts_a_bid_below_and_an_ask_above_the_reference() {
        let ledger = Arc::new(Ledger::new());
        ledger.credit("MM", dec!(1000), Field::Available);
        let books = Arc::new(BookRegistry::new());
        let order_store = Arc::new(OrderStore::new());
        let contracts = Arc::new(ContractRegistry::new());
        let settlement = Arc::new(SettlementService::new(ledger.clone(), contracts.clone(), "Platform", dec!(0.01)));
        let anomalies = Arc::new(crate::error::AnomalyLog::new());
        let engine = MatchingEngine::new(books.clone(), ledger, order_store, contracts, settlement, anomalies);

        quote(&engine, "contract:C1", "MM", OrderType::ContractOwnership, Some("C1".into()), dec!(100), dec!(1), dec!(1), 1).unwrap();

        let book = books.get("contract:C1").unwrap();
        assert_eq!(book.best_bid(), Some(dec!(99)));
        assert_eq!(book.best_ask(), Some(dec!(101)));
    }

    #[test]
    fn reference_price_falls_back_to_default_with_no_resting_ask() {
        let books = BookRegistry::new();
        books.get_or_create("L1_C1");
        assert_eq!(reference_price(&books, "L1_C1", dec!(42)), dec!(42));
    }
}
