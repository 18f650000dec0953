//! A single order book (spec.md §4.3), modeled directly on the teacher's
//! `services::matching::orderbook::Orderbook`: bids/asks kept in
//! `BTreeMap<PriceLevel, VecDeque<RestingOrder>>` behind their own
//! `RwLock`, with a `DashMap` order index for O(log n) cancellation.
//!
//! Submissions for a single `book_id` are serialized by the matching
//! engine (spec.md §5), so FIFO `VecDeque` insertion order at a price
//! level already equals arrival-timestamp order — no separate ts field
//! needs comparing at match time.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use uuid::Uuid;

use super::price_level::PriceLevel;
use crate::models::order::Side;

#[derive(Debug, Clone)]
pub struct RestingOrder {
    pub id: Uuid,
    pub trader: String,
    pub price: Decimal,
    pub qty: i64,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SnapshotLevel {
    pub price: Decimal,
    pub order_id: Uuid,
    pub qty: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookSnapshot {
    pub bids: Vec<SnapshotLevel>,
    pub asks: Vec<SnapshotLevel>,
}

pub struct Book {
    pub book_id: String,
    bids: RwLock<BTreeMap<PriceLevel, VecDeque<RestingOrder>>>,
    asks: RwLock<BTreeMap<PriceLevel, VecDeque<RestingOrder>>>,
    index: DashMap<Uuid, Side>,
    /// spec.md §5: "submissions for a single `book_id` are serialized by
    /// the matching engine" — held by the caller across the whole
    /// peek→consume→insert sequence of one `submit` so two concurrent
    /// submissions for the same book can't interleave their crossing
    /// checks.
    critical_section: Mutex<()>,
}

impl Book {
    pub fn new(book_id: impl Into<String>) -> Self {
        Self {
            book_id: book_id.into(),
            bids: RwLock::new(BTreeMap::new()),
            asks: RwLock::new(BTreeMap::new()),
            index: DashMap::new(),
            critical_section: Mutex::new(()),
        }
    }

    /// Acquire the book's submission lock. Held by `MatchingEngine::submit`
    /// across its full crossing loop so `peek` and `consume_best` observe
    /// a consistent resting order (spec.md §5).
    pub fn lock_submissions(&self) -> MutexGuard<'_, ()> {
        self.critical_section.lock()
    }

    fn side_map(
        &self,
        side: Side,
    ) -> &RwLock<BTreeMap<PriceLevel, VecDeque<RestingOrder>>> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Places `order` on `side`. The book never checks crossing itself —
    /// the matching engine guarantees an order only reaches `insert` once
    /// no cross remains, maintaining the "no locked/crossed book at rest"
    /// invariant (spec.md §3).
    pub fn insert(&self, side: Side, order: RestingOrder) {
        let level = PriceLevel::from_decimal(order.price);
        let id = order.id;
        self.side_map(side).write().entry(level).or_default().push_back(order);
        self.index.insert(id, side);
    }

    /// Best order on `side`: highest price for bids, lowest for asks,
    /// earliest arrival within a level (spec.md §4.3).
    pub fn peek(&self, side: Side) -> Option<RestingOrder> {
        let map = self.side_map(side).read();
        match side {
            Side::Bid => map.iter().next_back().and_then(|(_, q)| q.front().cloned()),
            Side::Ask => map.iter().next().and_then(|(_, q)| q.front().cloned()),
        }
    }

    /// Decrement the quantity of the best resting order on `side` by
    /// `consumed`, removing it entirely once exhausted. Returns the order
    /// as it stood before the decrement (for settlement bookkeeping).
    pub fn consume_best(&self, side: Side, consumed: i64) -> Option<RestingOrder> {
        let level = {
            let map = self.side_map(side).read();
            match side {
                Side::Bid => map.keys().next_back().copied(),
                Side::Ask => map.keys().next().copied(),
            }
        }?;

        let mut map = self.side_map(side).write();
        let queue = map.get_mut(&level)?;
        let before = queue.front()?.clone();
        let front = queue.front_mut()?;
        front.qty -= consumed;
        if front.qty <= 0 {
            let consumed_order = queue.pop_front()?;
            self.index.remove(&consumed_order.id);
            if queue.is_empty() {
                map.remove(&level);
            }
        }
        Some(before)
    }

    /// O(log n) removal by id — used for explicit cancellation and for
    /// aborting a match when a resting order's record has gone missing
    /// (spec.md §7, "lost resting order").
    pub fn remove(&self, order_id: Uuid) -> Option<RestingOrder> {
        let side = self.index.remove(&order_id)?.1;
        let mut map = self.side_map(side).write();
        let mut found_level = None;
        let mut found = None;
        for (level, queue) in map.iter_mut() {
            if let Some(pos) = queue.iter().position(|o| o.id == order_id) {
                found = Some(queue.remove(pos).unwrap());
                if queue.is_empty() {
                    found_level = Some(*level);
                }
                break;
            }
        }
        if let Some(level) = found_level {
            map.remove(&level);
        }
        found
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.read().keys().next_back().map(|p| p.to_decimal())
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.read().keys().next().map(|p| p.to_decimal())
    }

    pub fn snapshot(&self) -> BookSnapshot {
        let bids = self
            .bids
            .read()
            .iter()
            .rev()
            .flat_map(|(level, q)| {
                q.iter().map(move |o| SnapshotLevel { price: level.to_decimal(), order_id: o.id, qty: o.qty })
            })
            .collect();
        let asks = self
            .asks
            .read()
            .iter()
            .flat_map(|(level, q)| {
                q.iter().map(move |o| SnapshotLevel { price: level.to_decimal(), order_id: o.id, qty: o.qty })
            })
            .collect();
        BookSnapshot { bids, asks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(price: Decimal, qty: i64) -> RestingOrder {
        RestingOrder { id: Uuid::new_v4(), trader: "T".into(), price, qty, ts: Utc::now() }
    }

    #[test]
    fn best_bid_and_ask_track_price_extremes() {
        let book = Book::new("L1_C1");
        book.insert(Side::Bid, order(dec!(90), 1));
        book.insert(Side::Bid, order(dec!(95), 1));
        book.insert(Side::Ask, order(dec!(110), 1));
        book.insert(Side::Ask, order(dec!(105), 1));

        assert_eq!(book.best_bid(), Some(dec!(95)));
        assert_eq!(book.best_ask(), Some(dec!(105)));
    }

    #[test]
    fn peek_returns_earliest_order_at_best_price() {
        let book = Book::new("L1_C1");
        let first = order(dec!(100), 1);
        let first_id = first.id;
        book.insert(Side::Bid, first);
        book.insert(Side::Bid, order(dec!(100), 2));

        let best = book.peek(Side::Bid).unwrap();
        assert_eq!(best.id, first_id);
    }

    #[test]
    fn consume_best_removes_when_fully_filled() {
        let book = Book::new("L1_C1");
        let ask = order(dec!(100), 1);
        let id = ask.id;
        book.insert(Side::Ask, ask);
        book.consume_best(Side::Ask, 1);
        assert!(book.peek(Side::Ask).is_none());
        assert!(book.remove(id).is_none());
    }

    #[test]
    fn consume_best_leaves_remainder_when_partially_filled() {
        let book = Book::new("L1_C1");
        book.insert(Side::Ask, order(dec!(10), 50));
        book.consume_best(Side::Ask, 30);
        let remaining = book.peek(Side::Ask).unwrap();
        assert_eq!(remaining.qty, 20);
    }
}
