//! Order Store (spec.md §4.2) — owns order attributes; shared read by the
//! matching engine, settlement, and observers. `put`/`get`, no update;
//! deletion only on full consumption or explicit cancellation.

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::order::Order;

#[derive(Default)]
pub struct OrderStore {
    orders: DashMap<Uuid, Order>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn get(&self, id: Uuid) -> Option<Order> {
        self.orders.get(&id).map(|r| r.value().clone())
    }

    /// Deletion is permitted only when an order is fully consumed or
    /// explicitly cancelled; dangling references from the match log are
    /// acceptable per spec.md §4.2.
    pub fn remove(&self, id: Uuid) -> Option<Order> {
        self.orders.remove(&id).map(|(_, order)| order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{OrderType, Side};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sample() -> Order {
        Order {
            id: Uuid::new_v4(),
            book_id: "L1_C1".into(),
            trader: "T1".into(),
            side: Side::Bid,
            price: dec!(100),
            qty: 1,
            order_type: OrderType::LegFreight,
            contract_id: Some("C1".into()),
            ts: Utc::now(),
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = OrderStore::new();
        let order = sample();
        let id = order.id;
        store.put(order);
        let fetched = store.get(id).unwrap();
        assert_eq!(fetched.id, id);
    }

    #[test]
    fn remove_deletes_the_record() {
        let store = OrderStore::new();
        let order = sample();
        let id = order.id;
        store.put(order);
        assert!(store.remove(id).is_some());
        assert!(store.get(id).is_none());
    }
}
