//! Order model — immutable once admitted (spec.md §3).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// Helper module to serialize DateTime as milliseconds timestamp, for the
// streaming/API surface — kept distinct from the internal ts field so the
// wire format can change without touching storage.
pub mod datetime_as_millis {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(dt.timestamp_millis())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

/// Which instrument flavor an order trades (spec.md GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    ContractOwnership,
    LegFreight,
}

/// Immutable record as stored in the Order Store (spec.md §3/§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub book_id: String,
    pub trader: String,
    pub side: Side,
    pub price: Decimal,
    pub qty: i64,
    pub order_type: OrderType,
    pub contract_id: Option<String>,
    #[serde(serialize_with = "datetime_as_millis::serialize")]
    pub ts: DateTime<Utc>,
}

/// Body of `POST /orders` (spec.md §6).
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub side: Side,
    pub book_id: String,
    pub price: Decimal,
    pub qty: i64,
    pub trader: String,
    pub order_type: OrderType,
    pub contract_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_opposite_is_involutive() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
    }
}
