//! Match record — immutable, append-only to a per-book match log (spec.md §3).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order::{datetime_as_millis, OrderType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: Uuid,
    pub book_id: String,
    pub bid_id: Uuid,
    pub ask_id: Uuid,
    pub bid_trader: String,
    pub ask_trader: String,
    pub price: Decimal,
    pub qty: i64,
    pub match_type: OrderType,
    pub contract_id: Option<String>,
    #[serde(serialize_with = "datetime_as_millis::serialize")]
    pub ts: DateTime<Utc>,
}
