//! Ambient counters/gauges (SPEC_FULL.md §2), grounded on the teacher's
//! `metrics/mod.rs` — book depth, match throughput, ledger rejections.
//! Registration only; an exporter is an external collaborator's choice
//! per spec.md §1 and is not wired up here.

use ::metrics::{counter, gauge};

pub fn record_order_submitted(book_id: &str, side: &str) {
    counter!("freight_orders_submitted_total", "book_id" => book_id.to_string(), "side" => side.to_string()).increment(1);
}

pub fn record_match(book_id: &str, qty: i64) {
    counter!("freight_matches_total", "book_id" => book_id.to_string()).increment(1);
    counter!("freight_matched_qty_total", "book_id" => book_id.to_string()).increment(qty as u64);
}

pub fn record_ledger_rejection(reason: &str) {
    counter!("freight_ledger_rejections_total", "reason" => reason.to_string()).increment(1);
}

pub fn record_book_depth(book_id: &str, bid_levels: usize, ask_levels: usize) {
    gauge!("freight_book_bid_levels", "book_id" => book_id.to_string()).set(bid_levels as f64);
    gauge!("freight_book_ask_levels", "book_id" => book_id.to_string()).set(ask_levels as f64);
}

pub fn record_sim_clock(seconds: u64) {
    gauge!("freight_sim_clock_seconds").set(seconds as f64);
}
