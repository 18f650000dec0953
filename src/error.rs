//! Crate-wide error types
//!
//! Each subsystem owns a `thiserror` enum; `AppError` composes them at the
//! API boundary the way `utils::response::AppError` wraps service errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::utils::response::ApiResponse;

/// Ledger subsystem errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient {field} funds for {trader}: requested {requested}, available {available}")]
    InsufficientFunds {
        trader: String,
        field: &'static str,
        requested: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },
}

/// Order store / book errors.
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    #[error("unknown book: {0}")]
    UnknownBook(String),

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),
}

/// Matching engine errors, surfaced synchronously to callers of `submit`.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("invalid order: {0}")]
    BadOrder(String),

    #[error("insufficient funds to lock: {0}")]
    InsufficientFunds(#[from] LedgerError),

    #[error("resting order referenced by the book is missing: {0}")]
    LostRestingOrder(Uuid),

    #[error(transparent)]
    Book(#[from] BookError),
}

/// Settlement subsystem errors. Spec §7: a failed hold settlement marks
/// that hold in an error state and continues with siblings rather than
/// propagating — this type exists for the cases that *do* need to bubble
/// (e.g. an unknown leg on manual settlement replay).
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("unknown leg/contract pair: {leg_id}/{contract_id}")]
    UnknownLeg { leg_id: String, contract_id: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Scheduler subsystem errors.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("simulation already running")]
    AlreadyRunning,

    #[error("simulation not running")]
    NotRunning,

    #[error("simulation not paused")]
    NotPaused,

    #[error("reset failed: worker did not stop within the bounded wait")]
    ResetTimedOut,
}

/// Top-level application error, mapped to an HTTP response the way
/// `utils::response::AppError` does in the teacher.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::new(StatusCode::BAD_REQUEST, "INSUFFICIENT_FUNDS", err.to_string())
    }
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        let code = match &err {
            BookError::UnknownBook(_) => "UNKNOWN_BOOK",
            BookError::OrderNotFound(_) => "ORDER_NOT_FOUND",
        };
        AppError::new(StatusCode::NOT_FOUND, code, err.to_string())
    }
}

impl From<MatchingError> for AppError {
    fn from(err: MatchingError) -> Self {
        let code = match &err {
            MatchingError::BadOrder(_) => "REJECTED_BAD_ORDER",
            MatchingError::InsufficientFunds(_) => "REJECTED_INSUFFICIENT_FUNDS",
            MatchingError::LostRestingOrder(_) => "INTERNAL_ANOMALY",
            MatchingError::Book(_) => "UNKNOWN_BOOK",
        };
        AppError::new(StatusCode::BAD_REQUEST, code, err.to_string())
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        let code = match &err {
            SchedulerError::AlreadyRunning => "ALREADY_RUNNING",
            SchedulerError::NotRunning => "NOT_RUNNING",
            SchedulerError::NotPaused => "NOT_PAUSED",
            SchedulerError::ResetTimedOut => "RESET_FAILED",
        };
        AppError::new(StatusCode::CONFLICT, code, err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()>::error(self.code, &self.message);
        (self.status, Json(body)).into_response()
    }
}

/// spec.md §7: invariant violations ("lost resting order", "partial
/// settlement failure") are not caller-facing rejections — they are
/// surfaced as a reported anomaly with a persistent trace. This is that
/// trace: an in-memory, append-only log read by a diagnostics endpoint,
/// the minimal stand-in for "a dedicated anomaly log" since persistence
/// across restarts is out of scope (spec.md §1).
#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub kind: &'static str,
    pub detail: String,
    #[serde(serialize_with = "crate::models::order::datetime_as_millis::serialize")]
    pub ts: DateTime<Utc>,
}

#[derive(Default)]
pub struct AnomalyLog {
    entries: Mutex<Vec<Anomaly>>,
}

impl AnomalyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: &'static str, detail: impl Into<String>) {
        self.entries.lock().push(Anomaly { kind, detail: detail.into(), ts: Utc::now() });
    }

    pub fn snapshot(&self) -> Vec<Anomaly> {
        self.entries.lock().clone()
    }
}
