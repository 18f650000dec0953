//! spec.md §6 control surface, assembled the way the teacher's
//! `api::routes::create_router` merges handler groups onto one `Router`.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::api::handlers;
use crate::AppState;

pub fn create_router(_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/play", post(handlers::control::play))
        .route("/pause", post(handlers::control::pause))
        .route("/resume", post(handlers::control::resume))
        .route("/reset", post(handlers::control::reset))
        .route("/scheduler/state", get(handlers::control::state_snapshot))
        .route("/orders", post(handlers::orders::submit_order))
        .route("/orderbook/:book_id", get(handlers::books::get_orderbook))
        .route("/balances", get(handlers::balances::get_balances))
        .route("/current_owner/:contract_id", get(handlers::contracts::get_current_owner))
        .route("/anomalies", get(handlers::diagnostics::list_anomalies))
}
