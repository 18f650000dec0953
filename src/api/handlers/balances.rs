//! `GET /balances` (spec.md §6).

use axum::extract::State;
use axum::Json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::account::BalanceSnapshot;
use crate::utils::response::ApiResponse;
use crate::AppState;

pub async fn get_balances(State(state): State<Arc<AppState>>) -> Json<ApiResponse<BTreeMap<String, BalanceSnapshot>>> {
    let world = state.world.read().clone();
    Json(ApiResponse::success(world.ledger.all_balances()))
}
