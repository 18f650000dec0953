//! **(ambient)** Anomaly diagnostics (spec.md §7: invariant violations are
//! "surfaced as a reported anomaly with persistent trace ... flagged for
//! operator review"). Not part of spec.md's control-endpoint table, but
//! the persistent trace it calls for needs a reader.

use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::error::Anomaly;
use crate::utils::response::ApiResponse;
use crate::AppState;

pub async fn list_anomalies(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<Anomaly>>> {
    let world = state.world.read().clone();
    Json(ApiResponse::success(world.anomalies.snapshot()))
}
