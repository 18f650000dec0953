//! `POST /orders` (spec.md §6): submit an order to the matching engine.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::match_record::MatchRecord;
use crate::models::order::CreateOrderRequest;
use crate::utils::response::ApiResponse;
use crate::AppState;

/// spec.md §4.4's `submit` returns zero, one, or more matches under the
/// general multi-level matching loop this build implements (see
/// DESIGN.md, Open Question 1) — `matches` is `[]` for the "null" case
/// spec.md's single-match phrasing describes.
#[derive(Debug, Serialize)]
pub struct SubmitOrderResponse {
    pub matches: Vec<MatchRecord>,
}

pub async fn submit_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<ApiResponse<SubmitOrderResponse>>, AppError> {
    let world = state.world.read().clone();
    let matches = world.engine.submit(
        req.side,
        &req.book_id,
        req.price,
        req.qty,
        &req.trader,
        req.order_type,
        req.contract_id,
    )?;
    Ok(Json(ApiResponse::success(SubmitOrderResponse { matches })))
}
