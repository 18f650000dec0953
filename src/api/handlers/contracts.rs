//! `GET /current_owner/{contract_id}` (spec.md §6).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::utils::response::ApiResponse;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CurrentOwnerResponse {
    pub contract_id: String,
    pub current_owner: String,
}

pub async fn get_current_owner(
    State(state): State<Arc<AppState>>,
    Path(contract_id): Path<String>,
) -> Result<Json<ApiResponse<CurrentOwnerResponse>>, AppError> {
    let world = state.world.read().clone();
    let contract = world.contracts.get_contract(&contract_id).ok_or_else(|| {
        AppError::new(StatusCode::NOT_FOUND, "UNKNOWN_CONTRACT", format!("unknown contract: {contract_id}"))
    })?;
    Ok(Json(ApiResponse::success(CurrentOwnerResponse {
        contract_id,
        current_owner: contract.current_owner,
    })))
}
