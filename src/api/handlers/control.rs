//! Scheduler control endpoints (spec.md §6: `/play`, `/pause`, `/resume`,
//! `/reset`).

use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::error::AppError;
use crate::scheduler::SchedulerSnapshot;
use crate::utils::response::ApiResponse;
use crate::AppState;

pub async fn play(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<SchedulerSnapshot>>, AppError> {
    state.scheduler.start()?;
    Ok(Json(ApiResponse::success(state.scheduler.snapshot())))
}

pub async fn pause(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<SchedulerSnapshot>>, AppError> {
    state.scheduler.pause()?;
    Ok(Json(ApiResponse::success(state.scheduler.snapshot())))
}

pub async fn resume(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<SchedulerSnapshot>>, AppError> {
    state.scheduler.resume()?;
    Ok(Json(ApiResponse::success(state.scheduler.snapshot())))
}

pub async fn reset(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<SchedulerSnapshot>>, AppError> {
    state.scheduler.reset().await?;
    Ok(Json(ApiResponse::success(state.scheduler.snapshot())))
}

pub async fn state_snapshot(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SchedulerSnapshot>> {
    Json(ApiResponse::success(state.scheduler.snapshot()))
}
