//! `GET /orderbook/{book_id}` (spec.md §6).

use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use crate::books::BookSnapshot;
use crate::error::AppError;
use crate::utils::response::ApiResponse;
use crate::AppState;

pub async fn get_orderbook(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Json<ApiResponse<BookSnapshot>>, AppError> {
    let world = state.world.read().clone();
    let book = world.books.get(&book_id)?;
    Ok(Json(ApiResponse::success(book.snapshot())))
}
