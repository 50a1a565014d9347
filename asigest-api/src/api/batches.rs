//! Batch endpoints (/api/lotti)

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::db::batches::{self, BatchClose, BatchDetail, BatchFilter, BatchView, NewBatch};
use crate::pagination::{Paged, Pagination};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ListBatchesQuery {
    pub phase_id: Option<i64>,
    pub open: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// GET /api/lotti
pub async fn list_batches(
    State(state): State<AppState>,
    query: Result<Query<ListBatchesQuery>, QueryRejection>,
) -> ApiResult<Json<Paged<BatchView>>> {
    let Query(query) = query?;
    let pagination = Pagination::from_params(query.page, query.page_size)?;
    let filter = BatchFilter {
        phase_id: query.phase_id,
        open: query.open,
    };

    Ok(Json(batches::list(&state.db, &filter, pagination).await?))
}

/// GET /api/lotti/:id
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<BatchDetail>> {
    batches::get_detail(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Batch {} not found", id)))
}

/// POST /api/lotti
///
/// Opens a batch with the next progressive number of its phase.
///
/// **Errors:**
/// - 404: phase, operator or machine not found
/// - 400: phase CHIUSA or BLOCCATA, negative quantities, text too long
pub async fn create_batch(
    State(state): State<AppState>,
    payload: Result<Json<NewBatch>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BatchView>)> {
    let Json(payload) = payload?;
    let created = batches::create(&state.db, &payload).await?;
    Ok((StatusCode::CREATED, Json(BatchView::from(created))))
}

/// PUT|POST /api/lotti/:id/close
pub async fn close_batch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<BatchClose>, JsonRejection>,
) -> ApiResult<Json<BatchView>> {
    let Json(payload) = payload?;
    let closed = batches::close(&state.db, id, &payload).await?;
    Ok(Json(BatchView::from(closed)))
}

/// DELETE /api/lotti/:id
///
/// Closed batches are part of the production record and are kept.
pub async fn delete_batch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    batches::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/api/lotti", get(list_batches).post(create_batch))
        .route("/api/lotti/:id", get(get_batch).delete(delete_batch))
        .route("/api/lotti/:id/close", put(close_batch).post(close_batch))
}
