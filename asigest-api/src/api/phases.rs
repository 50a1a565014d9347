//! Phase endpoints (/api/fasi)

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use asigest_common::models::Phase;
use asigest_common::PhaseState;
use serde::Deserialize;

use crate::db::phases::{self, NewPhase, PhaseDetail, PhaseFilter, PhaseUpdate, PhaseView};
use crate::pagination::{Paged, Pagination};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ListPhasesQuery {
    pub config_id: Option<i64>,
    pub erp_order_id: Option<i64>,
    pub completed: Option<bool>,
    pub state: Option<PhaseState>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// GET /api/fasi
pub async fn list_phases(
    State(state): State<AppState>,
    query: Result<Query<ListPhasesQuery>, QueryRejection>,
) -> ApiResult<Json<Paged<PhaseView>>> {
    let Query(query) = query?;
    let pagination = Pagination::from_params(query.page, query.page_size)?;
    let filter = PhaseFilter {
        config_id: query.config_id,
        erp_order_id: query.erp_order_id,
        completed: query.completed,
        state: query.state,
    };

    Ok(Json(phases::list(&state.db, &filter, pagination).await?))
}

/// GET /api/fasi/:id
///
/// Phase with type, configuration and batch statistics.
pub async fn get_phase(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PhaseDetail>> {
    phases::get_detail(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Phase {} not found", id)))
}

/// POST /api/fasi
pub async fn create_phase(
    State(state): State<AppState>,
    payload: Result<Json<NewPhase>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PhaseView>)> {
    let Json(payload) = payload?;
    let created = phases::create(&state.db, &payload).await?;
    Ok((StatusCode::CREATED, Json(PhaseView::from(created))))
}

/// PUT /api/fasi/:id
///
/// **Errors:**
/// - 400: quantity not positive, conflicting `completed`/`state`, forbidden
///   transition, or closing with open batches
/// - 404: phase not found
pub async fn update_phase(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<PhaseUpdate>, JsonRejection>,
) -> ApiResult<Json<PhaseView>> {
    let Json(payload) = payload?;
    let updated: Phase = phases::update(&state.db, id, &payload).await?;
    Ok(Json(PhaseView::from(updated)))
}

/// DELETE /api/fasi/:id
///
/// Only APERTA phases without batches can be deleted.
pub async fn delete_phase(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    phases::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn phase_routes() -> Router<AppState> {
    Router::new()
        .route("/api/fasi", get(list_phases).post(create_phase))
        .route(
            "/api/fasi/:id",
            get(get_phase).put(update_phase).delete(delete_phase),
        )
}
