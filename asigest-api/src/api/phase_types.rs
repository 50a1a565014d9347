//! Phase type endpoints (/api/fasi-tipo)

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use asigest_common::models::PhaseType;
use serde::Deserialize;

use crate::db::phase_types::{self, NewPhaseType, PhaseTypeFilter, PhaseTypeUpdate};
use crate::pagination::{Paged, Pagination};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ListPhaseTypesQuery {
    pub category: Option<String>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// GET /api/fasi-tipo
pub async fn list_phase_types(
    State(state): State<AppState>,
    query: Result<Query<ListPhaseTypesQuery>, QueryRejection>,
) -> ApiResult<Json<Paged<PhaseType>>> {
    let Query(query) = query?;
    let pagination = Pagination::from_params(query.page, query.page_size)?;
    let filter = PhaseTypeFilter {
        category: query.category,
        active: query.active,
    };

    Ok(Json(phase_types::list(&state.db, &filter, pagination).await?))
}

/// GET /api/fasi-tipo/:id
pub async fn get_phase_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PhaseType>> {
    phase_types::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Phase type {} not found", id)))
}

/// POST /api/fasi-tipo
pub async fn create_phase_type(
    State(state): State<AppState>,
    payload: Result<Json<NewPhaseType>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PhaseType>)> {
    let Json(payload) = payload?;
    let created = phase_types::create(&state.db, &payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/fasi-tipo/:id
pub async fn update_phase_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<PhaseTypeUpdate>, JsonRejection>,
) -> ApiResult<Json<PhaseType>> {
    let Json(payload) = payload?;
    Ok(Json(phase_types::update(&state.db, id, &payload).await?))
}

/// DELETE /api/fasi-tipo/:id (soft)
pub async fn delete_phase_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PhaseType>> {
    Ok(Json(phase_types::deactivate(&state.db, id).await?))
}

pub fn phase_type_routes() -> Router<AppState> {
    Router::new()
        .route("/api/fasi-tipo", get(list_phase_types).post(create_phase_type))
        .route(
            "/api/fasi-tipo/:id",
            get(get_phase_type)
                .put(update_phase_type)
                .delete(delete_phase_type),
        )
}
