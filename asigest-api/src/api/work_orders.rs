//! Work-order configuration endpoints (/api/config)

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use asigest_common::models::WorkOrderConfig;
use serde::Deserialize;

use crate::db::work_orders::{
    self, NewWorkOrderConfig, WorkOrderConfigDetail, WorkOrderConfigFilter, WorkOrderConfigUpdate,
};
use crate::pagination::{Paged, Pagination};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ListConfigsQuery {
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// GET /api/config
pub async fn list_configs(
    State(state): State<AppState>,
    query: Result<Query<ListConfigsQuery>, QueryRejection>,
) -> ApiResult<Json<Paged<WorkOrderConfig>>> {
    let Query(query) = query?;
    let pagination = Pagination::from_params(query.page, query.page_size)?;
    let filter = WorkOrderConfigFilter {
        active: query.active,
    };

    Ok(Json(work_orders::list(&state.db, &filter, pagination).await?))
}

/// GET /api/config/:id
///
/// Includes the phase types already created for the order.
pub async fn get_config(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<WorkOrderConfigDetail>> {
    work_orders::get_detail(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Configuration {} not found", id)))
}

/// POST /api/config
pub async fn create_config(
    State(state): State<AppState>,
    payload: Result<Json<NewWorkOrderConfig>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<WorkOrderConfig>)> {
    let Json(payload) = payload?;
    let created = work_orders::create(&state.db, &payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/config/:id
pub async fn update_config(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<WorkOrderConfigUpdate>, JsonRejection>,
) -> ApiResult<Json<WorkOrderConfig>> {
    let Json(payload) = payload?;
    Ok(Json(work_orders::update(&state.db, id, &payload).await?))
}

/// DELETE /api/config/:id (soft)
pub async fn delete_config(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    work_orders::deactivate(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn config_routes() -> Router<AppState> {
    Router::new()
        .route("/api/config", get(list_configs).post(create_config))
        .route(
            "/api/config/:id",
            get(get_config).put(update_config).delete(delete_config),
        )
}
