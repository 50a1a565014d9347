//! Machine endpoints (/api/macchine)

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use asigest_common::models::Machine;
use serde::Deserialize;

use crate::db::machines::{self, MachineFilter, MachineUpdate, NewMachine};
use crate::pagination::{Paged, Pagination};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ListMachinesQuery {
    pub department: Option<String>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn list_machines(
    State(state): State<AppState>,
    query: Result<Query<ListMachinesQuery>, QueryRejection>,
) -> ApiResult<Json<Paged<Machine>>> {
    let Query(query) = query?;
    let pagination = Pagination::from_params(query.page, query.page_size)?;
    let filter = MachineFilter {
        department: query.department,
        active: query.active,
    };

    Ok(Json(machines::list(&state.db, &filter, pagination).await?))
}

pub async fn get_machine(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Machine>> {
    machines::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Machine {} not found", id)))
}

pub async fn create_machine(
    State(state): State<AppState>,
    payload: Result<Json<NewMachine>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Machine>)> {
    let Json(payload) = payload?;
    let created = machines::create(&state.db, &payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_machine(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<MachineUpdate>, JsonRejection>,
) -> ApiResult<Json<Machine>> {
    let Json(payload) = payload?;
    Ok(Json(machines::update(&state.db, id, &payload).await?))
}

pub async fn delete_machine(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Machine>> {
    Ok(Json(machines::deactivate(&state.db, id).await?))
}

pub fn machine_routes() -> Router<AppState> {
    Router::new()
        .route("/api/macchine", get(list_machines).post(create_machine))
        .route(
            "/api/macchine/:id",
            get(get_machine).put(update_machine).delete(delete_machine),
        )
}
