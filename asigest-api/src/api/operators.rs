//! Operator endpoints (/api/utenti)

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use asigest_common::models::Operator;
use serde::Deserialize;

use crate::db::operators::{self, NewOperator, OperatorFilter, OperatorUpdate};
use crate::pagination::{Paged, Pagination};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ListOperatorsQuery {
    pub department: Option<String>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn list_operators(
    State(state): State<AppState>,
    query: Result<Query<ListOperatorsQuery>, QueryRejection>,
) -> ApiResult<Json<Paged<Operator>>> {
    let Query(query) = query?;
    let pagination = Pagination::from_params(query.page, query.page_size)?;
    let filter = OperatorFilter {
        department: query.department,
        active: query.active,
    };

    Ok(Json(operators::list(&state.db, &filter, pagination).await?))
}

pub async fn get_operator(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Operator>> {
    operators::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Operator {} not found", id)))
}

pub async fn create_operator(
    State(state): State<AppState>,
    payload: Result<Json<NewOperator>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Operator>)> {
    let Json(payload) = payload?;
    let created = operators::create(&state.db, &payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_operator(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<OperatorUpdate>, JsonRejection>,
) -> ApiResult<Json<Operator>> {
    let Json(payload) = payload?;
    Ok(Json(operators::update(&state.db, id, &payload).await?))
}

pub async fn delete_operator(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Operator>> {
    Ok(Json(operators::deactivate(&state.db, id).await?))
}

pub fn operator_routes() -> Router<AppState> {
    Router::new()
        .route("/api/utenti", get(list_operators).post(create_operator))
        .route(
            "/api/utenti/:id",
            get(get_operator).put(update_operator).delete(delete_operator),
        )
}
