//! Event log endpoints (/api/log-eventi), read-only

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use asigest_common::models::EventLogEntry;
use asigest_common::Severity;
use serde::Deserialize;

use crate::db::events::{self, EventFilter};
use crate::pagination::{Paged, Pagination};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub kind: Option<String>,
    pub entity: Option<String>,
    pub entity_id: Option<i64>,
    pub severity: Option<Severity>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<ListEventsQuery>, QueryRejection>,
) -> ApiResult<Json<Paged<EventLogEntry>>> {
    let Query(query) = query?;
    let pagination = Pagination::from_params(query.page, query.page_size)?;
    let filter = EventFilter {
        kind: query.kind,
        entity: query.entity,
        entity_id: query.entity_id,
        severity: query.severity,
    };

    Ok(Json(events::list(&state.db, &filter, pagination).await?))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<EventLogEntry>> {
    events::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Event {} not found", id)))
}

pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/api/log-eventi", get(list_events))
        .route("/api/log-eventi/:id", get(get_event))
}
