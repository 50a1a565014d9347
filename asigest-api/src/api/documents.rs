//! Technical document endpoints (/api/documenti)

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use asigest_common::models::TechnicalDocument;
use asigest_common::DocumentState;
use serde::Deserialize;

use crate::db::documents::{self, DocumentFilter, NewDocument};
use crate::pagination::{Paged, Pagination};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    pub article_erp_id: Option<i64>,
    pub doc_type: Option<String>,
    pub state: Option<DocumentState>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn list_documents(
    State(state): State<AppState>,
    query: Result<Query<ListDocumentsQuery>, QueryRejection>,
) -> ApiResult<Json<Paged<TechnicalDocument>>> {
    let Query(query) = query?;
    let pagination = Pagination::from_params(query.page, query.page_size)?;
    let filter = DocumentFilter {
        article_erp_id: query.article_erp_id,
        doc_type: query.doc_type,
        state: query.state,
    };

    Ok(Json(documents::list(&state.db, &filter, pagination).await?))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TechnicalDocument>> {
    documents::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Document {} not found", id)))
}

/// POST /api/documenti
///
/// The new revision becomes ATTIVO; the previous active revision of the
/// same article and type becomes SUPERATO.
pub async fn create_document(
    State(state): State<AppState>,
    payload: Result<Json<NewDocument>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TechnicalDocument>)> {
    let Json(payload) = payload?;
    let created = documents::create(&state.db, &payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /api/documenti/:id (marks SUPERATO)
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TechnicalDocument>> {
    Ok(Json(documents::supersede(&state.db, id).await?))
}

pub fn document_routes() -> Router<AppState> {
    Router::new()
        .route("/api/documenti", get(list_documents).post(create_document))
        .route(
            "/api/documenti/:id",
            get(get_document).delete(delete_document),
        )
}
