//! ERP view endpoints (/api/gestionale), read-only against ASITRON

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::erp::{self, ErpArticle, ErpCustomer, ErpOrder, DEFAULT_LIMIT, MAX_LIMIT};
use crate::{validate, ApiError, ApiResult, AppState};

/// ERP lists are capped, not paged
#[derive(Debug, Serialize)]
pub struct ErpList<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ErpList<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    /// Defaults to open orders only
    pub aperte: Option<bool>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
}

fn resolve_limit(limit: Option<i64>) -> ApiResult<i64> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    Ok(limit)
}

/// ERP failures are reported as 500 with the engine message
fn erp_error(err: asigest_common::Error) -> ApiError {
    ApiError::Internal(format!("Error querying ASITRON database: {}", err))
}

/// GET /api/gestionale/commesse
pub async fn list_orders(
    State(state): State<AppState>,
    query: Result<Query<OrdersQuery>, QueryRejection>,
) -> ApiResult<Json<ErpList<ErpOrder>>> {
    let Query(query) = query?;
    let limit = resolve_limit(query.limit)?;

    let orders = erp::list_orders(&state.erp, query.aperte.unwrap_or(true), limit)
        .await
        .map_err(erp_error)?;

    Ok(Json(orders.into()))
}

/// GET /api/gestionale/commesse/:progressivo
pub async fn get_order(
    State(state): State<AppState>,
    Path(progressivo): Path<i64>,
) -> ApiResult<Json<ErpOrder>> {
    erp::get_order(&state.erp, progressivo)
        .await
        .map_err(erp_error)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("ERP order {} not found", progressivo)))
}

/// GET /api/gestionale/articoli
pub async fn list_articles(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<ErpList<ErpArticle>>> {
    let Query(query) = query?;
    let limit = resolve_limit(query.limit)?;
    validate::max_length("search", query.search.as_deref(), 50)?;

    let articles = erp::list_articles(&state.erp, query.search.as_deref(), limit)
        .await
        .map_err(erp_error)?;

    Ok(Json(articles.into()))
}

/// GET /api/gestionale/clienti
pub async fn list_customers(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<ErpList<ErpCustomer>>> {
    let Query(query) = query?;
    let limit = resolve_limit(query.limit)?;
    validate::max_length("search", query.search.as_deref(), 50)?;

    let customers = erp::list_customers(&state.erp, query.search.as_deref(), limit)
        .await
        .map_err(erp_error)?;

    Ok(Json(customers.into()))
}

pub fn erp_routes() -> Router<AppState> {
    Router::new()
        .route("/api/gestionale/commesse", get(list_orders))
        .route("/api/gestionale/commesse/:progressivo", get(get_order))
        .route("/api/gestionale/articoli", get(list_articles))
        .route("/api/gestionale/clienti", get(list_customers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_bounds() {
        assert_eq!(resolve_limit(None).unwrap(), 100);
        assert_eq!(resolve_limit(Some(500)).unwrap(), 500);
        assert!(resolve_limit(Some(0)).is_err());
        assert!(resolve_limit(Some(501)).is_err());
    }
}
