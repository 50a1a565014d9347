//! asigest-api library - production tracking HTTP service
//!
//! Serves the operational store (configurations, phases, batches, master
//! data, documents, event log) and a read-only view of the ASITRON ERP.

use axum::http::{HeaderValue, Method};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod validate;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Operational store (read-write)
    pub db: SqlitePool,
    /// ASITRON ERP database (read-only)
    pub erp: SqlitePool,
}

impl AppState {
    pub fn new(db: SqlitePool, erp: SqlitePool) -> Self {
        Self { db, erp }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

/// Build application router
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::phase_type_routes())
        .merge(api::operator_routes())
        .merge(api::machine_routes())
        .merge(api::config_routes())
        .merge(api::phase_routes())
        .merge(api::batch_routes())
        .merge(api::event_routes())
        .merge(api::document_routes())
        .merge(api::erp_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}
