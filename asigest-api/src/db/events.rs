//! Event log (append-only audit trail)
//!
//! Lifecycle operations record their event on the same transaction that
//! performs the change, so an audit row exists if and only if the change
//! was committed.

use asigest_common::models::EventLogEntry;
use asigest_common::{Result, Severity};
use sqlx::{Executor, Sqlite, SqlitePool};

use super::{fetch_page, Filters};
use crate::pagination::{Paged, Pagination};

/// No authentication layer: every event is attributed to the service
pub const ACTOR_SYSTEM: &str = "system";

pub const CONFIG_CREATED: &str = "CONFIG_CREATA";
pub const CONFIG_MODIFIED: &str = "CONFIG_MODIFICATA";
pub const CONFIG_DEACTIVATED: &str = "CONFIG_DISATTIVATA";
pub const PHASE_CREATED: &str = "FASE_CREATA";
pub const PHASE_STATE_CHANGED: &str = "FASE_STATO_MODIFICATO";
pub const PHASE_DELETED: &str = "FASE_ELIMINATA";
pub const BATCH_CREATED: &str = "LOTTO_CREATO";
pub const BATCH_CLOSED: &str = "LOTTO_CHIUSO";
pub const BATCH_DELETED: &str = "LOTTO_ELIMINATO";
pub const DOCUMENT_UPLOADED: &str = "DOCUMENTO_CARICATO";

pub const ENTITY_CONFIG: &str = "ConfigCommessa";
pub const ENTITY_PHASE: &str = "Fase";
pub const ENTITY_BATCH: &str = "Lotto";
pub const ENTITY_DOCUMENT: &str = "DocumentoTecnico";

/// Append one INFO event
///
/// Accepts a pool or `&mut *tx` so callers can log inside their transaction.
pub async fn record<'e, E>(
    executor: E,
    kind: &str,
    entity: &str,
    entity_id: Option<i64>,
    details: Option<&str>,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO event_log (occurred_at, kind, entity, entity_id, actor, details, severity)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(asigest_common::time::sortable(asigest_common::time::now()))
    .bind(kind)
    .bind(entity)
    .bind(entity_id)
    .bind(ACTOR_SYSTEM)
    .bind(details)
    .bind(Severity::Info)
    .execute(executor)
    .await?;

    Ok(())
}

/// Event list filters
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub kind: Option<String>,
    pub entity: Option<String>,
    pub entity_id: Option<i64>,
    pub severity: Option<Severity>,
}

/// Newest first
pub async fn list(
    pool: &SqlitePool,
    filter: &EventFilter,
    pagination: Pagination,
) -> Result<Paged<EventLogEntry>> {
    let filters = Filters::new()
        .eq("kind", filter.kind.clone())
        .eq("entity", filter.entity.clone())
        .eq("entity_id", filter.entity_id)
        .eq("severity", filter.severity.map(|s| s.as_str()));

    fetch_page(
        pool,
        "SELECT * FROM event_log",
        "FROM event_log",
        &filters,
        "occurred_at DESC, event_id DESC",
        pagination,
    )
    .await
}

pub async fn get(pool: &SqlitePool, event_id: i64) -> Result<Option<EventLogEntry>> {
    let entry = sqlx::query_as::<_, EventLogEntry>("SELECT * FROM event_log WHERE event_id = ?")
        .bind(event_id)
        .fetch_optional(pool)
        .await?;

    Ok(entry)
}
