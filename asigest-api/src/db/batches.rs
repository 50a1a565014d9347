//! Production batches (lotti)
//!
//! Batch numbers are sequential per phase: the first batch of a phase is 1,
//! each new one is the current maximum plus one. The number is computed by
//! the INSERT itself inside an immediate transaction, so concurrent openings
//! on the same phase queue on the write lock and each sees the previous
//! insert. `UNIQUE (phase_id, progressive)` backs this at the schema level.
//!
//! A batch is open until it is closed with its output and scrap counts.
//! Closed batches are part of the production record and cannot be deleted.

use asigest_common::models::Batch;
use asigest_common::{Error, PhaseState, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use super::{events, fetch_page, phases, Filters};
use crate::pagination::{Paged, Pagination};
use crate::validate;

#[derive(Debug, Clone, Deserialize)]
pub struct NewBatch {
    pub phase_id: i64,
    pub input_qty: Option<i64>,
    pub output_qty: Option<i64>,
    pub scrap_qty: Option<i64>,
    pub operator_id: Option<i64>,
    pub machine_id: Option<i64>,
    pub feeder_program: Option<String>,
    pub setup_minutes: Option<i64>,
    pub scrap_kind: Option<String>,
    pub scrap_notes: Option<String>,
    pub notes: Option<String>,
}

impl NewBatch {
    pub fn for_phase(phase_id: i64) -> Self {
        Self {
            phase_id,
            input_qty: None,
            output_qty: None,
            scrap_qty: None,
            operator_id: None,
            machine_id: None,
            feeder_program: None,
            setup_minutes: None,
            scrap_kind: None,
            scrap_notes: None,
            notes: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate::non_negative("input_qty", self.input_qty)?;
        validate::non_negative("output_qty", self.output_qty)?;
        validate::non_negative("scrap_qty", self.scrap_qty)?;
        validate::non_negative("setup_minutes", self.setup_minutes)?;
        validate::max_length("feeder_program", self.feeder_program.as_deref(), 100)?;
        validate::max_length("scrap_kind", self.scrap_kind.as_deref(), 50)?;
        validate::max_length("scrap_notes", self.scrap_notes.as_deref(), 500)
    }
}

/// Final counts recorded when a batch is closed
#[derive(Debug, Clone, Deserialize)]
pub struct BatchClose {
    pub output_qty: i64,
    #[serde(default)]
    pub scrap_qty: i64,
    /// Replaces the batch notes when present
    pub notes: Option<String>,
}

impl BatchClose {
    pub fn validate(&self) -> Result<()> {
        validate::non_negative("output_qty", Some(self.output_qty))?;
        validate::non_negative("scrap_qty", Some(self.scrap_qty))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub phase_id: Option<i64>,
    /// true: only open batches, false: only closed ones
    pub open: Option<bool>,
}

/// Batch with its derived yield and duration
#[derive(Debug, Clone, Serialize)]
pub struct BatchView {
    #[serde(flatten)]
    pub batch: Batch,
    pub yield_pct: Option<f64>,
    pub duration_minutes: Option<i64>,
}

impl From<Batch> for BatchView {
    fn from(batch: Batch) -> Self {
        Self {
            yield_pct: batch.yield_pct(),
            duration_minutes: batch.duration_minutes(),
            batch,
        }
    }
}

/// Batch joined with its phase, operator and machine
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BatchDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub batch: Batch,
    pub phase_order_number: Option<String>,
    pub phase_type_code: Option<String>,
    pub phase_type_description: Option<String>,
    pub operator_full_name: Option<String>,
    pub operator_username: Option<String>,
    pub machine_code: Option<String>,
    pub machine_description: Option<String>,
    #[sqlx(skip)]
    pub yield_pct: Option<f64>,
    #[sqlx(skip)]
    pub duration_minutes: Option<i64>,
}

pub async fn list(
    pool: &SqlitePool,
    filter: &BatchFilter,
    pagination: Pagination,
) -> Result<Paged<BatchView>> {
    let filters = Filters::new()
        .eq("phase_id", filter.phase_id)
        .raw("ended_at IS NULL", filter.open == Some(true))
        .raw("ended_at IS NOT NULL", filter.open == Some(false));

    let page: Paged<Batch> = fetch_page(
        pool,
        "SELECT * FROM batches",
        "FROM batches",
        &filters,
        "batch_id DESC",
        pagination,
    )
    .await?;

    Ok(page.map(BatchView::from))
}

pub async fn get(pool: &SqlitePool, batch_id: i64) -> Result<Option<Batch>> {
    let batch = sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE batch_id = ?")
        .bind(batch_id)
        .fetch_optional(pool)
        .await?;

    Ok(batch)
}

pub async fn get_detail(pool: &SqlitePool, batch_id: i64) -> Result<Option<BatchDetail>> {
    let detail = sqlx::query_as::<_, BatchDetail>(
        r#"
        SELECT b.*,
               p.order_number AS phase_order_number,
               t.code AS phase_type_code,
               t.description AS phase_type_description,
               o.full_name AS operator_full_name,
               o.username AS operator_username,
               m.code AS machine_code,
               m.description AS machine_description
        FROM batches b
        JOIN phases p ON p.phase_id = b.phase_id
        LEFT JOIN phase_types t ON t.phase_type_id = p.phase_type_id
        LEFT JOIN operators o ON o.operator_id = b.operator_id
        LEFT JOIN machines m ON m.machine_id = b.machine_id
        WHERE b.batch_id = ?
        "#,
    )
    .bind(batch_id)
    .fetch_optional(pool)
    .await?;

    Ok(detail.map(|mut d| {
        d.yield_pct = d.batch.yield_pct();
        d.duration_minutes = d.batch.duration_minutes();
        d
    }))
}

async fn exists(conn: &mut SqliteConnection, sql: &str, id: i64) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar(sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Open a new batch on a phase
///
/// Promotes an APERTA phase to IN_CORSO on its first batch.
pub async fn create(pool: &SqlitePool, new: &NewBatch) -> Result<Batch> {
    new.validate()?;

    let mut tx = super::begin_write(pool).await?;

    let phase = sqlx::query_as::<_, asigest_common::models::Phase>(
        "SELECT * FROM phases WHERE phase_id = ?",
    )
    .bind(new.phase_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Phase {} not found", new.phase_id)))?;

    if let Some(operator_id) = new.operator_id {
        if !exists(&mut tx, "SELECT operator_id FROM operators WHERE operator_id = ?", operator_id).await? {
            return Err(Error::NotFound(format!("Operator {} not found", operator_id)));
        }
    }
    if let Some(machine_id) = new.machine_id {
        if !exists(&mut tx, "SELECT machine_id FROM machines WHERE machine_id = ?", machine_id).await? {
            return Err(Error::NotFound(format!("Machine {} not found", machine_id)));
        }
    }

    if !phase.state.accepts_batches() {
        warn!("Rejected batch on phase {} in state {}", phase.phase_id, phase.state);
        return Err(Error::InvalidState(format!(
            "Cannot open a batch on phase {} in state {}",
            phase.phase_id, phase.state
        )));
    }

    if phase.state == PhaseState::Open {
        phases::transition(&mut tx, &phase, PhaseState::InProgress).await?;
    }

    let now = asigest_common::time::now();

    let id = sqlx::query(
        r#"
        INSERT INTO batches (
            phase_id, progressive, started_at, created_at, updated_at,
            input_qty, output_qty, scrap_qty, operator_id, machine_id,
            feeder_program, setup_minutes, scrap_kind, scrap_notes, notes
        )
        SELECT ?, COALESCE(MAX(progressive), 0) + 1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
        FROM batches
        WHERE phase_id = ?
        "#,
    )
    .bind(new.phase_id)
    .bind(now)
    .bind(now)
    .bind(now)
    .bind(new.input_qty)
    .bind(new.output_qty.unwrap_or(0))
    .bind(new.scrap_qty.unwrap_or(0))
    .bind(new.operator_id)
    .bind(new.machine_id)
    .bind(&new.feeder_program)
    .bind(new.setup_minutes)
    .bind(&new.scrap_kind)
    .bind(&new.scrap_notes)
    .bind(&new.notes)
    .bind(new.phase_id)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let progressive: i64 = sqlx::query_scalar("SELECT progressive FROM batches WHERE batch_id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    let details = format!("progressive {} on phase {}", progressive, new.phase_id);
    events::record(
        &mut *tx,
        events::BATCH_CREATED,
        events::ENTITY_BATCH,
        Some(id),
        Some(&details),
    )
    .await?;

    tx.commit().await?;

    info!("Opened batch {} (#{}) on phase {}", id, progressive, new.phase_id);

    get(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Batch {} vanished after insert", id)))
}

async fn fetch_for_update(conn: &mut SqliteConnection, batch_id: i64) -> Result<Batch> {
    sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE batch_id = ?")
        .bind(batch_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Batch {} not found", batch_id)))
}

/// Record final counts and the end timestamp
pub async fn close(pool: &SqlitePool, batch_id: i64, counts: &BatchClose) -> Result<Batch> {
    counts.validate()?;

    let mut tx = super::begin_write(pool).await?;
    let batch = fetch_for_update(&mut tx, batch_id).await?;

    if !batch.is_open() {
        warn!("Rejected close of batch {}: already closed", batch_id);
        return Err(Error::InvalidState(format!("Batch {} is already closed", batch_id)));
    }

    let now = asigest_common::time::now();
    sqlx::query(
        r#"
        UPDATE batches
        SET ended_at = ?, output_qty = ?, scrap_qty = ?, notes = COALESCE(?, notes), updated_at = ?
        WHERE batch_id = ?
        "#,
    )
    .bind(now)
    .bind(counts.output_qty)
    .bind(counts.scrap_qty)
    .bind(&counts.notes)
    .bind(now)
    .bind(batch_id)
    .execute(&mut *tx)
    .await?;

    let details = format!("output {}, scrap {}", counts.output_qty, counts.scrap_qty);
    events::record(
        &mut *tx,
        events::BATCH_CLOSED,
        events::ENTITY_BATCH,
        Some(batch_id),
        Some(&details),
    )
    .await?;

    tx.commit().await?;

    info!(
        "Closed batch {} (#{}) on phase {}: output {}, scrap {}",
        batch_id, batch.progressive, batch.phase_id, counts.output_qty, counts.scrap_qty
    );

    get(pool, batch_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Batch {} not found", batch_id)))
}

/// Hard delete of an open batch
pub async fn delete(pool: &SqlitePool, batch_id: i64) -> Result<()> {
    let mut tx = super::begin_write(pool).await?;
    let batch = fetch_for_update(&mut tx, batch_id).await?;

    if !batch.is_open() {
        warn!("Rejected delete of closed batch {}", batch_id);
        return Err(Error::InvalidState(format!(
            "Batch {} is closed and cannot be deleted",
            batch_id
        )));
    }

    sqlx::query("DELETE FROM batches WHERE batch_id = ?")
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;

    let details = format!("progressive {} on phase {}", batch.progressive, batch.phase_id);
    events::record(
        &mut *tx,
        events::BATCH_DELETED,
        events::ENTITY_BATCH,
        Some(batch_id),
        Some(&details),
    )
    .await?;

    tx.commit().await?;

    info!("Deleted batch {}", batch_id);
    Ok(())
}
