//! Production phases (fasi)
//!
//! A phase moves through APERTA → IN_CORSO → CHIUSA, with BLOCCATA as a
//! hold state and CHIUSA → APERTA as the reopen path. See
//! [`PhaseState::can_transition_to`] for the full table.
//!
//! Closing derives the produced and remaining quantities from the batches,
//! so a phase can only be closed once every batch is closed.

use asigest_common::models::Phase;
use asigest_common::{Error, PhaseState, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use super::{events, fetch_page, phase_types, work_orders, Filters};
use crate::pagination::{Paged, Pagination};
use crate::validate;

#[derive(Debug, Clone, Deserialize)]
pub struct NewPhase {
    pub config_id: i64,
    pub phase_type_id: i64,
    /// Customer order number
    pub order_number: String,
    pub quantity: i64,
    pub notes: Option<String>,
}

impl NewPhase {
    pub fn validate(&self) -> Result<()> {
        validate::required("order_number", &self.order_number, 50)?;
        validate::positive("quantity", Some(self.quantity))
    }
}

/// Partial update
///
/// `completed: true` closes the phase, `completed: false` reopens a closed
/// one. `state` requests an explicit transition; it must agree with
/// `completed` when both are given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhaseUpdate {
    pub quantity: Option<i64>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
    pub state: Option<PhaseState>,
}

impl PhaseUpdate {
    pub fn validate(&self) -> Result<()> {
        validate::positive("quantity", self.quantity)?;

        match (self.completed, self.state) {
            (Some(true), Some(state)) if state != PhaseState::Closed => Err(Error::InvalidInput(
                format!("completed=true conflicts with state {}", state),
            )),
            (Some(false), Some(PhaseState::Closed)) => Err(Error::InvalidInput(
                "completed=false conflicts with state CHIUSA".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// State requested by this update, given the current one
    fn target_state(&self, current: PhaseState) -> Option<PhaseState> {
        if let Some(state) = self.state {
            return Some(state);
        }
        match self.completed {
            Some(true) => Some(PhaseState::Closed),
            Some(false) if current == PhaseState::Closed => Some(PhaseState::Open),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PhaseFilter {
    /// Resolved to the configuration's ERP order
    pub config_id: Option<i64>,
    pub erp_order_id: Option<i64>,
    pub completed: Option<bool>,
    pub state: Option<PhaseState>,
}

/// Phase as listed, with the derived completion flag
#[derive(Debug, Clone, Serialize)]
pub struct PhaseView {
    #[serde(flatten)]
    pub phase: Phase,
    pub completed: bool,
}

impl From<Phase> for PhaseView {
    fn from(phase: Phase) -> Self {
        let completed = phase.is_completed();
        Self { phase, completed }
    }
}

/// Phase with its type, configuration and batch statistics
#[derive(Debug, Clone, Serialize)]
pub struct PhaseDetail {
    #[serde(flatten)]
    pub phase: Phase,
    pub completed: bool,
    pub phase_type_code: Option<String>,
    pub phase_type_description: Option<String>,
    pub phase_type_category: Option<String>,
    pub config_article_code: Option<String>,
    pub config_description: Option<String>,
    pub batch_count: i64,
    pub total_output: i64,
    pub total_scrap: i64,
}

pub async fn list(
    pool: &SqlitePool,
    filter: &PhaseFilter,
    pagination: Pagination,
) -> Result<Paged<PhaseView>> {
    let config_order = match filter.config_id {
        Some(config_id) => Some(
            work_orders::get(pool, config_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Configuration {} not found", config_id)))?
                .erp_order_id,
        ),
        None => None,
    };

    let closed = PhaseState::Closed.as_str();
    let filters = Filters::new()
        .eq("erp_order_id", config_order)
        .eq("erp_order_id", filter.erp_order_id)
        .eq("state", filter.completed.filter(|c| *c).map(|_| closed))
        .not_eq("state", filter.completed.filter(|c| !*c).map(|_| closed))
        .eq("state", filter.state.map(|s| s.as_str()));

    let page: Paged<Phase> = fetch_page(
        pool,
        "SELECT * FROM phases",
        "FROM phases",
        &filters,
        "phase_id DESC",
        pagination,
    )
    .await?;

    Ok(page.map(PhaseView::from))
}

pub async fn get(pool: &SqlitePool, phase_id: i64) -> Result<Option<Phase>> {
    let phase = sqlx::query_as::<_, Phase>("SELECT * FROM phases WHERE phase_id = ?")
        .bind(phase_id)
        .fetch_optional(pool)
        .await?;

    Ok(phase)
}

pub async fn get_detail(pool: &SqlitePool, phase_id: i64) -> Result<Option<PhaseDetail>> {
    let Some(phase) = get(pool, phase_id).await? else {
        return Ok(None);
    };

    let phase_type = phase_types::get(pool, phase.phase_type_id).await?;
    let config = match phase.config_id {
        Some(config_id) => work_orders::get(pool, config_id).await?,
        None => None,
    };

    let (batch_count, total_output, total_scrap): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(SUM(output_qty), 0), COALESCE(SUM(scrap_qty), 0)
        FROM batches
        WHERE phase_id = ?
        "#,
    )
    .bind(phase_id)
    .fetch_one(pool)
    .await?;

    Ok(Some(PhaseDetail {
        completed: phase.is_completed(),
        phase_type_code: phase_type.as_ref().map(|t| t.code.clone()),
        phase_type_description: phase_type.as_ref().map(|t| t.description.clone()),
        phase_type_category: phase_type.map(|t| t.category),
        config_article_code: config.as_ref().and_then(|c| c.article_code.clone()),
        config_description: config.and_then(|c| c.description),
        batch_count,
        total_output,
        total_scrap,
        phase,
    }))
}

pub async fn create(pool: &SqlitePool, new: &NewPhase) -> Result<Phase> {
    new.validate()?;

    let config = work_orders::get(pool, new.config_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Configuration {} not found", new.config_id)))?;

    let phase_type = phase_types::get(pool, new.phase_type_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Phase type {} not found", new.phase_type_id)))?;
    if !phase_type.active {
        return Err(Error::InvalidInput(format!(
            "Phase type {} is not active",
            phase_type.code
        )));
    }

    let now = asigest_common::time::now();
    let mut tx = super::begin_write(pool).await?;

    let id = sqlx::query(
        r#"
        INSERT INTO phases (
            erp_order_id, config_id, phase_type_id, order_number, state,
            quantity, planned_qty, notes, created_at, updated_at, opened_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(config.erp_order_id)
    .bind(config.config_id)
    .bind(phase_type.phase_type_id)
    .bind(&new.order_number)
    .bind(PhaseState::Open)
    .bind(new.quantity)
    .bind(new.quantity)
    .bind(&new.notes)
    .bind(now)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let details = format!("{} for ERP order {}", phase_type.code, config.erp_order_id);
    events::record(
        &mut *tx,
        events::PHASE_CREATED,
        events::ENTITY_PHASE,
        Some(id),
        Some(&details),
    )
    .await?;

    tx.commit().await?;

    info!("Created phase {} ({}) for ERP order {}", id, phase_type.code, config.erp_order_id);

    get(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Phase {} vanished after insert", id)))
}

async fn fetch_for_update(conn: &mut SqliteConnection, phase_id: i64) -> Result<Phase> {
    sqlx::query_as::<_, Phase>("SELECT * FROM phases WHERE phase_id = ?")
        .bind(phase_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Phase {} not found", phase_id)))
}

/// Apply a guarded state change on an open transaction
///
/// Same-state requests are a no-op and log nothing.
pub(crate) async fn transition(
    conn: &mut SqliteConnection,
    phase: &Phase,
    target: PhaseState,
) -> Result<()> {
    let current = phase.state;
    if current == target {
        return Ok(());
    }
    if !current.can_transition_to(target) {
        warn!("Rejected phase {} transition {} -> {}", phase.phase_id, current, target);
        return Err(Error::InvalidState(format!(
            "Phase {} cannot move from {} to {}",
            phase.phase_id, current, target
        )));
    }

    let now = asigest_common::time::now();

    match target {
        PhaseState::Closed => {
            let (open_batches, produced): (i64, i64) = sqlx::query_as(
                r#"
                SELECT COALESCE(SUM(CASE WHEN ended_at IS NULL THEN 1 ELSE 0 END), 0),
                       COALESCE(SUM(output_qty), 0)
                FROM batches
                WHERE phase_id = ?
                "#,
            )
            .bind(phase.phase_id)
            .fetch_one(&mut *conn)
            .await?;

            if open_batches > 0 {
                warn!("Rejected close of phase {}: {} open batches", phase.phase_id, open_batches);
                return Err(Error::InvalidState(format!(
                    "Phase {} has {} open batches; close them first",
                    phase.phase_id, open_batches
                )));
            }

            let remaining = phase
                .planned_qty
                .or(phase.quantity)
                .map(|planned| (planned - produced).max(0));

            sqlx::query(
                r#"
                UPDATE phases
                SET state = ?, closed_at = ?, produced_qty = ?, remaining_qty = ?, updated_at = ?
                WHERE phase_id = ?
                "#,
            )
            .bind(target)
            .bind(now)
            .bind(produced)
            .bind(remaining)
            .bind(now)
            .bind(phase.phase_id)
            .execute(&mut *conn)
            .await?;
        }
        _ => {
            // Leaving CHIUSA clears the close timestamp
            sqlx::query(
                r#"
                UPDATE phases
                SET state = ?, closed_at = CASE WHEN ? THEN NULL ELSE closed_at END, updated_at = ?
                WHERE phase_id = ?
                "#,
            )
            .bind(target)
            .bind(current == PhaseState::Closed)
            .bind(now)
            .bind(phase.phase_id)
            .execute(&mut *conn)
            .await?;
        }
    }

    let details = format!("{} -> {}", current, target);
    events::record(
        &mut *conn,
        events::PHASE_STATE_CHANGED,
        events::ENTITY_PHASE,
        Some(phase.phase_id),
        Some(&details),
    )
    .await?;

    info!("Phase {} moved {} -> {}", phase.phase_id, current, target);

    Ok(())
}

pub async fn update(pool: &SqlitePool, phase_id: i64, changes: &PhaseUpdate) -> Result<Phase> {
    changes.validate()?;

    let mut tx = super::begin_write(pool).await?;
    let phase = fetch_for_update(&mut tx, phase_id).await?;

    if changes.quantity.is_some() || changes.notes.is_some() {
        // A closed phase keeps remaining = max(planned - produced, 0)
        sqlx::query(
            r#"
            UPDATE phases
            SET quantity = COALESCE(?1, quantity),
                planned_qty = COALESCE(?1, planned_qty),
                remaining_qty = CASE
                    WHEN ?1 IS NOT NULL AND state = ?2
                        THEN MAX(?1 - COALESCE(produced_qty, 0), 0)
                    ELSE remaining_qty
                END,
                notes = COALESCE(?3, notes),
                updated_at = ?4
            WHERE phase_id = ?5
            "#,
        )
        .bind(changes.quantity)
        .bind(PhaseState::Closed)
        .bind(&changes.notes)
        .bind(asigest_common::time::now())
        .bind(phase_id)
        .execute(&mut *tx)
        .await?;
    }

    if let Some(target) = changes.target_state(phase.state) {
        // Re-read so the close derivation sees the new planned quantity
        let phase = fetch_for_update(&mut tx, phase_id).await?;
        transition(&mut tx, &phase, target).await?;
    }

    tx.commit().await?;

    get(pool, phase_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Phase {} not found", phase_id)))
}

/// Hard delete, allowed only for APERTA phases without batches
pub async fn delete(pool: &SqlitePool, phase_id: i64) -> Result<()> {
    let mut tx = super::begin_write(pool).await?;
    let phase = fetch_for_update(&mut tx, phase_id).await?;

    if phase.state != PhaseState::Open {
        warn!("Rejected delete of phase {} in state {}", phase_id, phase.state);
        return Err(Error::InvalidState(format!(
            "Cannot delete phase in state {}; close it instead",
            phase.state
        )));
    }

    let batch_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE phase_id = ?")
        .bind(phase_id)
        .fetch_one(&mut *tx)
        .await?;
    if batch_count > 0 {
        warn!("Rejected delete of phase {} with {} batches", phase_id, batch_count);
        return Err(Error::InvalidState(format!(
            "Cannot delete phase with {} associated batches",
            batch_count
        )));
    }

    sqlx::query("DELETE FROM phases WHERE phase_id = ?")
        .bind(phase_id)
        .execute(&mut *tx)
        .await?;

    let details = format!("ERP order {}", phase.erp_order_id);
    events::record(
        &mut *tx,
        events::PHASE_DELETED,
        events::ENTITY_PHASE,
        Some(phase_id),
        Some(&details),
    )
    .await?;

    tx.commit().await?;

    info!("Deleted phase {}", phase_id);
    Ok(())
}

#[cfg(test)]
pub(crate) async fn seed(pool: &SqlitePool, erp_order_id: i64, quantity: i64) -> Phase {
    let phase_type = phase_types::create(pool, &phase_types::sample(&format!("T{}", erp_order_id)))
        .await
        .unwrap();
    let config = work_orders::create(pool, &work_orders::sample(erp_order_id))
        .await
        .unwrap();
    create(
        pool,
        &NewPhase {
            config_id: config.config_id,
            phase_type_id: phase_type.phase_type_id,
            order_number: format!("ORD-{}", erp_order_id),
            quantity,
            notes: None,
        },
    )
    .await
    .unwrap()
}
