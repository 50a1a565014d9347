//! Work-order technical configuration (ConfigCommessa)
//!
//! One configuration per ERP order. Every change is written to the event log
//! on the same transaction.

use asigest_common::models::WorkOrderConfig;
use asigest_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use super::{events, fetch_page, Filters};
use crate::pagination::{Paged, Pagination};
use crate::validate;

#[derive(Debug, Clone, Deserialize)]
pub struct NewWorkOrderConfig {
    /// `Progressivo` of the ERP order
    pub erp_order_id: i64,
    pub article_code: Option<String>,
    pub description: Option<String>,
    #[serde(default = "super::default_true")]
    pub flag_smd: bool,
    #[serde(default)]
    pub flag_pth: bool,
    #[serde(default = "super::default_true")]
    pub flag_inspection: bool,
    #[serde(default)]
    pub flag_subcontractor: bool,
    pub bom_code: Option<String>,
    pub revision: Option<String>,
    #[serde(default)]
    pub documentation_locked: bool,
    pub notes: Option<String>,
    /// Free-form structured settings, stored as JSON text
    pub config_json: Option<serde_json::Value>,
    pub modified_by: Option<String>,
}

impl NewWorkOrderConfig {
    pub fn validate(&self) -> Result<()> {
        validate::positive("erp_order_id", Some(self.erp_order_id))?;
        validate::max_length("article_code", self.article_code.as_deref(), 50)?;
        validate::max_length("description", self.description.as_deref(), 200)?;
        validate::max_length("bom_code", self.bom_code.as_deref(), 100)?;
        validate::max_length("revision", self.revision.as_deref(), 50)?;
        validate::max_length("modified_by", self.modified_by.as_deref(), 50)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkOrderConfigUpdate {
    pub description: Option<String>,
    pub notes: Option<String>,
    pub flag_smd: Option<bool>,
    pub flag_pth: Option<bool>,
    pub flag_inspection: Option<bool>,
    pub flag_subcontractor: Option<bool>,
    pub bom_code: Option<String>,
    pub revision: Option<String>,
    pub documentation_locked: Option<bool>,
    pub config_json: Option<serde_json::Value>,
    pub active: Option<bool>,
    pub modified_by: Option<String>,
}

impl WorkOrderConfigUpdate {
    pub fn validate(&self) -> Result<()> {
        validate::max_length("description", self.description.as_deref(), 200)?;
        validate::max_length("bom_code", self.bom_code.as_deref(), 100)?;
        validate::max_length("revision", self.revision.as_deref(), 50)?;
        validate::max_length("modified_by", self.modified_by.as_deref(), 50)
    }

    /// Names of the fields present in the request, for the audit trail
    fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut note = |present: bool, name: &'static str| {
            if present {
                fields.push(name);
            }
        };
        note(self.description.is_some(), "description");
        note(self.notes.is_some(), "notes");
        note(self.flag_smd.is_some(), "flag_smd");
        note(self.flag_pth.is_some(), "flag_pth");
        note(self.flag_inspection.is_some(), "flag_inspection");
        note(self.flag_subcontractor.is_some(), "flag_subcontractor");
        note(self.bom_code.is_some(), "bom_code");
        note(self.revision.is_some(), "revision");
        note(self.documentation_locked.is_some(), "documentation_locked");
        note(self.config_json.is_some(), "config_json");
        note(self.active.is_some(), "active");
        fields
    }
}

/// Configuration plus the phase types already instantiated for its order
#[derive(Debug, Clone, Serialize)]
pub struct WorkOrderConfigDetail {
    #[serde(flatten)]
    pub config: WorkOrderConfig,
    pub phase_type_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkOrderConfigFilter {
    pub active: Option<bool>,
}

pub async fn list(
    pool: &SqlitePool,
    filter: &WorkOrderConfigFilter,
    pagination: Pagination,
) -> Result<Paged<WorkOrderConfig>> {
    let filters = Filters::new().eq("active", filter.active);

    fetch_page(
        pool,
        "SELECT * FROM work_order_configs",
        "FROM work_order_configs",
        &filters,
        "config_id DESC",
        pagination,
    )
    .await
}

pub async fn get(pool: &SqlitePool, config_id: i64) -> Result<Option<WorkOrderConfig>> {
    let config =
        sqlx::query_as::<_, WorkOrderConfig>("SELECT * FROM work_order_configs WHERE config_id = ?")
            .bind(config_id)
            .fetch_optional(pool)
            .await?;

    Ok(config)
}

pub async fn get_detail(pool: &SqlitePool, config_id: i64) -> Result<Option<WorkOrderConfigDetail>> {
    let Some(config) = get(pool, config_id).await? else {
        return Ok(None);
    };

    let phase_type_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT DISTINCT phase_type_id FROM phases WHERE erp_order_id = ? ORDER BY phase_type_id",
    )
    .bind(config.erp_order_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(WorkOrderConfigDetail {
        config,
        phase_type_ids,
    }))
}

fn json_text(value: &Option<serde_json::Value>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

pub async fn create(pool: &SqlitePool, new: &NewWorkOrderConfig) -> Result<WorkOrderConfig> {
    new.validate()?;

    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM work_order_configs WHERE erp_order_id = ?")
            .bind(new.erp_order_id)
            .fetch_one(pool)
            .await?;
    if existing > 0 {
        return Err(Error::InvalidInput(format!(
            "Configuration for ERP order {} already exists",
            new.erp_order_id
        )));
    }

    let mut tx = super::begin_write(pool).await?;

    let id = sqlx::query(
        r#"
        INSERT INTO work_order_configs (
            erp_order_id, article_code, description, flag_smd, flag_pth,
            flag_inspection, flag_subcontractor, bom_code, revision,
            documentation_locked, notes, config_json, active, created_at, modified_by
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(new.erp_order_id)
    .bind(&new.article_code)
    .bind(&new.description)
    .bind(new.flag_smd)
    .bind(new.flag_pth)
    .bind(new.flag_inspection)
    .bind(new.flag_subcontractor)
    .bind(&new.bom_code)
    .bind(&new.revision)
    .bind(new.documentation_locked)
    .bind(&new.notes)
    .bind(json_text(&new.config_json))
    .bind(asigest_common::time::now())
    .bind(&new.modified_by)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let details = format!("ERP order {}", new.erp_order_id);
    events::record(
        &mut *tx,
        events::CONFIG_CREATED,
        events::ENTITY_CONFIG,
        Some(id),
        Some(&details),
    )
    .await?;

    tx.commit().await?;

    info!("Created configuration {} for ERP order {}", id, new.erp_order_id);

    get(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Configuration {} vanished after insert", id)))
}

pub async fn update(
    pool: &SqlitePool,
    config_id: i64,
    changes: &WorkOrderConfigUpdate,
) -> Result<WorkOrderConfig> {
    changes.validate()?;

    let mut current = get(pool, config_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Configuration {} not found", config_id)))?;

    if changes.description.is_some() {
        current.description = changes.description.clone();
    }
    if changes.notes.is_some() {
        current.notes = changes.notes.clone();
    }
    if changes.bom_code.is_some() {
        current.bom_code = changes.bom_code.clone();
    }
    if changes.revision.is_some() {
        current.revision = changes.revision.clone();
    }
    if changes.config_json.is_some() {
        current.config_json = json_text(&changes.config_json);
    }
    if changes.modified_by.is_some() {
        current.modified_by = changes.modified_by.clone();
    }
    current.flag_smd = changes.flag_smd.unwrap_or(current.flag_smd);
    current.flag_pth = changes.flag_pth.unwrap_or(current.flag_pth);
    current.flag_inspection = changes.flag_inspection.unwrap_or(current.flag_inspection);
    current.flag_subcontractor = changes
        .flag_subcontractor
        .unwrap_or(current.flag_subcontractor);
    current.documentation_locked = changes
        .documentation_locked
        .unwrap_or(current.documentation_locked);
    current.active = changes.active.unwrap_or(current.active);

    let kind = if changes.active == Some(false) && changes.changed_fields() == ["active"] {
        events::CONFIG_DEACTIVATED
    } else {
        events::CONFIG_MODIFIED
    };

    let mut tx = super::begin_write(pool).await?;

    sqlx::query(
        r#"
        UPDATE work_order_configs
        SET description = ?, notes = ?, flag_smd = ?, flag_pth = ?, flag_inspection = ?,
            flag_subcontractor = ?, bom_code = ?, revision = ?, documentation_locked = ?,
            config_json = ?, active = ?, modified_by = ?, updated_at = ?
        WHERE config_id = ?
        "#,
    )
    .bind(&current.description)
    .bind(&current.notes)
    .bind(current.flag_smd)
    .bind(current.flag_pth)
    .bind(current.flag_inspection)
    .bind(current.flag_subcontractor)
    .bind(&current.bom_code)
    .bind(&current.revision)
    .bind(current.documentation_locked)
    .bind(&current.config_json)
    .bind(current.active)
    .bind(&current.modified_by)
    .bind(asigest_common::time::now())
    .bind(config_id)
    .execute(&mut *tx)
    .await?;

    let details = format!("fields: {}", changes.changed_fields().join(", "));
    events::record(
        &mut *tx,
        kind,
        events::ENTITY_CONFIG,
        Some(config_id),
        Some(&details),
    )
    .await?;

    tx.commit().await?;

    get(pool, config_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Configuration {} not found", config_id)))
}

/// Soft delete
pub async fn deactivate(pool: &SqlitePool, config_id: i64) -> Result<()> {
    update(
        pool,
        config_id,
        &WorkOrderConfigUpdate {
            active: Some(false),
            ..Default::default()
        },
    )
    .await?;

    info!("Deactivated configuration {}", config_id);
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample(erp_order_id: i64) -> NewWorkOrderConfig {
    NewWorkOrderConfig {
        erp_order_id,
        article_code: Some("ART-100".to_string()),
        description: Some("Scheda controllo".to_string()),
        flag_smd: true,
        flag_pth: false,
        flag_inspection: true,
        flag_subcontractor: false,
        bom_code: None,
        revision: None,
        documentation_locked: false,
        notes: None,
        config_json: None,
        modified_by: None,
    }
}
