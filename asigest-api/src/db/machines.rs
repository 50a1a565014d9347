//! Machine (macchina) master data

use asigest_common::models::Machine;
use asigest_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;

use super::{fetch_page, Filters};
use crate::pagination::{Paged, Pagination};
use crate::validate;

#[derive(Debug, Clone, Deserialize)]
pub struct NewMachine {
    pub code: String,
    pub description: Option<String>,
    pub department: String,
    pub kind: Option<String>,
    pub notes: Option<String>,
    #[serde(default = "super::default_true")]
    pub active: bool,
}

impl NewMachine {
    pub fn validate(&self) -> Result<()> {
        validate::required("code", &self.code, 50)?;
        validate::max_length("description", self.description.as_deref(), 100)?;
        validate::required("department", &self.department, 50)?;
        validate::max_length("kind", self.kind.as_deref(), 50)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MachineUpdate {
    pub code: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub kind: Option<String>,
    pub notes: Option<String>,
    pub active: Option<bool>,
}

impl MachineUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(code) = &self.code {
            validate::required("code", code, 50)?;
        }
        if let Some(department) = &self.department {
            validate::required("department", department, 50)?;
        }
        validate::max_length("description", self.description.as_deref(), 100)?;
        validate::max_length("kind", self.kind.as_deref(), 50)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MachineFilter {
    pub department: Option<String>,
    pub active: Option<bool>,
}

pub async fn list(
    pool: &SqlitePool,
    filter: &MachineFilter,
    pagination: Pagination,
) -> Result<Paged<Machine>> {
    let filters = Filters::new()
        .eq("department", filter.department.clone())
        .eq("active", filter.active);

    fetch_page(
        pool,
        "SELECT * FROM machines",
        "FROM machines",
        &filters,
        "code",
        pagination,
    )
    .await
}

pub async fn get(pool: &SqlitePool, machine_id: i64) -> Result<Option<Machine>> {
    let machine = sqlx::query_as::<_, Machine>("SELECT * FROM machines WHERE machine_id = ?")
        .bind(machine_id)
        .fetch_optional(pool)
        .await?;

    Ok(machine)
}

async fn code_taken(pool: &SqlitePool, code: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM machines WHERE code = ?")
        .bind(code)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn create(pool: &SqlitePool, new: &NewMachine) -> Result<Machine> {
    new.validate()?;

    if code_taken(pool, &new.code).await? {
        return Err(Error::InvalidInput(format!(
            "Machine code '{}' already exists",
            new.code
        )));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO machines (code, description, department, kind, notes, active, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.code)
    .bind(&new.description)
    .bind(&new.department)
    .bind(&new.kind)
    .bind(&new.notes)
    .bind(new.active)
    .bind(asigest_common::time::now())
    .execute(pool)
    .await?
    .last_insert_rowid();

    get(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Machine {} vanished after insert", id)))
}

pub async fn update(pool: &SqlitePool, machine_id: i64, changes: &MachineUpdate) -> Result<Machine> {
    changes.validate()?;

    let mut current = get(pool, machine_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Machine {} not found", machine_id)))?;

    if let Some(code) = &changes.code {
        if *code != current.code && code_taken(pool, code).await? {
            return Err(Error::InvalidInput(format!(
                "Machine code '{}' already exists",
                code
            )));
        }
        current.code = code.clone();
    }
    if let Some(department) = &changes.department {
        current.department = department.clone();
    }
    if changes.description.is_some() {
        current.description = changes.description.clone();
    }
    if changes.kind.is_some() {
        current.kind = changes.kind.clone();
    }
    if changes.notes.is_some() {
        current.notes = changes.notes.clone();
    }
    current.active = changes.active.unwrap_or(current.active);

    sqlx::query(
        r#"
        UPDATE machines
        SET code = ?, description = ?, department = ?, kind = ?, notes = ?, active = ?
        WHERE machine_id = ?
        "#,
    )
    .bind(&current.code)
    .bind(&current.description)
    .bind(&current.department)
    .bind(&current.kind)
    .bind(&current.notes)
    .bind(current.active)
    .bind(machine_id)
    .execute(pool)
    .await?;

    Ok(current)
}

/// Soft delete
pub async fn deactivate(pool: &SqlitePool, machine_id: i64) -> Result<Machine> {
    update(
        pool,
        machine_id,
        &MachineUpdate {
            active: Some(false),
            ..Default::default()
        },
    )
    .await
}

#[cfg(test)]
pub(crate) fn sample(code: &str) -> NewMachine {
    NewMachine {
        code: code.to_string(),
        description: Some("Pick and place".to_string()),
        department: "SMD".to_string(),
        kind: Some("P&P".to_string()),
        notes: None,
        active: true,
    }
}
