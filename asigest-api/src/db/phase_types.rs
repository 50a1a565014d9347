//! Phase type master data

use asigest_common::models::PhaseType;
use asigest_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;

use super::{fetch_page, Filters};
use crate::pagination::{Paged, Pagination};
use crate::validate;

pub const CATEGORIES: [&str; 4] = ["SMD", "PTH", "CONTROLLO", "ALTRO"];

fn validate_category(category: &str) -> Result<()> {
    if CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "category must be one of {}",
            CATEGORIES.join(", ")
        )))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPhaseType {
    pub code: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub requires_serial: bool,
    #[serde(default)]
    pub requires_inspection: bool,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default = "super::default_true")]
    pub active: bool,
}

impl NewPhaseType {
    pub fn validate(&self) -> Result<()> {
        validate::required("code", &self.code, 20)?;
        validate::required("description", &self.description, 100)?;
        validate_category(&self.category)
    }
}

/// Partial update; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhaseTypeUpdate {
    pub code: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub requires_serial: Option<bool>,
    pub requires_inspection: Option<bool>,
    pub display_order: Option<i64>,
    pub active: Option<bool>,
}

impl PhaseTypeUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(code) = &self.code {
            validate::required("code", code, 20)?;
        }
        if let Some(description) = &self.description {
            validate::required("description", description, 100)?;
        }
        if let Some(category) = &self.category {
            validate_category(category)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PhaseTypeFilter {
    pub category: Option<String>,
    pub active: Option<bool>,
}

pub async fn list(
    pool: &SqlitePool,
    filter: &PhaseTypeFilter,
    pagination: Pagination,
) -> Result<Paged<PhaseType>> {
    let filters = Filters::new()
        .eq("category", filter.category.clone())
        .eq("active", filter.active);

    fetch_page(
        pool,
        "SELECT * FROM phase_types",
        "FROM phase_types",
        &filters,
        "display_order, code",
        pagination,
    )
    .await
}

pub async fn get(pool: &SqlitePool, phase_type_id: i64) -> Result<Option<PhaseType>> {
    let phase_type =
        sqlx::query_as::<_, PhaseType>("SELECT * FROM phase_types WHERE phase_type_id = ?")
            .bind(phase_type_id)
            .fetch_optional(pool)
            .await?;

    Ok(phase_type)
}

async fn code_taken(pool: &SqlitePool, code: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM phase_types WHERE code = ?")
        .bind(code)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn create(pool: &SqlitePool, new: &NewPhaseType) -> Result<PhaseType> {
    new.validate()?;

    if code_taken(pool, &new.code).await? {
        return Err(Error::InvalidInput(format!(
            "Phase type code '{}' already exists",
            new.code
        )));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO phase_types (
            code, description, category, requires_serial, requires_inspection,
            display_order, active, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.code)
    .bind(&new.description)
    .bind(&new.category)
    .bind(new.requires_serial)
    .bind(new.requires_inspection)
    .bind(new.display_order)
    .bind(new.active)
    .bind(asigest_common::time::now())
    .execute(pool)
    .await?
    .last_insert_rowid();

    get(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Phase type {} vanished after insert", id)))
}

pub async fn update(pool: &SqlitePool, phase_type_id: i64, changes: &PhaseTypeUpdate) -> Result<PhaseType> {
    changes.validate()?;

    let mut current = get(pool, phase_type_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Phase type {} not found", phase_type_id)))?;

    if let Some(code) = &changes.code {
        if *code != current.code && code_taken(pool, code).await? {
            return Err(Error::InvalidInput(format!(
                "Phase type code '{}' already exists",
                code
            )));
        }
        current.code = code.clone();
    }
    if let Some(description) = &changes.description {
        current.description = description.clone();
    }
    if let Some(category) = &changes.category {
        current.category = category.clone();
    }
    current.requires_serial = changes.requires_serial.unwrap_or(current.requires_serial);
    current.requires_inspection = changes
        .requires_inspection
        .unwrap_or(current.requires_inspection);
    current.display_order = changes.display_order.unwrap_or(current.display_order);
    current.active = changes.active.unwrap_or(current.active);

    sqlx::query(
        r#"
        UPDATE phase_types
        SET code = ?, description = ?, category = ?, requires_serial = ?,
            requires_inspection = ?, display_order = ?, active = ?, updated_at = ?
        WHERE phase_type_id = ?
        "#,
    )
    .bind(&current.code)
    .bind(&current.description)
    .bind(&current.category)
    .bind(current.requires_serial)
    .bind(current.requires_inspection)
    .bind(current.display_order)
    .bind(current.active)
    .bind(asigest_common::time::now())
    .bind(phase_type_id)
    .execute(pool)
    .await?;

    get(pool, phase_type_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Phase type {} not found", phase_type_id)))
}

/// Soft delete
pub async fn deactivate(pool: &SqlitePool, phase_type_id: i64) -> Result<PhaseType> {
    update(
        pool,
        phase_type_id,
        &PhaseTypeUpdate {
            active: Some(false),
            ..Default::default()
        },
    )
    .await
}

#[cfg(test)]
pub(crate) fn sample(code: &str) -> NewPhaseType {
    NewPhaseType {
        code: code.to_string(),
        description: format!("Fase {}", code),
        category: "SMD".to_string(),
        requires_serial: false,
        requires_inspection: false,
        display_order: 0,
        active: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_create_and_get() {
        let pool = test_pool().await;
        let created = create(&pool, &sample("SMD-TOP")).await.unwrap();

        let loaded = get(&pool, created.phase_type_id).await.unwrap().unwrap();
        assert_eq!(loaded.code, "SMD-TOP");
        assert!(loaded.active);
        assert!(loaded.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let pool = test_pool().await;
        create(&pool, &sample("PTH")).await.unwrap();

        let result = create(&pool, &sample("PTH")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unknown_category_rejected() {
        let pool = test_pool().await;
        let mut new = sample("X");
        new.category = "SALDATURA".to_string();
        assert!(matches!(create(&pool, &new).await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_update_code_collision() {
        let pool = test_pool().await;
        create(&pool, &sample("A")).await.unwrap();
        let b = create(&pool, &sample("B")).await.unwrap();

        let changes = PhaseTypeUpdate {
            code: Some("A".to_string()),
            ..Default::default()
        };
        let result = update(&pool, b.phase_type_id, &changes).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        // Same code is not a collision with itself
        let changes = PhaseTypeUpdate {
            code: Some("B".to_string()),
            display_order: Some(4),
            ..Default::default()
        };
        let updated = update(&pool, b.phase_type_id, &changes).await.unwrap();
        assert_eq!(updated.display_order, 4);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_deactivate_keeps_row() {
        let pool = test_pool().await;
        let created = create(&pool, &sample("CV")).await.unwrap();

        let deactivated = deactivate(&pool, created.phase_type_id).await.unwrap();
        assert!(!deactivated.active);

        let filter = PhaseTypeFilter {
            active: Some(true),
            ..Default::default()
        };
        let page = list(&pool, &filter, Pagination::from_params(None, None).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let pool = test_pool().await;
        let result = deactivate(&pool, 99).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
