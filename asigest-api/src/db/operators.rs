//! Operator (utente) master data

use asigest_common::models::Operator;
use asigest_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;

use super::{fetch_page, Filters};
use crate::pagination::{Paged, Pagination};
use crate::validate;

#[derive(Debug, Clone, Deserialize)]
pub struct NewOperator {
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    /// OPERATORE, SUPERVISOR, ADMIN
    pub role: Option<String>,
    #[serde(default = "super::default_true")]
    pub active: bool,
}

impl NewOperator {
    pub fn validate(&self) -> Result<()> {
        validate::length_between("username", &self.username, 3, 50)?;
        validate::required("full_name", &self.full_name, 100)?;
        validate::max_length("email", self.email.as_deref(), 100)?;
        validate::max_length("department", self.department.as_deref(), 50)?;
        validate::max_length("role", self.role.as_deref(), 50)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperatorUpdate {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

impl OperatorUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(username) = &self.username {
            validate::length_between("username", username, 3, 50)?;
        }
        if let Some(full_name) = &self.full_name {
            validate::required("full_name", full_name, 100)?;
        }
        validate::max_length("email", self.email.as_deref(), 100)?;
        validate::max_length("department", self.department.as_deref(), 50)?;
        validate::max_length("role", self.role.as_deref(), 50)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OperatorFilter {
    pub department: Option<String>,
    pub active: Option<bool>,
}

pub async fn list(
    pool: &SqlitePool,
    filter: &OperatorFilter,
    pagination: Pagination,
) -> Result<Paged<Operator>> {
    let filters = Filters::new()
        .eq("department", filter.department.clone())
        .eq("active", filter.active);

    fetch_page(
        pool,
        "SELECT * FROM operators",
        "FROM operators",
        &filters,
        "username",
        pagination,
    )
    .await
}

pub async fn get(pool: &SqlitePool, operator_id: i64) -> Result<Option<Operator>> {
    let operator = sqlx::query_as::<_, Operator>("SELECT * FROM operators WHERE operator_id = ?")
        .bind(operator_id)
        .fetch_optional(pool)
        .await?;

    Ok(operator)
}

async fn username_taken(pool: &SqlitePool, username: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM operators WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn create(pool: &SqlitePool, new: &NewOperator) -> Result<Operator> {
    new.validate()?;

    if username_taken(pool, &new.username).await? {
        return Err(Error::InvalidInput(format!(
            "Username '{}' already exists",
            new.username
        )));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO operators (username, full_name, email, department, role, active, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.username)
    .bind(&new.full_name)
    .bind(&new.email)
    .bind(&new.department)
    .bind(&new.role)
    .bind(new.active)
    .bind(asigest_common::time::now())
    .execute(pool)
    .await?
    .last_insert_rowid();

    get(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Operator {} vanished after insert", id)))
}

pub async fn update(pool: &SqlitePool, operator_id: i64, changes: &OperatorUpdate) -> Result<Operator> {
    changes.validate()?;

    let mut current = get(pool, operator_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Operator {} not found", operator_id)))?;

    if let Some(username) = &changes.username {
        if *username != current.username && username_taken(pool, username).await? {
            return Err(Error::InvalidInput(format!(
                "Username '{}' already exists",
                username
            )));
        }
        current.username = username.clone();
    }
    if let Some(full_name) = &changes.full_name {
        current.full_name = full_name.clone();
    }
    if changes.email.is_some() {
        current.email = changes.email.clone();
    }
    if changes.department.is_some() {
        current.department = changes.department.clone();
    }
    if changes.role.is_some() {
        current.role = changes.role.clone();
    }
    current.active = changes.active.unwrap_or(current.active);

    sqlx::query(
        r#"
        UPDATE operators
        SET username = ?, full_name = ?, email = ?, department = ?, role = ?, active = ?
        WHERE operator_id = ?
        "#,
    )
    .bind(&current.username)
    .bind(&current.full_name)
    .bind(&current.email)
    .bind(&current.department)
    .bind(&current.role)
    .bind(current.active)
    .bind(operator_id)
    .execute(pool)
    .await?;

    Ok(current)
}

/// Soft delete
pub async fn deactivate(pool: &SqlitePool, operator_id: i64) -> Result<Operator> {
    update(
        pool,
        operator_id,
        &OperatorUpdate {
            active: Some(false),
            ..Default::default()
        },
    )
    .await
}

#[cfg(test)]
pub(crate) fn sample(username: &str) -> NewOperator {
    NewOperator {
        username: username.to_string(),
        full_name: "Mario Rossi".to_string(),
        email: None,
        department: Some("SMD".to_string()),
        role: Some("OPERATORE".to_string()),
        active: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_create_and_list_ordered_by_username() {
        let pool = test_pool().await;
        create(&pool, &sample("zeta")).await.unwrap();
        create(&pool, &sample("alfa")).await.unwrap();

        let page = list(&pool, &OperatorFilter::default(), Pagination::from_params(None, None).unwrap())
            .await
            .unwrap();
        let names: Vec<_> = page.items.iter().map(|o| o.username.as_str()).collect();
        assert_eq!(names, vec!["alfa", "zeta"]);
    }

    #[tokio::test]
    async fn test_short_username_rejected() {
        let pool = test_pool().await;
        let result = create(&pool, &sample("mr")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let pool = test_pool().await;
        create(&pool, &sample("mrossi")).await.unwrap();
        let result = create(&pool, &sample("mrossi")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_rename_collision_rejected() {
        let pool = test_pool().await;
        create(&pool, &sample("mrossi")).await.unwrap();
        let other = create(&pool, &sample("lbianchi")).await.unwrap();

        let changes = OperatorUpdate {
            username: Some("mrossi".to_string()),
            ..Default::default()
        };
        let result = update(&pool, other.operator_id, &changes).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_filter_by_department() {
        let pool = test_pool().await;
        create(&pool, &sample("mrossi")).await.unwrap();
        let mut pth = sample("gverdi");
        pth.department = Some("PTH".to_string());
        create(&pool, &pth).await.unwrap();

        let filter = OperatorFilter {
            department: Some("PTH".to_string()),
            ..Default::default()
        };
        let page = list(&pool, &filter, Pagination::from_params(None, None).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].username, "gverdi");
    }

    #[tokio::test]
    async fn test_deactivate() {
        let pool = test_pool().await;
        let created = create(&pool, &sample("mrossi")).await.unwrap();
        let updated = deactivate(&pool, created.operator_id).await.unwrap();
        assert!(!updated.active);
        assert!(!get(&pool, created.operator_id).await.unwrap().unwrap().active);
    }
}
