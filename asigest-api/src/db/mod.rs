//! Database access for asigest-api
//!
//! One module per entity. Operational-store modules take the read-write pool;
//! [`erp`] takes the read-only ASITRON pool.

pub mod batches;
pub mod documents;
pub mod erp;
pub mod events;
pub mod machines;
pub mod operators;
pub mod phase_types;
pub mod phases;
pub mod work_orders;

use asigest_common::Result;
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Sqlite, SqlitePool, Transaction};

use crate::pagination::{Paged, Pagination};

/// Open a transaction that holds the write lock from its first statement
///
/// A deferred transaction that reads and then writes cannot wait for a
/// concurrent writer: SQLite fails its lock upgrade with SQLITE_BUSY at
/// once. `BEGIN IMMEDIATE` queues on the busy timeout instead.
pub(crate) async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Serde default for flags that start enabled
pub(crate) fn default_true() -> bool {
    true
}

/// Value bound by a list filter
#[derive(Debug, Clone)]
pub(crate) enum FilterValue {
    Int(i64),
    Text(String),
    Bool(bool),
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

#[derive(Debug, Clone)]
enum Condition {
    Eq(&'static str, FilterValue),
    NotEq(&'static str, FilterValue),
    Raw(&'static str),
}

/// WHERE clause assembled from optional query parameters
///
/// Column names are static; values are always bound.
#[derive(Debug, Clone, Default)]
pub(crate) struct Filters {
    conditions: Vec<Condition>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// `column = value` when `value` is present
    pub fn eq<V: Into<FilterValue>>(mut self, column: &'static str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.conditions.push(Condition::Eq(column, v.into()));
        }
        self
    }

    /// `column <> value` when `value` is present
    pub fn not_eq<V: Into<FilterValue>>(mut self, column: &'static str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.conditions.push(Condition::NotEq(column, v.into()));
        }
        self
    }

    /// Literal condition when `enabled`
    pub fn raw(mut self, condition: &'static str, enabled: bool) -> Self {
        if enabled {
            self.conditions.push(Condition::Raw(condition));
        }
        self
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (i, condition) in self.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            match condition {
                Condition::Eq(column, value) => {
                    qb.push(*column).push(" = ");
                    push_value(qb, value);
                }
                Condition::NotEq(column, value) => {
                    qb.push(*column).push(" <> ");
                    push_value(qb, value);
                }
                Condition::Raw(sql) => {
                    qb.push(*sql);
                }
            }
        }
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &FilterValue) {
    match value {
        FilterValue::Int(v) => qb.push_bind(*v),
        FilterValue::Text(v) => qb.push_bind(v.clone()),
        FilterValue::Bool(v) => qb.push_bind(*v),
    };
}

/// Count matching rows, then fetch one page of them
///
/// `select` is the `SELECT ... FROM ...` part without a WHERE clause;
/// `from` is the bare `FROM ...` part used for the count.
pub(crate) async fn fetch_page<T>(
    pool: &SqlitePool,
    select: &str,
    from: &str,
    filters: &Filters,
    order_by: &str,
    pagination: Pagination,
) -> Result<Paged<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) ");
    count.push(from);
    filters.push_where(&mut count);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut query = QueryBuilder::<Sqlite>::new(select);
    filters.push_where(&mut query);
    query.push(" ORDER BY ").push(order_by);
    query.push(" LIMIT ").push_bind(pagination.page_size);
    query.push(" OFFSET ").push_bind(pagination.offset);
    let items: Vec<T> = query.build_query_as().fetch_all(pool).await?;

    Ok(Paged::new(items, total, pagination))
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // One connection: every handle must see the same in-memory database
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    asigest_common::db::create_schema(&pool)
        .await
        .expect("Failed to create schema");
    pool
}
