//! Read-only connection to the ASITRON ERP database
//!
//! The service never writes to the ERP. The connection is opened with
//! SQLite `mode=ro` so any write attempt fails at the engine level.

use crate::{Error, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Connect to the ERP database in read-only mode
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(Error::Config(format!(
            "ERP database not found: {}",
            db_path.display()
        )));
    }

    let db_url = format!("sqlite://{}?mode=ro", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    info!("Opened ERP database (read-only): {}", db_path.display());

    Ok(pool)
}
