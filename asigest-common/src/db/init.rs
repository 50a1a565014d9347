//! Operational database initialization
//!
//! Creates the database file on first run and brings the schema up to date.
//! Every statement is idempotent (`IF NOT EXISTS`), so startup on an existing
//! database is safe.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// How long a writer waits for the database lock before failing
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas are per connection, so they go on the connect options and
    // apply to every pooled connection
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every operational table and index
///
/// Also used by tests against in-memory pools.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    create_phase_types_table(pool).await?;
    create_operators_table(pool).await?;
    create_machines_table(pool).await?;
    create_work_order_configs_table(pool).await?;
    create_phases_table(pool).await?;
    create_batches_table(pool).await?;
    create_event_log_table(pool).await?;
    create_technical_documents_table(pool).await?;

    info!("Operational schema ready");

    Ok(())
}

pub async fn create_phase_types_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS phase_types (
            phase_type_id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL,
            category TEXT NOT NULL,
            requires_serial INTEGER NOT NULL DEFAULT 0,
            requires_inspection INTEGER NOT NULL DEFAULT 0,
            display_order INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_phase_types_active ON phase_types(active)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_operators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS operators (
            operator_id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            email TEXT,
            department TEXT,
            role TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_operators_department ON operators(department)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_machines_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS machines (
            machine_id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            description TEXT,
            department TEXT NOT NULL,
            kind TEXT,
            notes TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_machines_department ON machines(department)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_work_order_configs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS work_order_configs (
            config_id INTEGER PRIMARY KEY AUTOINCREMENT,
            erp_order_id INTEGER NOT NULL UNIQUE,
            article_code TEXT,
            description TEXT,
            flag_smd INTEGER NOT NULL DEFAULT 1,
            flag_pth INTEGER NOT NULL DEFAULT 0,
            flag_inspection INTEGER NOT NULL DEFAULT 1,
            flag_subcontractor INTEGER NOT NULL DEFAULT 0,
            bom_code TEXT,
            revision TEXT,
            documentation_locked INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            config_json TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            modified_by TEXT,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_work_order_configs_locked ON work_order_configs(documentation_locked)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_phases_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS phases (
            phase_id INTEGER PRIMARY KEY AUTOINCREMENT,
            erp_order_id INTEGER NOT NULL,
            config_id INTEGER REFERENCES work_order_configs(config_id),
            phase_type_id INTEGER NOT NULL REFERENCES phase_types(phase_type_id),
            order_number TEXT,
            state TEXT NOT NULL DEFAULT 'APERTA'
                CHECK (state IN ('APERTA', 'IN_CORSO', 'CHIUSA', 'BLOCCATA')),
            quantity INTEGER,
            planned_qty INTEGER,
            produced_qty INTEGER,
            remaining_qty INTEGER,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            opened_at TEXT NOT NULL,
            closed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_phases_order ON phases(erp_order_id, phase_type_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_phases_state ON phases(state)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_batches_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS batches (
            batch_id INTEGER PRIMARY KEY AUTOINCREMENT,
            phase_id INTEGER NOT NULL REFERENCES phases(phase_id),
            progressive INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            input_qty INTEGER,
            output_qty INTEGER NOT NULL DEFAULT 0,
            scrap_qty INTEGER NOT NULL DEFAULT 0,
            operator_id INTEGER REFERENCES operators(operator_id),
            machine_id INTEGER REFERENCES machines(machine_id),
            feeder_program TEXT,
            setup_minutes INTEGER,
            scrap_kind TEXT,
            scrap_notes TEXT,
            notes TEXT,
            UNIQUE (phase_id, progressive)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_batches_started ON batches(started_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_batches_operator ON batches(operator_id)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_event_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS event_log (
            event_id INTEGER PRIMARY KEY AUTOINCREMENT,
            occurred_at TEXT NOT NULL,
            kind TEXT NOT NULL,
            entity TEXT NOT NULL,
            entity_id INTEGER,
            actor TEXT NOT NULL,
            details TEXT,
            severity TEXT CHECK (severity IN ('INFO', 'WARNING', 'ERROR'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_event_log_time ON event_log(occurred_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_event_log_kind ON event_log(kind, occurred_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_event_log_entity ON event_log(entity, entity_id)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_technical_documents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS technical_documents (
            document_id INTEGER PRIMARY KEY AUTOINCREMENT,
            article_erp_id INTEGER NOT NULL,
            doc_type TEXT NOT NULL,
            revision TEXT NOT NULL,
            file_path TEXT,
            file_hash TEXT,
            file_size INTEGER,
            state TEXT NOT NULL DEFAULT 'ATTIVO' CHECK (state IN ('ATTIVO', 'SUPERATO')),
            expires_on TEXT,
            uploaded_at TEXT NOT NULL,
            uploaded_by TEXT,
            notes TEXT,
            UNIQUE (article_erp_id, doc_type, revision)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_active ON technical_documents(article_erp_id, doc_type, state)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_expiry ON technical_documents(expires_on)")
        .execute(pool)
        .await?;

    Ok(())
}
