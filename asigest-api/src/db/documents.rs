//! Technical documents (drawings, procedures, checklists) per ERP article
//!
//! Only one revision per article and document type is ATTIVO at a time.
//! Uploading a new revision supersedes the previous active one.

use asigest_common::models::TechnicalDocument;
use asigest_common::{DocumentState, Error, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use super::{events, fetch_page, Filters};
use crate::pagination::{Paged, Pagination};
use crate::validate;

#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    pub article_erp_id: i64,
    /// DISEGNO, PROCEDURA, CHECKLIST, SPECIFICHE, ...
    pub doc_type: String,
    pub revision: String,
    pub file_path: Option<String>,
    /// Hex digest supplied by the uploader
    pub file_hash: Option<String>,
    pub file_size: Option<i64>,
    pub expires_on: Option<NaiveDate>,
    pub uploaded_by: Option<String>,
    pub notes: Option<String>,
}

impl NewDocument {
    pub fn validate(&self) -> Result<()> {
        validate::required("doc_type", &self.doc_type, 50)?;
        validate::required("revision", &self.revision, 20)?;
        validate::max_length("file_path", self.file_path.as_deref(), 500)?;
        validate::max_length("file_hash", self.file_hash.as_deref(), 64)?;
        validate::non_negative("file_size", self.file_size)?;
        validate::max_length("uploaded_by", self.uploaded_by.as_deref(), 100)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub article_erp_id: Option<i64>,
    pub doc_type: Option<String>,
    pub state: Option<DocumentState>,
}

pub async fn list(
    pool: &SqlitePool,
    filter: &DocumentFilter,
    pagination: Pagination,
) -> Result<Paged<TechnicalDocument>> {
    let filters = Filters::new()
        .eq("article_erp_id", filter.article_erp_id)
        .eq("doc_type", filter.doc_type.clone())
        .eq("state", filter.state.map(|s| s.as_str()));

    fetch_page(
        pool,
        "SELECT * FROM technical_documents",
        "FROM technical_documents",
        &filters,
        "article_erp_id, doc_type, revision",
        pagination,
    )
    .await
}

pub async fn get(pool: &SqlitePool, document_id: i64) -> Result<Option<TechnicalDocument>> {
    let document = sqlx::query_as::<_, TechnicalDocument>(
        "SELECT * FROM technical_documents WHERE document_id = ?",
    )
    .bind(document_id)
    .fetch_optional(pool)
    .await?;

    Ok(document)
}

/// Register a new revision, superseding the active one of the same type
pub async fn create(pool: &SqlitePool, new: &NewDocument) -> Result<TechnicalDocument> {
    new.validate()?;

    let mut tx = super::begin_write(pool).await?;

    let duplicate: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM technical_documents
        WHERE article_erp_id = ? AND doc_type = ? AND revision = ?
        "#,
    )
    .bind(new.article_erp_id)
    .bind(&new.doc_type)
    .bind(&new.revision)
    .fetch_one(&mut *tx)
    .await?;
    if duplicate > 0 {
        return Err(Error::InvalidInput(format!(
            "Revision {} of {} for article {} already exists",
            new.revision, new.doc_type, new.article_erp_id
        )));
    }

    let superseded = sqlx::query(
        r#"
        UPDATE technical_documents
        SET state = ?
        WHERE article_erp_id = ? AND doc_type = ? AND state = ?
        "#,
    )
    .bind(DocumentState::Superseded)
    .bind(new.article_erp_id)
    .bind(&new.doc_type)
    .bind(DocumentState::Active)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let id = sqlx::query(
        r#"
        INSERT INTO technical_documents (
            article_erp_id, doc_type, revision, file_path, file_hash, file_size,
            state, expires_on, uploaded_at, uploaded_by, notes
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.article_erp_id)
    .bind(&new.doc_type)
    .bind(&new.revision)
    .bind(&new.file_path)
    .bind(&new.file_hash)
    .bind(new.file_size)
    .bind(DocumentState::Active)
    .bind(new.expires_on)
    .bind(asigest_common::time::now())
    .bind(&new.uploaded_by)
    .bind(&new.notes)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let details = format!(
        "{} rev {} for article {} ({} superseded)",
        new.doc_type, new.revision, new.article_erp_id, superseded
    );
    events::record(
        &mut *tx,
        events::DOCUMENT_UPLOADED,
        events::ENTITY_DOCUMENT,
        Some(id),
        Some(&details),
    )
    .await?;

    tx.commit().await?;

    info!("Registered document {}: {}", id, details);

    get(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Document {} vanished after insert", id)))
}

/// Soft delete: mark SUPERATO
pub async fn supersede(pool: &SqlitePool, document_id: i64) -> Result<TechnicalDocument> {
    let result = sqlx::query("UPDATE technical_documents SET state = ? WHERE document_id = ?")
        .bind(DocumentState::Superseded)
        .bind(document_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Document {} not found", document_id)));
    }

    get(pool, document_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Document {} not found", document_id)))
}
