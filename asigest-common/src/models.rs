//! Domain records stored in the operational database
//!
//! Field names follow the operational schema created by [`crate::db::init`].
//! Lifecycle values (phase state, document state, event severity) are stored
//! as the uppercase Italian codes used by the shop floor.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ============================================================================
// Lifecycle enums
// ============================================================================

/// Phase (fase) lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum PhaseState {
    #[serde(rename = "APERTA")]
    #[sqlx(rename = "APERTA")]
    Open,
    #[serde(rename = "IN_CORSO")]
    #[sqlx(rename = "IN_CORSO")]
    InProgress,
    #[serde(rename = "CHIUSA")]
    #[sqlx(rename = "CHIUSA")]
    Closed,
    #[serde(rename = "BLOCCATA")]
    #[sqlx(rename = "BLOCCATA")]
    Blocked,
}

impl PhaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseState::Open => "APERTA",
            PhaseState::InProgress => "IN_CORSO",
            PhaseState::Closed => "CHIUSA",
            PhaseState::Blocked => "BLOCCATA",
        }
    }

    /// Whether a phase in this state may move to `next`.
    ///
    /// Staying in the same state is always allowed (no-op update).
    pub fn can_transition_to(&self, next: PhaseState) -> bool {
        use PhaseState::*;

        if *self == next {
            return true;
        }

        matches!(
            (self, next),
            (Open, InProgress)
                | (Open, Closed)
                | (Open, Blocked)
                | (InProgress, Closed)
                | (InProgress, Blocked)
                | (Blocked, Open)
                | (Blocked, InProgress)
                | (Closed, Open)
        )
    }

    /// New batches may only be opened on phases that are not closed or blocked
    pub fn accepts_batches(&self) -> bool {
        matches!(self, PhaseState::Open | PhaseState::InProgress)
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APERTA" => Ok(PhaseState::Open),
            "IN_CORSO" => Ok(PhaseState::InProgress),
            "CHIUSA" => Ok(PhaseState::Closed),
            "BLOCCATA" => Ok(PhaseState::Blocked),
            other => Err(Error::InvalidInput(format!("Unknown phase state: {}", other))),
        }
    }
}

/// Technical document state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum DocumentState {
    #[serde(rename = "ATTIVO")]
    #[sqlx(rename = "ATTIVO")]
    Active,
    #[serde(rename = "SUPERATO")]
    #[sqlx(rename = "SUPERATO")]
    Superseded,
}

impl DocumentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentState::Active => "ATTIVO",
            DocumentState::Superseded => "SUPERATO",
        }
    }
}

/// Event log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Severity {
    #[serde(rename = "INFO")]
    #[sqlx(rename = "INFO")]
    Info,
    #[serde(rename = "WARNING")]
    #[sqlx(rename = "WARNING")]
    Warning,
    #[serde(rename = "ERROR")]
    #[sqlx(rename = "ERROR")]
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

// ============================================================================
// Master data
// ============================================================================

/// Phase type (SMD, PTH, visual inspection, ...)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PhaseType {
    pub phase_type_id: i64,
    pub code: String,
    pub description: String,
    /// SMD, PTH, CONTROLLO or ALTRO
    pub category: String,
    pub requires_serial: bool,
    pub requires_inspection: bool,
    pub display_order: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Production operator or supervisor
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Operator {
    pub operator_id: i64,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Production equipment
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Machine {
    pub machine_id: i64,
    pub code: String,
    pub description: Option<String>,
    pub department: String,
    pub kind: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Production tracking
// ============================================================================

/// Technical configuration of an ERP work order
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkOrderConfig {
    pub config_id: i64,
    /// `Progressivo` of the order in the ERP
    pub erp_order_id: i64,
    pub article_code: Option<String>,
    pub description: Option<String>,
    pub flag_smd: bool,
    pub flag_pth: bool,
    pub flag_inspection: bool,
    pub flag_subcontractor: bool,
    pub bom_code: Option<String>,
    pub revision: Option<String>,
    pub documentation_locked: bool,
    pub notes: Option<String>,
    pub config_json: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub modified_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Production phase instance for a work order
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Phase {
    pub phase_id: i64,
    pub erp_order_id: i64,
    pub config_id: Option<i64>,
    pub phase_type_id: i64,
    pub order_number: Option<String>,
    pub state: PhaseState,
    pub quantity: Option<i64>,
    pub planned_qty: Option<i64>,
    pub produced_qty: Option<i64>,
    pub remaining_qty: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Phase {
    pub fn is_completed(&self) -> bool {
        self.state == PhaseState::Closed
    }
}

/// Production batch (lotto) within a phase
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Batch {
    pub batch_id: i64,
    pub phase_id: i64,
    /// Sequential per phase, starting at 1
    pub progressive: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub input_qty: Option<i64>,
    pub output_qty: i64,
    pub scrap_qty: i64,
    pub operator_id: Option<i64>,
    pub machine_id: Option<i64>,
    pub feeder_program: Option<String>,
    pub setup_minutes: Option<i64>,
    pub scrap_kind: Option<String>,
    pub scrap_notes: Option<String>,
    pub notes: Option<String>,
}

impl Batch {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Output over input as a percentage rounded to two decimals.
    ///
    /// `None` when no positive input quantity was recorded.
    pub fn yield_pct(&self) -> Option<f64> {
        match self.input_qty {
            Some(input) if input > 0 => {
                let pct = self.output_qty as f64 / input as f64 * 100.0;
                Some((pct * 100.0).round() / 100.0)
            }
            _ => None,
        }
    }

    /// Whole minutes between start and end; `None` while the batch is open
    pub fn duration_minutes(&self) -> Option<i64> {
        self.ended_at
            .map(|end| crate::time::whole_minutes_between(self.started_at, end))
    }
}

/// Append-only audit record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventLogEntry {
    pub event_id: i64,
    pub occurred_at: DateTime<Utc>,
    /// LOTTO_CREATO, LOTTO_CHIUSO, FASE_CREATA, ...
    pub kind: String,
    /// Lotto, Fase, ConfigCommessa, ...
    pub entity: String,
    pub entity_id: Option<i64>,
    pub actor: String,
    pub details: Option<String>,
    pub severity: Option<Severity>,
}

/// Technical document revision attached to an ERP article
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TechnicalDocument {
    pub document_id: i64,
    pub article_erp_id: i64,
    /// DISEGNO, PROCEDURA, CHECKLIST, SPECIFICHE, ...
    pub doc_type: String,
    pub revision: String,
    pub file_path: Option<String>,
    pub file_hash: Option<String>,
    pub file_size: Option<i64>,
    pub state: DocumentState,
    pub expires_on: Option<NaiveDate>,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: Option<String>,
    pub notes: Option<String>,
}
