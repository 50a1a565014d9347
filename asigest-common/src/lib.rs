//! # ASI-GEST Common Library
//!
//! Shared code for the ASI-GEST production tracking service:
//! - Error type shared by the database layer and the HTTP layer
//! - Bootstrap configuration (TOML + environment + defaults)
//! - Operational store bootstrap and read-only ERP connection
//! - Domain records (phase types, operators, machines, work-order
//!   configurations, phases, batches, event log, technical documents)
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::{DocumentState, PhaseState, Severity};
