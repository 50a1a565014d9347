//! Database bootstrap
//!
//! - [`init`]: operational store (read-write), schema creation
//! - [`erp`]: ASITRON ERP database (read-only)

pub mod erp;
pub mod init;

pub use erp::connect_readonly;
pub use init::{create_schema, init_database};
