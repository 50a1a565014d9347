//! HTTP API handlers for asigest-api

pub mod batches;
pub mod documents;
pub mod erp;
pub mod events;
pub mod health;
pub mod machines;
pub mod operators;
pub mod phase_types;
pub mod phases;
pub mod work_orders;

pub use batches::batch_routes;
pub use documents::document_routes;
pub use erp::erp_routes;
pub use events::event_routes;
pub use health::health_routes;
pub use machines::machine_routes;
pub use operators::operator_routes;
pub use phase_types::phase_type_routes;
pub use phases::phase_routes;
pub use work_orders::config_routes;
