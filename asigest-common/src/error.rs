//! Common error types for ASI-GEST

use thiserror::Error;

/// Common result type for ASI-GEST operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the database layer and the HTTP service
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not allowed in the entity's current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the engine rejected a write because of a UNIQUE or
    /// FOREIGN KEY constraint.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => {
                db_err.is_unique_violation() || db_err.is_foreign_key_violation()
            }
            _ => false,
        }
    }
}
