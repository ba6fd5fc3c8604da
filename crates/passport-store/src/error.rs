//! Ledger errors.
//!
//! Every variant surfaces to callers as a generic server error. The detail
//! here is for logs only.

use passport_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Database(#[from] rusqlite::Error),

    /// A row that does not decode into a record.
    #[error("corrupt record: {0}")]
    InvalidData(String),

    /// A stored key or identifier failed validation.
    #[error("bad stored key: {0}")]
    Key(#[from] CoreError),

    #[error("schema migration failed: {0}")]
    Migration(String),

    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// The blocking pool dropped or panicked on a query.
    #[error("query task failed: {0}")]
    Task(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A conditional write kept losing to concurrent writers.
    #[error("write conflict on {0}")]
    Conflict(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, StoreError>;
