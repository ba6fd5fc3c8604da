//! Error types for the passport core.

use thiserror::Error;

/// Errors raised while constructing or parsing core values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("{kind} must not be empty")]
    EmptyIdentifier { kind: &'static str },

    #[error("{kind} must not contain '#': {value}")]
    ReservedCharacter { kind: &'static str, value: String },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("unknown key kind: {0}")]
    UnknownKeyKind(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
