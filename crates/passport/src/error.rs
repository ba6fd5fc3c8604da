//! Error types for the passport service.

use passport_auth::TokenError;
use passport_core::ShortId;
use passport_store::StoreError;
use thiserror::Error;

/// Errors that can occur during passport operations.
#[derive(Debug, Error)]
pub enum PassportError {
    /// A required request field is missing or malformed.
    #[error("invalid input: {0}")]
    Input(String),

    /// The sponsor token was rejected.
    #[error("token rejected: {0}")]
    Auth(#[from] TokenError),

    /// Sponsor login failed. Unknown sponsor and wrong key look the same.
    #[error("invalid sponsor credentials")]
    InvalidCredentials,

    /// No attendee is registered under the short id.
    #[error("attendee not found: {0}")]
    AttendeeNotFound(ShortId),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration could not be loaded or is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse failure class, one per boundary status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed request (400).
    Input,
    /// Authentication failure (403).
    Auth,
    /// Unknown attendee (404).
    NotFound,
    /// Store or server failure (500).
    Internal,
}

impl ErrorClass {
    /// HTTP status code for this class.
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorClass::Input => 400,
            ErrorClass::Auth => 403,
            ErrorClass::NotFound => 404,
            ErrorClass::Internal => 500,
        }
    }
}

impl PassportError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PassportError::Input(_) => ErrorClass::Input,
            PassportError::Auth(_) | PassportError::InvalidCredentials => ErrorClass::Auth,
            PassportError::AttendeeNotFound(_) => ErrorClass::NotFound,
            PassportError::Store(_) | PassportError::Config(_) => ErrorClass::Internal,
        }
    }

    /// The message shown to callers. Never includes store causes.
    pub fn public_message(&self) -> &'static str {
        match self {
            PassportError::Input(_) => "Invalid input",
            PassportError::Auth(TokenError::MissingSponsorClaim) => {
                "Token does not contain sponsor_id"
            }
            PassportError::Auth(_) => "Invalid or expired token",
            PassportError::InvalidCredentials => "Invalid credentials",
            PassportError::AttendeeNotFound(_) => "User not found",
            PassportError::Store(_) => "Error accessing store",
            PassportError::Config(_) => "Internal server error",
        }
    }
}

/// Result type for passport operations.
pub type Result<T> = std::result::Result<T, PassportError>;
