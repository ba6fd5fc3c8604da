//! Error types for token handling.

use thiserror::Error;

/// Why a token was rejected.
///
/// Verification returns this as a value; callers map every variant to an
/// authentication failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Wrong number of segments or an unusable claim value.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// A segment is not valid base64url.
    #[error("invalid segment encoding: {0}")]
    Encoding(String),

    /// Header or payload is not a JSON object of the expected shape.
    #[error("invalid token json: {0}")]
    InvalidJson(String),

    /// Header names an algorithm other than the configured one.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("token expired at {exp} (now {now})")]
    Expired { exp: i64, now: i64 },

    #[error("token does not carry a sponsor_id claim")]
    MissingSponsorClaim,

    /// `now + ttl` is not a representable timestamp. Only raised on issuance.
    #[error("token expiry out of range (ttl {ttl_secs}s)")]
    ExpiryOutOfRange { ttl_secs: i64 },

    /// Key material could not be used.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for token operations.
pub type Result<T> = std::result::Result<T, TokenError>;
