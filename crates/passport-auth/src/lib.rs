//! # Passport Auth
//!
//! Compact signed tokens that identify a sponsor booth.
//!
//! ## Overview
//!
//! A token is three base64url segments, `header.payload.signature`. The
//! signature covers the ASCII string `"<header>.<payload>"`. The payload is a
//! JSON object carrying at least `sponsor_id` and optionally `exp` (Unix
//! seconds, UTC).
//!
//! Two signing schemes are supported:
//!
//! - **HS256**: HMAC-SHA256 with a shared secret
//! - **EdDSA**: Ed25519, so verifiers only need the public key
//!
//! The token is the only source of sponsor identity on write paths. A caller
//! never gets to assert a sponsor id directly.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use passport_auth::{SigningKey, TokenSigner, TokenVerifier};
//! use passport_core::SponsorId;
//!
//! let key = SigningKey::hs256(b"booth-secret".to_vec());
//! let verifier = TokenVerifier::new(key.verifier_key());
//! let signer = TokenSigner::new(key);
//!
//! let now = Utc::now();
//! let issued = signer
//!     .issue(SponsorId::new("5").unwrap(), now, Duration::hours(12))
//!     .unwrap();
//!
//! let claims = verifier.verify(&issued.token, now).unwrap();
//! assert_eq!(claims.sponsor_id.as_str(), "5");
//! ```

pub mod claims;
pub mod error;
pub mod key;
pub mod sign;
pub mod verify;

pub use claims::Claims;
pub use error::{Result, TokenError};
pub use key::{Algorithm, HmacSecret, SigningKey, VerifierKey};
pub use sign::{IssuedToken, TokenSigner};
pub use verify::{verify, TokenVerifier};

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// base64url engine for token segments.
///
/// Encodes without padding. Decodes padded and unpadded input alike, so a
/// segment whose padding was stripped is re-padded implicitly.
pub const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);
