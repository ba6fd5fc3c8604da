//! Token verification.

use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Verifier};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::Sha256;
use tracing::debug;

use crate::claims::Claims;
use crate::error::{Result, TokenError};
use crate::key::VerifierKey;
use crate::SEGMENT_ENGINE;

pub(crate) type HmacSha256 = Hmac<Sha256>;

#[derive(Deserialize)]
struct Header {
    #[serde(default)]
    alg: Option<String>,
}

/// Verifies sponsor tokens against one configured key.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    key: VerifierKey,
}

impl TokenVerifier {
    pub fn new(key: VerifierKey) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &VerifierKey {
        &self.key
    }

    /// Verify `token` as of `now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
        verify(token, &self.key, now)
    }
}

/// Verify a compact token and return its claims.
///
/// Checks, in order: segment structure, header shape and algorithm,
/// signature (constant-time), payload shape, expiry, and the sponsor claim.
pub fn verify(token: &str, key: &VerifierKey, now: DateTime<Utc>) -> Result<Claims> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header_b64, payload_b64, signature_b64] = segments[..] else {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    };

    let header: Header = serde_json::from_slice(&decode_segment(header_b64)?)
        .map_err(|e| TokenError::InvalidJson(format!("header: {e}")))?;
    if let Some(alg) = header.alg.as_deref() {
        if alg != key.algorithm().header_name() {
            return Err(TokenError::UnsupportedAlgorithm(alg.to_string()));
        }
    }

    let signature = decode_segment(signature_b64)?;
    let signing_input = signing_input(header_b64, payload_b64);
    check_signature(key, signing_input.as_bytes(), &signature)?;

    let payload: Map<String, Value> = serde_json::from_slice(&decode_segment(payload_b64)?)
        .map_err(|e| TokenError::InvalidJson(format!("payload: {e}")))?;

    let claims = Claims::from_payload(&payload, now)?;
    debug!(sponsor_id = %claims.sponsor_id, "token verified");
    Ok(claims)
}

pub(crate) fn signing_input(header_b64: &str, payload_b64: &str) -> String {
    format!("{header_b64}.{payload_b64}")
}

fn decode_segment(segment: &str) -> Result<Vec<u8>> {
    if segment.is_empty() {
        return Err(TokenError::Malformed("empty segment".into()));
    }
    SEGMENT_ENGINE
        .decode(segment)
        .map_err(|e| TokenError::Encoding(e.to_string()))
}

fn check_signature(key: &VerifierKey, message: &[u8], signature: &[u8]) -> Result<()> {
    match key {
        VerifierKey::Hmac(secret) => {
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
            mac.update(message);
            mac.verify_slice(signature)
                .map_err(|_| TokenError::SignatureMismatch)
        }
        VerifierKey::Ed25519(public) => {
            let signature =
                Signature::from_slice(signature).map_err(|_| TokenError::SignatureMismatch)?;
            public
                .verify(message, &signature)
                .map_err(|_| TokenError::SignatureMismatch)
        }
    }
}
