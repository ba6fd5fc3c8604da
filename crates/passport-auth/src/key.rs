//! Key material for signing and verifying tokens.

use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TokenError};

/// Token signing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// HMAC-SHA256 with a shared secret.
    #[default]
    Hs256,
    /// Ed25519 signatures.
    Ed25519,
}

impl Algorithm {
    /// The `alg` value written into token headers.
    pub const fn header_name(&self) -> &'static str {
        match self {
            Algorithm::Hs256 => "HS256",
            Algorithm::Ed25519 => "EdDSA",
        }
    }
}

/// Shared HMAC secret. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct HmacSecret(Vec<u8>);

impl HmacSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for HmacSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HmacSecret(<{} bytes>)", self.0.len())
    }
}

/// Key used to check signatures.
#[derive(Debug, Clone)]
pub enum VerifierKey {
    Hmac(HmacSecret),
    Ed25519(VerifyingKey),
}

impl VerifierKey {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            VerifierKey::Hmac(_) => Algorithm::Hs256,
            VerifierKey::Ed25519(_) => Algorithm::Ed25519,
        }
    }

    /// Parse a hex-encoded Ed25519 public key.
    pub fn ed25519_from_hex(hex_key: &str) -> Result<Self> {
        let bytes: [u8; 32] = hex::decode(hex_key.trim())
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?
            .try_into()
            .map_err(|_| TokenError::InvalidKey("ed25519 public key must be 32 bytes".into()))?;
        let key =
            VerifyingKey::from_bytes(&bytes).map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        Ok(VerifierKey::Ed25519(key))
    }

    /// Hex public key accepted by [`VerifierKey::ed25519_from_hex`]. `None` for HMAC keys.
    pub fn ed25519_public_hex(&self) -> Option<String> {
        match self {
            VerifierKey::Hmac(_) => None,
            VerifierKey::Ed25519(key) => Some(hex::encode(key.as_bytes())),
        }
    }
}

/// Key used to issue tokens.
#[derive(Clone)]
pub enum SigningKey {
    Hmac(HmacSecret),
    Ed25519(Ed25519SigningKey),
}

impl SigningKey {
    /// HMAC-SHA256 key from a shared secret.
    pub fn hs256(secret: impl Into<Vec<u8>>) -> Self {
        SigningKey::Hmac(HmacSecret::new(secret))
    }

    /// Ed25519 key from a 32-byte seed.
    pub fn ed25519_from_seed(seed: &[u8; 32]) -> Self {
        SigningKey::Ed25519(Ed25519SigningKey::from_bytes(seed))
    }

    /// Ed25519 key from a hex-encoded 32-byte seed.
    pub fn ed25519_from_hex(hex_seed: &str) -> Result<Self> {
        let seed: [u8; 32] = hex::decode(hex_seed.trim())
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?
            .try_into()
            .map_err(|_| TokenError::InvalidKey("ed25519 seed must be 32 bytes".into()))?;
        Ok(Self::ed25519_from_seed(&seed))
    }

    /// Fresh random Ed25519 key.
    pub fn generate_ed25519() -> Self {
        SigningKey::Ed25519(Ed25519SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Hex seed accepted by [`SigningKey::ed25519_from_hex`]. `None` for HMAC keys.
    pub fn ed25519_seed_hex(&self) -> Option<String> {
        match self {
            SigningKey::Hmac(_) => None,
            SigningKey::Ed25519(key) => Some(hex::encode(key.to_bytes())),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            SigningKey::Hmac(_) => Algorithm::Hs256,
            SigningKey::Ed25519(_) => Algorithm::Ed25519,
        }
    }

    /// The matching verification key.
    pub fn verifier_key(&self) -> VerifierKey {
        match self {
            SigningKey::Hmac(secret) => VerifierKey::Hmac(secret.clone()),
            SigningKey::Ed25519(key) => VerifierKey::Ed25519(key.verifying_key()),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningKey::Hmac(secret) => f.debug_tuple("Hmac").field(secret).finish(),
            SigningKey::Ed25519(key) => f
                .debug_tuple("Ed25519")
                .field(&hex::encode(key.verifying_key().as_bytes()))
                .finish(),
        }
    }
}
