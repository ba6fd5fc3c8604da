//! Token issuance.

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::Signer;
use hmac::Mac;
use passport_core::SponsorId;
use serde::Serialize;

use crate::claims::Claims;
use crate::error::{Result, TokenError};
use crate::key::{Algorithm, SigningKey};
use crate::verify::{signing_input, HmacSha256};
use crate::SEGMENT_ENGINE;

#[derive(Serialize)]
struct Header {
    alg: &'static str,
    typ: &'static str,
}

/// A freshly issued token and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues tokens with one configured key.
#[derive(Debug, Clone)]
pub struct TokenSigner {
    key: SigningKey,
}

impl TokenSigner {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.key.algorithm()
    }

    /// Encode and sign `claims`.
    pub fn sign(&self, claims: &Claims) -> String {
        let header = Header {
            alg: self.key.algorithm().header_name(),
            typ: "JWT",
        };
        let header_b64 = encode_json(&header);
        let payload_b64 = encode_json(claims);
        let input = signing_input(&header_b64, &payload_b64);

        let signature = match &self.key {
            SigningKey::Hmac(secret) => {
                let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
                    .expect("hmac accepts keys of any length");
                mac.update(input.as_bytes());
                mac.finalize().into_bytes().to_vec()
            }
            SigningKey::Ed25519(key) => key.sign(input.as_bytes()).to_bytes().to_vec(),
        };

        format!("{input}.{}", SEGMENT_ENGINE.encode(signature))
    }

    /// Issue a token for `sponsor_id` valid for `ttl` from `now`.
    ///
    /// Fails when `now + ttl` falls outside the representable time range.
    pub fn issue(
        &self,
        sponsor_id: SponsorId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<IssuedToken> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(TokenError::ExpiryOutOfRange {
                ttl_secs: ttl.num_seconds(),
            })?;
        let claims = Claims::new(sponsor_id)
            .issued_at(now.timestamp())
            .expires_at(expires_at.timestamp());

        Ok(IssuedToken {
            token: self.sign(&claims),
            expires_at,
        })
    }
}

fn encode_json<T: Serialize>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).expect("token json serialization failed");
    SEGMENT_ENGINE.encode(bytes)
}
