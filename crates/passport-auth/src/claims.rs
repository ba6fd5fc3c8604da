//! Token claims.

use chrono::{DateTime, Utc};
use passport_core::SponsorId;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, TokenError};

/// Verified token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub sponsor_id: SponsorId,
    /// Expiry, Unix seconds (UTC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issue time, Unix seconds (UTC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl Claims {
    /// Claims for a sponsor with no expiry.
    pub fn new(sponsor_id: SponsorId) -> Self {
        Self {
            sponsor_id,
            exp: None,
            iat: None,
        }
    }

    pub fn expires_at(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    pub fn issued_at(mut self, iat: i64) -> Self {
        self.iat = Some(iat);
        self
    }

    /// Extract claims from a decoded payload object, enforcing expiry at `now`.
    ///
    /// `sponsor_id` may be a string or a number; an empty string and the
    /// number zero count as missing. `exp` may be integral or fractional, and the token is expired
    /// only when `exp` is strictly before `now`.
    pub(crate) fn from_payload(payload: &Map<String, Value>, now: DateTime<Utc>) -> Result<Self> {
        let exp = match payload.get("exp") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(
                n.as_f64()
                    .ok_or_else(|| TokenError::Malformed("exp is not a number".into()))?,
            ),
            Some(_) => return Err(TokenError::Malformed("exp is not a number".into())),
        };

        if let Some(exp) = exp {
            if exp < unix_seconds(now) {
                return Err(TokenError::Expired {
                    exp: exp as i64,
                    now: now.timestamp(),
                });
            }
        }

        let sponsor_id = match payload.get("sponsor_id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
            _ => return Err(TokenError::MissingSponsorClaim),
        };
        let sponsor_id = SponsorId::new(sponsor_id)
            .map_err(|e| TokenError::Malformed(format!("sponsor_id: {e}")))?;

        let iat = payload.get("iat").and_then(Value::as_i64);

        Ok(Self {
            sponsor_id,
            exp: exp.map(|e| e as i64),
            iat,
        })
    }
}

fn unix_seconds(now: DateTime<Utc>) -> f64 {
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_string_sponsor_id() {
        let claims = Claims::from_payload(&payload(json!({"sponsor_id": "5"})), now()).unwrap();
        assert_eq!(claims.sponsor_id.as_str(), "5");
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn test_numeric_sponsor_id() {
        let claims = Claims::from_payload(&payload(json!({"sponsor_id": 7})), now()).unwrap();
        assert_eq!(claims.sponsor_id.as_str(), "7");

        // Only numeric zero is empty; the string "0" is a real id.
        let claims = Claims::from_payload(&payload(json!({"sponsor_id": "0"})), now()).unwrap();
        assert_eq!(claims.sponsor_id.as_str(), "0");
    }

    #[test]
    fn test_missing_or_empty_sponsor_id() {
        for value in [
            json!({}),
            json!({"sponsor_id": ""}),
            json!({"sponsor_id": null}),
            json!({"sponsor_id": 0}),
            json!({"sponsor_id": 0.0}),
        ] {
            assert_eq!(
                Claims::from_payload(&payload(value), now()),
                Err(TokenError::MissingSponsorClaim)
            );
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let at_now = json!({"sponsor_id": "5", "exp": 1_700_000_000});
        assert!(Claims::from_payload(&payload(at_now), now()).is_ok());

        let just_before = json!({"sponsor_id": "5", "exp": 1_699_999_999.5});
        assert!(matches!(
            Claims::from_payload(&payload(just_before), now()),
            Err(TokenError::Expired { .. })
        ));
    }

    #[test]
    fn test_non_numeric_exp() {
        let value = json!({"sponsor_id": "5", "exp": "tomorrow"});
        assert!(matches!(
            Claims::from_payload(&payload(value), now()),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_serialization_field_order() {
        let claims = Claims::new(SponsorId::new("5").unwrap())
            .expires_at(20)
            .issued_at(10);
        assert_eq!(
            serde_json::to_string(&claims).unwrap(),
            r#"{"sponsor_id":"5","exp":20,"iat":10}"#
        );
    }
}
