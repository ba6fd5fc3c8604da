//! Sponsor-facing operations: login, and a booth's view of one attendee.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use passport_auth::{IssuedToken, TokenSigner, TokenVerifier};
use passport_core::{Clock, Notes, SponsorId};
use passport_store::{Ledger, LedgerExt};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::engine::parse_short_id;
use crate::error::{PassportError, Result};
use crate::resolver::IdentityResolver;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub sponsor_id: String,
    pub sponsor_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedToken> for LoginResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            expires_at: issued.expires_at,
        }
    }
}

/// An attendee as seen from one sponsor's booth, with that sponsor's own
/// visit history for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SponsorView {
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
    pub company: Option<String>,
    /// 0 when this sponsor has never stamped the attendee.
    pub visit_count: u64,
    pub last_visit: Option<DateTime<Utc>>,
    pub notes: Option<Notes>,
}

pub struct SponsorPortal<L: Ledger> {
    ledger: Arc<L>,
    resolver: IdentityResolver<L>,
    verifier: TokenVerifier,
    signer: TokenSigner,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl<L: Ledger> SponsorPortal<L> {
    pub fn new(
        ledger: Arc<L>,
        verifier: TokenVerifier,
        signer: TokenSigner,
        ttl: chrono::Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver: IdentityResolver::new(ledger.clone()),
            ledger,
            verifier,
            signer,
            ttl,
            clock,
        }
    }

    /// Exchange a sponsor id and key for a signed token.
    ///
    /// An unknown sponsor and a wrong key both return `InvalidCredentials`.
    pub async fn login(&self, request: LoginRequest) -> Result<IssuedToken> {
        if request.sponsor_id.is_empty() || request.sponsor_key.is_empty() {
            return Err(PassportError::Input("sponsor_id and sponsor_key are required".into()));
        }
        let sponsor_id = SponsorId::new(request.sponsor_id)
            .map_err(|e| PassportError::Input(e.to_string()))?;

        let Some(sponsor) = self.ledger.get_sponsor(&sponsor_id).await? else {
            warn!(sponsor_id = %sponsor_id, "login for unknown sponsor");
            return Err(PassportError::InvalidCredentials);
        };

        let matches: bool = sponsor
            .key
            .as_bytes()
            .ct_eq(request.sponsor_key.as_bytes())
            .into();
        if !matches {
            warn!(sponsor_id = %sponsor_id, "login with wrong sponsor key");
            return Err(PassportError::InvalidCredentials);
        }

        let issued = self
            .signer
            .issue(sponsor_id, self.clock.now(), self.ttl)
            .map_err(|e| PassportError::Config(e.to_string()))?;
        info!(sponsor_id = %sponsor.sponsor_id, expires_at = %issued.expires_at, "sponsor token issued");
        Ok(issued)
    }

    /// Read-only view of an attendee for the sponsor named by `token`.
    pub async fn sponsor_view(&self, short_id: &str, token: &str) -> Result<SponsorView> {
        let short_id = parse_short_id(short_id)?;
        let claims = self.verifier.verify(token, self.clock.now()).map_err(|e| {
            warn!(short_id = %short_id, error = %e, "view token rejected");
            PassportError::Auth(e)
        })?;

        let attendee = self.resolver.resolve(&short_id).await?;
        let visit = self
            .ledger
            .visit_of(&attendee.user_id, &claims.sponsor_id)
            .await?;

        let (visit_count, last_visit, notes) = match visit {
            Some(record) => (record.visit_count, Some(record.last_visit), record.notes),
            None => (0, None, None),
        };

        Ok(SponsorView {
            first_name: attendee.first_name,
            last_name: attendee.last_name,
            role: attendee.role,
            company: attendee.company,
            visit_count,
            last_visit,
            notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use passport_auth::SigningKey;
    use passport_core::{Attendee, ItemKey, ShortId, Sponsor, SystemClock, UserId, VisitRecord};
    use passport_store::MemoryStore;

    async fn portal() -> (Arc<MemoryStore>, SponsorPortal<MemoryStore>) {
        let ledger = Arc::new(MemoryStore::new());
        ledger
            .put_sponsor(&Sponsor {
                sponsor_id: SponsorId::new("5").unwrap(),
                sponsor_name: "Encora".into(),
                key: "booth-key".into(),
                required: true,
            })
            .await
            .unwrap();
        ledger
            .put_attendee(&Attendee {
                user_id: UserId::new("u-1").unwrap(),
                short_id: ShortId::new("ABC123").unwrap(),
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                role: None,
                company: Some("Analytical".into()),
            })
            .await
            .unwrap();

        let key = SigningKey::hs256(b"portal-secret".to_vec());
        let portal = SponsorPortal::new(
            ledger.clone(),
            TokenVerifier::new(key.verifier_key()),
            TokenSigner::new(key),
            Duration::hours(1),
            Arc::new(SystemClock),
        );
        (ledger, portal)
    }

    fn login(id: &str, key: &str) -> LoginRequest {
        LoginRequest {
            sponsor_id: id.into(),
            sponsor_key: key.into(),
        }
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let (_, portal) = portal().await;
        let issued = portal.login(login("5", "booth-key")).await.unwrap();

        let claims = portal.verifier.verify(&issued.token, Utc::now()).unwrap();
        assert_eq!(claims.sponsor_id.as_str(), "5");
        assert!(claims.exp.is_some());
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (_, portal) = portal().await;
        let wrong_key = portal.login(login("5", "nope")).await.unwrap_err();
        let unknown = portal.login(login("6", "booth-key")).await.unwrap_err();

        assert!(matches!(wrong_key, PassportError::InvalidCredentials));
        assert!(matches!(unknown, PassportError::InvalidCredentials));
        assert_eq!(wrong_key.public_message(), unknown.public_message());
    }

    #[tokio::test]
    async fn test_unrepresentable_expiry_is_internal() {
        let (ledger, _) = portal().await;
        let key = SigningKey::hs256(b"portal-secret".to_vec());
        let portal = SponsorPortal::new(
            ledger,
            TokenVerifier::new(key.verifier_key()),
            TokenSigner::new(key),
            Duration::try_seconds(9_000_000_000_000).unwrap(),
            Arc::new(SystemClock),
        );

        let err = portal.login(login("5", "booth-key")).await.unwrap_err();
        assert!(matches!(err, PassportError::Config(_)));
        assert_eq!(err.class(), crate::error::ErrorClass::Internal);
    }

    #[tokio::test]
    async fn test_login_requires_fields() {
        let (_, portal) = portal().await;
        let err = portal.login(login("", "booth-key")).await.unwrap_err();
        assert!(matches!(err, PassportError::Input(_)));
    }

    #[tokio::test]
    async fn test_view_before_and_after_visit() {
        let (ledger, portal) = portal().await;
        let token = portal.login(login("5", "booth-key")).await.unwrap().token;

        let view = portal.sponsor_view("ABC123", &token).await.unwrap();
        assert_eq!(view.company.as_deref(), Some("Analytical"));
        assert_eq!(view.visit_count, 0);
        assert_eq!(view.last_visit, None);

        let at = Utc.timestamp_opt(500, 0).unwrap();
        ledger
            .put_visit(
                &ItemKey::visit(&UserId::new("u-1").unwrap(), &SponsorId::new("5").unwrap()),
                &VisitRecord::first_visit(at, Notes::new("met at booth")),
            )
            .await
            .unwrap();

        let view = portal.sponsor_view("ABC123", &token).await.unwrap();
        assert_eq!(view.visit_count, 1);
        assert_eq!(view.last_visit, Some(at));
        assert_eq!(view.notes, Notes::new("met at booth"));
    }

    #[tokio::test]
    async fn test_view_rejects_bad_token() {
        let (_, portal) = portal().await;
        let err = portal.sponsor_view("ABC123", "a.b").await.unwrap_err();
        assert!(matches!(err, PassportError::Auth(_)));
    }
}
