//! The Passport service: one handle over the stamping, status and sponsor
//! components, all sharing a ledger, key set and clock.

use std::sync::Arc;

use passport_auth::IssuedToken;
use passport_core::{Clock, ShortId};
use passport_store::Ledger;

use crate::config::TokenKeys;
use crate::engine::{StampOutcome, StampRequest, StampingEngine};
use crate::error::Result;
use crate::sponsor::{LoginRequest, SponsorPortal, SponsorView};
use crate::status::{CompletionView, PassportView, StatusReconstructor};

/// The main Passport struct.
///
/// Provides a unified API for:
/// - Stamping passports
/// - Reading an attendee's passport and its completion
/// - Sponsor login and the sponsor's view of an attendee
pub struct Passport<L: Ledger> {
    ledger: Arc<L>,
    engine: StampingEngine<L>,
    status: StatusReconstructor<L>,
    sponsors: SponsorPortal<L>,
}

impl<L: Ledger> Passport<L> {
    /// Create a new service over `ledger`.
    pub fn new(ledger: L, keys: TokenKeys, clock: Arc<dyn Clock>) -> Self {
        let ledger = Arc::new(ledger);
        let TokenKeys {
            verifier,
            signer,
            ttl,
        } = keys;

        Self {
            engine: StampingEngine::new(ledger.clone(), verifier.clone(), clock.clone()),
            status: StatusReconstructor::new(ledger.clone()),
            sponsors: SponsorPortal::new(ledger.clone(), verifier, signer, ttl, clock),
            ledger,
        }
    }

    /// Get the ledger reference.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub async fn stamp(&self, request: StampRequest) -> Result<StampOutcome> {
        self.engine.stamp(request).await
    }

    pub async fn status(&self, short_id: &ShortId) -> Result<PassportView> {
        self.status.status(short_id).await
    }

    pub async fn completion(&self, short_id: &ShortId) -> Result<CompletionView> {
        self.status.completion(short_id).await
    }

    pub async fn login(&self, request: LoginRequest) -> Result<IssuedToken> {
        self.sponsors.login(request).await
    }

    pub async fn sponsor_view(&self, short_id: &str, token: &str) -> Result<SponsorView> {
        self.sponsors.sponsor_view(short_id, token).await
    }
}
