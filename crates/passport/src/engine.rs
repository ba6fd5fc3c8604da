//! The stamping engine.
//!
//! One stamp request moves the (attendee, sponsor) visit record through one
//! of three transitions:
//!
//! | Transition | Precondition | Effect |
//! |---|---|---|
//! | [`Transition::FirstVisit`] | no record | create with `visit_count = 1` |
//! | [`Transition::CommentsUpdated`] | record, notes given, `register_visit = false` | replace notes only |
//! | [`Transition::VisitUpdated`] | record, otherwise | `visit_count += 1`, `last_visit = now`, notes replaced if given |
//!
//! Writes go through the ledger's conditional create and atomic update, so
//! two concurrent stamps for the same pair never lose a count. A create that
//! loses the race re-reads and falls through to the update transitions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use passport_auth::TokenVerifier;
use passport_core::{Clock, ItemKey, Notes, ShortId, SponsorId, UserId, VisitRecord};
use passport_store::{Ledger, LedgerExt, PutResult, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PassportError, Result};
use crate::resolver::IdentityResolver;

/// Attempts before a stamp gives up on a contended record.
pub const MAX_ATTEMPTS: usize = 3;

/// An inbound stamp request, as submitted by a booth device.
#[derive(Debug, Clone, Deserialize)]
pub struct StampRequest {
    pub short_id: String,
    pub jwt: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Absent or `null` means "count this as a visit".
    #[serde(default)]
    pub register_visit: Option<bool>,
}

impl StampRequest {
    pub fn new(short_id: impl Into<String>, jwt: impl Into<String>) -> Self {
        Self {
            short_id: short_id.into(),
            jwt: jwt.into(),
            notes: None,
            register_visit: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn register_visit(mut self, register: bool) -> Self {
        self.register_visit = Some(register);
        self
    }
}

/// Which transition a stamp applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    FirstVisit,
    CommentsUpdated,
    VisitUpdated,
}

impl Transition {
    /// The caller-facing message for this transition.
    pub const fn message(&self) -> &'static str {
        match self {
            Transition::FirstVisit => "First visit registered",
            Transition::CommentsUpdated => "Comments updated",
            Transition::VisitUpdated => "Visit updated",
        }
    }
}

/// Result of a successful stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampOutcome {
    pub transition: Transition,
    pub visit_count: u64,
    pub last_visit: DateTime<Utc>,
    /// The notes now current on the record, when the response carries them.
    pub previous_notes: Option<Notes>,
}

/// Wire shape of a stamp response.
#[derive(Debug, Serialize)]
pub struct StampResponse<'a> {
    pub message: &'static str,
    pub visit_count: u64,
    pub last_visit: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_notes: Option<&'a str>,
}

impl StampOutcome {
    pub fn message(&self) -> &'static str {
        self.transition.message()
    }

    pub fn to_response(&self) -> StampResponse<'_> {
        StampResponse {
            message: self.message(),
            visit_count: self.visit_count,
            last_visit: self.last_visit,
            previous_notes: self.previous_notes.as_ref().map(Notes::as_str),
        }
    }
}

/// Orchestrates token verification, identity resolution and the ledger write.
pub struct StampingEngine<L: Ledger> {
    ledger: Arc<L>,
    resolver: IdentityResolver<L>,
    verifier: TokenVerifier,
    clock: Arc<dyn Clock>,
}

impl<L: Ledger> StampingEngine<L> {
    pub fn new(ledger: Arc<L>, verifier: TokenVerifier, clock: Arc<dyn Clock>) -> Self {
        Self {
            resolver: IdentityResolver::new(ledger.clone()),
            ledger,
            verifier,
            clock,
        }
    }

    /// Apply one stamp request.
    ///
    /// Input is validated before the token, and the token before any store
    /// access, so rejected requests never touch the ledger.
    pub async fn stamp(&self, request: StampRequest) -> Result<StampOutcome> {
        let short_id = parse_short_id(&request.short_id)?;
        let notes = Notes::from_submitted(request.notes);
        let register_visit = request.register_visit.unwrap_or(true);

        let now = self.clock.now();
        let claims = self.verifier.verify(&request.jwt, now).map_err(|e| {
            warn!(short_id = %short_id, error = %e, "stamp token rejected");
            PassportError::Auth(e)
        })?;

        let attendee = self.resolver.resolve(&short_id).await?;
        let user_id = &attendee.user_id;
        let sponsor_id = &claims.sponsor_id;
        let key = ItemKey::visit(user_id, sponsor_id);

        for attempt in 1..=MAX_ATTEMPTS {
            let applied = self
                .try_stamp(user_id, sponsor_id, now, &notes, register_visit)
                .await?;
            if let Some(outcome) = applied {
                debug!(
                    key = %key,
                    transition = ?outcome.transition,
                    visit_count = outcome.visit_count,
                    attempt,
                    "stamp applied"
                );
                return Ok(outcome);
            }
            debug!(key = %key, attempt, "visit record changed underneath, retrying");
        }

        Err(StoreError::Conflict(key.to_string()).into())
    }

    /// One read-decide-write pass. `None` means the record changed between
    /// the read and the write.
    ///
    /// An existing record is updated under the key it was found at, which
    /// may be a qualified legacy key. New records always get the canonical key.
    async fn try_stamp(
        &self,
        user_id: &UserId,
        sponsor_id: &SponsorId,
        now: DateTime<Utc>,
        notes: &Option<Notes>,
        register_visit: bool,
    ) -> Result<Option<StampOutcome>> {
        let Some((key, _)) = self.ledger.find_visit(user_id, sponsor_id).await? else {
            let key = ItemKey::visit(user_id, sponsor_id);
            let record = VisitRecord::first_visit(now, notes.clone());
            return Ok(match self.ledger.create_visit(&key, &record).await? {
                PutResult::Created => {
                    info!(key = %key, "first visit registered");
                    Some(StampOutcome {
                        transition: Transition::FirstVisit,
                        visit_count: record.visit_count,
                        last_visit: record.last_visit,
                        previous_notes: record.notes,
                    })
                }
                PutResult::AlreadyExists => None,
            });
        };

        match (notes, register_visit) {
            (Some(notes), false) => {
                let updated = self.ledger.update_notes(&key, notes).await?;
                Ok(updated.map(|record| StampOutcome {
                    transition: Transition::CommentsUpdated,
                    visit_count: record.visit_count,
                    last_visit: record.last_visit,
                    previous_notes: Some(notes.clone()),
                }))
            }
            _ => {
                let updated = self.ledger.record_visit(&key, now, notes.as_ref()).await?;
                Ok(updated.map(|record| StampOutcome {
                    transition: Transition::VisitUpdated,
                    visit_count: record.visit_count,
                    last_visit: record.last_visit,
                    previous_notes: record.notes,
                }))
            }
        }
    }
}

pub(crate) fn parse_short_id(raw: &str) -> Result<ShortId> {
    ShortId::new(raw).map_err(|e| PassportError::Input(e.to_string()))
}
