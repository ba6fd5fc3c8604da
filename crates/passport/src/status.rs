//! Read side: rebuild an attendee's passport from their visit partition.

use std::collections::HashSet;
use std::sync::Arc;

use passport_core::{Attendee, ShortId, SortKey, SponsorId};
use passport_store::{Ledger, LedgerExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::resolver::IdentityResolver;

/// What an attendee sees: their profile and which sponsors stamped them.
///
/// Counts and timestamps stay off this view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassportView {
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
    pub company: Option<String>,
    /// Each sponsor at most once, in sort-key order.
    pub stamped_sponsors: Vec<SponsorId>,
}

/// Progress against the sponsors marked as required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionView {
    pub required: Vec<SponsorId>,
    pub missing: Vec<SponsorId>,
    pub complete: bool,
}

pub struct StatusReconstructor<L: Ledger> {
    ledger: Arc<L>,
    resolver: IdentityResolver<L>,
}

impl<L: Ledger> StatusReconstructor<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self {
            resolver: IdentityResolver::new(ledger.clone()),
            ledger,
        }
    }

    /// The attendee's passport.
    pub async fn status(&self, short_id: &ShortId) -> Result<PassportView> {
        let attendee = self.resolver.resolve(short_id).await?;
        let stamped_sponsors = self.stamped_sponsors(&attendee).await?;

        let Attendee {
            first_name,
            last_name,
            role,
            company,
            ..
        } = attendee;

        Ok(PassportView {
            first_name,
            last_name,
            role,
            company,
            stamped_sponsors,
        })
    }

    /// Which required sponsors the attendee still has to visit.
    pub async fn completion(&self, short_id: &ShortId) -> Result<CompletionView> {
        let attendee = self.resolver.resolve(short_id).await?;
        let stamped: HashSet<SponsorId> =
            self.stamped_sponsors(&attendee).await?.into_iter().collect();

        let required: Vec<SponsorId> = self
            .ledger
            .list_sponsors()
            .await?
            .into_iter()
            .filter(|s| s.required)
            .map(|s| s.sponsor_id)
            .collect();

        let missing: Vec<SponsorId> = required
            .iter()
            .filter(|id| !stamped.contains(*id))
            .cloned()
            .collect();

        debug!(
            user_id = %attendee.user_id,
            required = required.len(),
            missing = missing.len(),
            "passport completion"
        );

        Ok(CompletionView {
            complete: missing.is_empty(),
            required,
            missing,
        })
    }

    /// Distinct sponsor ids across the attendee's `SPONSOR#` items, first
    /// occurrence order. Legacy qualified keys fold into their sponsor.
    async fn stamped_sponsors(&self, attendee: &Attendee) -> Result<Vec<SponsorId>> {
        let items = self.ledger.visits_of(&attendee.user_id).await?;

        let mut seen = HashSet::new();
        let mut sponsors = Vec::new();
        for item in items {
            let sponsor_id = match item.sort_key.parse::<SortKey>() {
                Ok(SortKey::Sponsor { id, .. }) => id,
                Ok(other) => {
                    warn!(user_id = %attendee.user_id, sort_key = %other, "non-sponsor key under sponsor prefix");
                    continue;
                }
                Err(e) => {
                    warn!(user_id = %attendee.user_id, sort_key = %item.sort_key, error = %e, "skipping unparseable sort key");
                    continue;
                }
            };

            if seen.insert(sponsor_id.clone()) {
                sponsors.push(sponsor_id);
            }
        }

        Ok(sponsors)
    }
}
