//! Short id to attendee resolution.

use std::sync::Arc;

use passport_core::{Attendee, ShortId};
use passport_store::Ledger;
use tracing::warn;

use crate::error::{PassportError, Result};

/// Maps a badge short id to the attendee's durable identity through the
/// ledger's secondary index.
pub struct IdentityResolver<L: Ledger> {
    ledger: Arc<L>,
}

impl<L: Ledger> Clone for IdentityResolver<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}

impl<L: Ledger> IdentityResolver<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Resolve `short_id`. Zero matches is `AttendeeNotFound`.
    ///
    /// Registration keeps short ids unique. If it did not, the first match
    /// in index order wins and the duplicate is logged.
    pub async fn resolve(&self, short_id: &ShortId) -> Result<Attendee> {
        let mut matches = self
            .ledger
            .query_attendees_by_short_id(short_id)
            .await?
            .into_iter();

        let attendee = matches
            .next()
            .ok_or_else(|| PassportError::AttendeeNotFound(short_id.clone()))?;

        let extra = matches.count();
        if extra > 0 {
            warn!(
                short_id = %short_id,
                user_id = %attendee.user_id,
                duplicates = extra,
                "short id maps to several attendees"
            );
        }

        Ok(attendee)
    }
}
