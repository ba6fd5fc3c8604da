//! Ledger trait: the abstract interface over the single-table store.
//!
//! The service treats storage as an opaque key-value table with point reads,
//! conditional and partial writes, range queries over sort-key prefixes and a
//! secondary index on attendee short ids. Implementations include SQLite and
//! in-memory (for tests).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use passport_core::{
    Attendee, ItemKey, KeyPrefix, Notes, PartitionKey, ShortId, SortKey, Sponsor, SponsorId,
    UserId, VisitRecord,
};

use crate::error::Result;

/// Result of a conditional put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutResult {
    /// No item existed under the key; the new one was written.
    Created,
    /// An item already existed; nothing was written.
    AlreadyExists,
}

/// One row returned by a prefix query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitItem {
    /// Encoded sort key as stored.
    pub sort_key: String,
    pub record: VisitRecord,
}

/// The Ledger trait: async interface for attendee, sponsor and visit storage.
///
/// # Design Notes
///
/// - **Conditional create**: `create_visit` never overwrites; it reports
///   `AlreadyExists` so the caller can fall back to an update.
/// - **Atomic increment**: `record_visit` bumps `visit_count` and `last_visit`
///   in one write, so concurrent visits are never lost.
/// - **Partial updates**: `update_notes` touches only `notes`.
#[async_trait]
pub trait Ledger: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Attendee Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace an attendee profile.
    async fn put_attendee(&self, attendee: &Attendee) -> Result<()>;

    /// Secondary-index query: every attendee registered under `short_id`.
    async fn query_attendees_by_short_id(&self, short_id: &ShortId) -> Result<Vec<Attendee>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Sponsor Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace a sponsor profile (`SPONSOR#<id>` / `PROFILE`).
    async fn put_sponsor(&self, sponsor: &Sponsor) -> Result<()>;

    /// Read a sponsor profile.
    async fn get_sponsor(&self, sponsor_id: &SponsorId) -> Result<Option<Sponsor>>;

    /// All sponsor profiles, ordered by sponsor id.
    async fn list_sponsors(&self) -> Result<Vec<Sponsor>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Visit Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Point read of one visit record.
    async fn get_visit(&self, key: &ItemKey) -> Result<Option<VisitRecord>>;

    /// Unconditional upsert.
    async fn put_visit(&self, key: &ItemKey, record: &VisitRecord) -> Result<()>;

    /// Write `record` only if nothing exists under `key`.
    async fn create_visit(&self, key: &ItemKey, record: &VisitRecord) -> Result<PutResult>;

    /// Atomically register a visit: `visit_count += 1`, `last_visit = at`,
    /// and `notes` replaced only when given.
    ///
    /// Returns the updated record, or `None` if no record exists.
    async fn record_visit(
        &self,
        key: &ItemKey,
        at: DateTime<Utc>,
        notes: Option<&Notes>,
    ) -> Result<Option<VisitRecord>>;

    /// Replace only the notes. Returns the updated record, or `None` if absent.
    async fn update_notes(&self, key: &ItemKey, notes: &Notes) -> Result<Option<VisitRecord>>;

    /// Range query: every visit under `pk` whose sort key starts with `prefix`,
    /// ordered by sort key.
    async fn query_visits(&self, pk: &PartitionKey, prefix: KeyPrefix) -> Result<Vec<VisitItem>>;
}

#[async_trait]
impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    async fn put_attendee(&self, attendee: &Attendee) -> Result<()> {
        (**self).put_attendee(attendee).await
    }

    async fn query_attendees_by_short_id(&self, short_id: &ShortId) -> Result<Vec<Attendee>> {
        (**self).query_attendees_by_short_id(short_id).await
    }

    async fn put_sponsor(&self, sponsor: &Sponsor) -> Result<()> {
        (**self).put_sponsor(sponsor).await
    }

    async fn get_sponsor(&self, sponsor_id: &SponsorId) -> Result<Option<Sponsor>> {
        (**self).get_sponsor(sponsor_id).await
    }

    async fn list_sponsors(&self) -> Result<Vec<Sponsor>> {
        (**self).list_sponsors().await
    }

    async fn get_visit(&self, key: &ItemKey) -> Result<Option<VisitRecord>> {
        (**self).get_visit(key).await
    }

    async fn put_visit(&self, key: &ItemKey, record: &VisitRecord) -> Result<()> {
        (**self).put_visit(key, record).await
    }

    async fn create_visit(&self, key: &ItemKey, record: &VisitRecord) -> Result<PutResult> {
        (**self).create_visit(key, record).await
    }

    async fn record_visit(
        &self,
        key: &ItemKey,
        at: DateTime<Utc>,
        notes: Option<&Notes>,
    ) -> Result<Option<VisitRecord>> {
        (**self).record_visit(key, at, notes).await
    }

    async fn update_notes(&self, key: &ItemKey, notes: &Notes) -> Result<Option<VisitRecord>> {
        (**self).update_notes(key, notes).await
    }

    async fn query_visits(&self, pk: &PartitionKey, prefix: KeyPrefix) -> Result<Vec<VisitItem>> {
        (**self).query_visits(pk, prefix).await
    }
}

/// Extension trait for common ledger patterns.
pub trait LedgerExt: Ledger {
    /// Locate the visit record for an (attendee, sponsor) pair, together with
    /// the key it is stored under.
    ///
    /// The canonical `SPONSOR#<id>` key is read first. Older partitions may
    /// hold the record under a qualified key (`SPONSOR#<id>#<qualifier>`);
    /// those match on the exact sponsor id, so `SPONSOR#55` never answers
    /// for sponsor `5`.
    fn find_visit(
        &self,
        user_id: &UserId,
        sponsor_id: &SponsorId,
    ) -> impl std::future::Future<Output = Result<Option<(ItemKey, VisitRecord)>>> + Send;

    /// Read the visit record for an (attendee, sponsor) pair.
    fn visit_of(
        &self,
        user_id: &UserId,
        sponsor_id: &SponsorId,
    ) -> impl std::future::Future<Output = Result<Option<VisitRecord>>> + Send;

    /// Every visit record in an attendee's partition.
    fn visits_of(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<VisitItem>>> + Send;
}

impl<L: Ledger + ?Sized> LedgerExt for L {
    async fn find_visit(
        &self,
        user_id: &UserId,
        sponsor_id: &SponsorId,
    ) -> Result<Option<(ItemKey, VisitRecord)>> {
        let key = ItemKey::visit(user_id, sponsor_id);
        if let Some(record) = self.get_visit(&key).await? {
            return Ok(Some((key, record)));
        }

        for item in self.visits_of(user_id).await? {
            // Unparseable keys are skipped here and reported by status reads.
            let Ok(sk) = item.sort_key.parse::<SortKey>() else {
                continue;
            };
            if sk.sponsor_id() == Some(sponsor_id) {
                let key = ItemKey {
                    pk: PartitionKey::User(user_id.clone()),
                    sk,
                };
                return Ok(Some((key, item.record)));
            }
        }

        Ok(None)
    }

    async fn visit_of(&self, user_id: &UserId, sponsor_id: &SponsorId) -> Result<Option<VisitRecord>> {
        Ok(self
            .find_visit(user_id, sponsor_id)
            .await?
            .map(|(_, record)| record))
    }

    async fn visits_of(&self, user_id: &UserId) -> Result<Vec<VisitItem>> {
        self.query_visits(&PartitionKey::User(user_id.clone()), KeyPrefix::Sponsor)
            .await
    }
}
