//! In-memory implementation of the Ledger trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use passport_core::{
    Attendee, ItemKey, KeyPrefix, Notes, PartitionKey, ShortId, Sponsor, SponsorId, UserId,
    VisitRecord,
};

use crate::error::{Result, StoreError};
use crate::traits::{Ledger, PutResult, VisitItem};

/// In-memory ledger implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; every
/// write method runs under a single write guard, so conditional creates and
/// increments are atomic.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Attendee profiles by durable id.
    attendees: HashMap<UserId, Attendee>,

    /// Sponsor profiles, ordered for listing.
    sponsors: BTreeMap<SponsorId, Sponsor>,

    /// Visit items: encoded pk -> (encoded sk -> record).
    visits: HashMap<String, BTreeMap<String, VisitRecord>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    fn visit_mut(&mut self, key: &ItemKey) -> Option<&mut VisitRecord> {
        self.visits
            .get_mut(&key.pk.encode())
            .and_then(|items| items.get_mut(&key.sk.encode()))
    }
}

#[async_trait]
impl Ledger for MemoryStore {
    async fn put_attendee(&self, attendee: &Attendee) -> Result<()> {
        let mut inner = self.write()?;
        inner
            .attendees
            .insert(attendee.user_id.clone(), attendee.clone());
        Ok(())
    }

    async fn query_attendees_by_short_id(&self, short_id: &ShortId) -> Result<Vec<Attendee>> {
        let inner = self.read()?;
        let mut matches: Vec<Attendee> = inner
            .attendees
            .values()
            .filter(|a| &a.short_id == short_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(matches)
    }

    async fn put_sponsor(&self, sponsor: &Sponsor) -> Result<()> {
        let mut inner = self.write()?;
        inner
            .sponsors
            .insert(sponsor.sponsor_id.clone(), sponsor.clone());
        Ok(())
    }

    async fn get_sponsor(&self, sponsor_id: &SponsorId) -> Result<Option<Sponsor>> {
        let inner = self.read()?;
        Ok(inner.sponsors.get(sponsor_id).cloned())
    }

    async fn list_sponsors(&self) -> Result<Vec<Sponsor>> {
        let inner = self.read()?;
        Ok(inner.sponsors.values().cloned().collect())
    }

    async fn get_visit(&self, key: &ItemKey) -> Result<Option<VisitRecord>> {
        let inner = self.read()?;
        Ok(inner
            .visits
            .get(&key.pk.encode())
            .and_then(|items| items.get(&key.sk.encode()))
            .cloned())
    }

    async fn put_visit(&self, key: &ItemKey, record: &VisitRecord) -> Result<()> {
        let mut inner = self.write()?;
        inner
            .visits
            .entry(key.pk.encode())
            .or_default()
            .insert(key.sk.encode(), record.clone());
        Ok(())
    }

    async fn create_visit(&self, key: &ItemKey, record: &VisitRecord) -> Result<PutResult> {
        let mut inner = self.write()?;
        let items = inner.visits.entry(key.pk.encode()).or_default();

        let sk = key.sk.encode();
        if items.contains_key(&sk) {
            return Ok(PutResult::AlreadyExists);
        }
        items.insert(sk, record.clone());
        Ok(PutResult::Created)
    }

    async fn record_visit(
        &self,
        key: &ItemKey,
        at: DateTime<Utc>,
        notes: Option<&Notes>,
    ) -> Result<Option<VisitRecord>> {
        let mut inner = self.write()?;
        Ok(inner.visit_mut(key).map(|record| {
            record.register_visit(at, notes.cloned());
            record.clone()
        }))
    }

    async fn update_notes(&self, key: &ItemKey, notes: &Notes) -> Result<Option<VisitRecord>> {
        let mut inner = self.write()?;
        Ok(inner.visit_mut(key).map(|record| {
            record.replace_notes(notes.clone());
            record.clone()
        }))
    }

    async fn query_visits(&self, pk: &PartitionKey, prefix: KeyPrefix) -> Result<Vec<VisitItem>> {
        let inner = self.read()?;
        let Some(items) = inner.visits.get(&pk.encode()) else {
            return Ok(Vec::new());
        };

        Ok(items
            .range(prefix.as_str().to_string()..)
            .take_while(|(sk, _)| sk.starts_with(prefix.as_str()))
            .map(|(sk, record)| VisitItem {
                sort_key: sk.clone(),
                record: record.clone(),
            })
            .collect())
    }
}
