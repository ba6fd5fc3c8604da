//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a seeded in-memory ledger, a
//! pinned clock, token minting, and ledger wrappers that inject failures.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use passport::{Passport, TokenKeys};
use passport_auth::{Claims, SigningKey, TokenSigner, SEGMENT_ENGINE};
use passport_core::{
    Attendee, Clock, ItemKey, KeyPrefix, Notes, PartitionKey, ShortId, Sponsor, SponsorId, UserId,
    VisitRecord,
};
use passport_store::{Ledger, MemoryStore, PutResult, Result as StoreResult, StoreError, VisitItem};
use serde_json::Value;
use sha2::Sha256;

/// HS256 secret shared by fixture tokens.
pub const FIXTURE_SECRET: &[u8] = b"fixture-secret";

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// The time fixtures start at: 2024-05-01T10:00:00Z.
pub fn fixture_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

/// A test fixture with a memory ledger, manual clock and HS256 key.
pub struct TestFixture {
    pub ledger: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub signer: TokenSigner,
    pub passport: Arc<Passport<Arc<MemoryStore>>>,
}

impl TestFixture {
    /// Create an empty fixture at [`fixture_start`].
    pub fn new() -> Self {
        Self::with_ledger(Arc::new(MemoryStore::new()))
    }

    /// Create a fixture over an existing ledger.
    pub fn with_ledger(ledger: Arc<MemoryStore>) -> Self {
        let key = SigningKey::hs256(FIXTURE_SECRET.to_vec());
        let clock = Arc::new(ManualClock::new(fixture_start()));
        let passport = Passport::new(
            ledger.clone(),
            TokenKeys::new(key.clone(), Duration::hours(12)),
            clock.clone(),
        );

        Self {
            ledger,
            clock,
            signer: TokenSigner::new(key),
            passport: Arc::new(passport),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Register an attendee.
    pub async fn add_attendee(&self, user_id: &str, short_id: &str) -> Attendee {
        let attendee = Attendee {
            user_id: UserId::new(user_id).unwrap(),
            short_id: ShortId::new(short_id).unwrap(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            role: Some("Engineer".into()),
            company: Some("Analytical Engines".into()),
        };
        self.ledger.put_attendee(&attendee).await.unwrap();
        attendee
    }

    /// Provision a sponsor profile.
    pub async fn add_sponsor(&self, sponsor_id: &str, key: &str, required: bool) -> Sponsor {
        let sponsor = Sponsor {
            sponsor_id: SponsorId::new(sponsor_id).unwrap(),
            sponsor_name: format!("Sponsor {sponsor_id}"),
            key: key.into(),
            required,
        };
        self.ledger.put_sponsor(&sponsor).await.unwrap();
        sponsor
    }

    /// A token for `sponsor_id` valid for one hour from the fixture clock.
    pub fn token_for(&self, sponsor_id: &str) -> String {
        self.signer.sign(
            &Claims::new(SponsorId::new(sponsor_id).unwrap())
                .expires_at((self.now() + Duration::hours(1)).timestamp()),
        )
    }

    /// A token for `sponsor_id` that expired a minute ago.
    pub fn expired_token_for(&self, sponsor_id: &str) -> String {
        self.signer.sign(
            &Claims::new(SponsorId::new(sponsor_id).unwrap())
                .expires_at((self.now() - Duration::minutes(1)).timestamp()),
        )
    }

    /// A correctly signed token whose payload has no `sponsor_id`.
    pub fn token_without_sponsor(&self) -> String {
        sign_raw_hs256(
            FIXTURE_SECRET,
            &serde_json::json!({ "exp": (self.now() + Duration::hours(1)).timestamp() }),
        )
    }

    /// A token for `sponsor_id` with one signature character changed.
    pub fn tampered_token_for(&self, sponsor_id: &str) -> String {
        let token = self.token_for(sponsor_id);
        let at = token.rfind('.').unwrap() + 1;
        let replacement = if token[at..].starts_with('A') { "B" } else { "A" };

        let mut tampered = token;
        tampered.replace_range(at..at + 1, replacement);
        tampered
    }

    /// Read the visit record for a pair.
    pub async fn visit(&self, user_id: &str, sponsor_id: &str) -> Option<VisitRecord> {
        self.ledger
            .get_visit(&ItemKey::visit(
                &UserId::new(user_id).unwrap(),
                &SponsorId::new(sponsor_id).unwrap(),
            ))
            .await
            .unwrap()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// The reference scenario: attendee `u-1` with badge `ABC123`, and sponsor
/// `5` whose login key is `booth-5-key`.
pub async fn scenario() -> TestFixture {
    let fixture = TestFixture::new();
    fixture.add_attendee("u-1", "ABC123").await;
    fixture.add_sponsor("5", "booth-5-key", true).await;
    fixture
}

/// HS256-sign an arbitrary JSON payload.
pub fn sign_raw_hs256(secret: &[u8], payload: &Value) -> String {
    let header = SEGMENT_ENGINE.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = SEGMENT_ENGINE.encode(serde_json::to_vec(payload).unwrap());
    let input = format!("{header}.{payload}");

    let mut mac = Hmac::<Sha256>::new_from_slice(secret).unwrap();
    mac.update(input.as_bytes());
    format!("{input}.{}", SEGMENT_ENGINE.encode(mac.finalize().into_bytes()))
}

/// A ledger whose backend is unreachable.
#[derive(Debug, Default)]
pub struct FailingLedger;

fn unavailable<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("connection refused".into()))
}

#[async_trait]
impl Ledger for FailingLedger {
    async fn put_attendee(&self, _: &Attendee) -> StoreResult<()> {
        unavailable()
    }

    async fn query_attendees_by_short_id(&self, _: &ShortId) -> StoreResult<Vec<Attendee>> {
        unavailable()
    }

    async fn put_sponsor(&self, _: &Sponsor) -> StoreResult<()> {
        unavailable()
    }

    async fn get_sponsor(&self, _: &SponsorId) -> StoreResult<Option<Sponsor>> {
        unavailable()
    }

    async fn list_sponsors(&self) -> StoreResult<Vec<Sponsor>> {
        unavailable()
    }

    async fn get_visit(&self, _: &ItemKey) -> StoreResult<Option<VisitRecord>> {
        unavailable()
    }

    async fn put_visit(&self, _: &ItemKey, _: &VisitRecord) -> StoreResult<()> {
        unavailable()
    }

    async fn create_visit(&self, _: &ItemKey, _: &VisitRecord) -> StoreResult<PutResult> {
        unavailable()
    }

    async fn record_visit(
        &self,
        _: &ItemKey,
        _: DateTime<Utc>,
        _: Option<&Notes>,
    ) -> StoreResult<Option<VisitRecord>> {
        unavailable()
    }

    async fn update_notes(&self, _: &ItemKey, _: &Notes) -> StoreResult<Option<VisitRecord>> {
        unavailable()
    }

    async fn query_visits(&self, _: &PartitionKey, _: KeyPrefix) -> StoreResult<Vec<VisitItem>> {
        unavailable()
    }
}

/// Wraps a ledger, counting calls and optionally serving one stale visit read.
///
/// With `stale_first_read` set, the first visit lookup (the point read and
/// the prefix query that follows it) reports no record even if one exists,
/// which is what a stamp sees when it loses a first-visit race to a
/// concurrent request.
pub struct SpyLedger<L: Ledger> {
    inner: L,
    calls: AtomicUsize,
    stale_first_read: AtomicBool,
    stale_query: AtomicBool,
}

impl<L: Ledger> SpyLedger<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            stale_first_read: AtomicBool::new(false),
            stale_query: AtomicBool::new(false),
        }
    }

    pub fn with_stale_first_read(self) -> Self {
        self.stale_first_read.store(true, Ordering::SeqCst);
        self
    }

    /// Number of ledger calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<L: Ledger> Ledger for SpyLedger<L> {
    async fn put_attendee(&self, attendee: &Attendee) -> StoreResult<()> {
        self.hit();
        self.inner.put_attendee(attendee).await
    }

    async fn query_attendees_by_short_id(&self, short_id: &ShortId) -> StoreResult<Vec<Attendee>> {
        self.hit();
        self.inner.query_attendees_by_short_id(short_id).await
    }

    async fn put_sponsor(&self, sponsor: &Sponsor) -> StoreResult<()> {
        self.hit();
        self.inner.put_sponsor(sponsor).await
    }

    async fn get_sponsor(&self, sponsor_id: &SponsorId) -> StoreResult<Option<Sponsor>> {
        self.hit();
        self.inner.get_sponsor(sponsor_id).await
    }

    async fn list_sponsors(&self) -> StoreResult<Vec<Sponsor>> {
        self.hit();
        self.inner.list_sponsors().await
    }

    async fn get_visit(&self, key: &ItemKey) -> StoreResult<Option<VisitRecord>> {
        self.hit();
        if self.stale_first_read.swap(false, Ordering::SeqCst) {
            self.stale_query.store(true, Ordering::SeqCst);
            return Ok(None);
        }
        self.inner.get_visit(key).await
    }

    async fn put_visit(&self, key: &ItemKey, record: &VisitRecord) -> StoreResult<()> {
        self.hit();
        self.inner.put_visit(key, record).await
    }

    async fn create_visit(&self, key: &ItemKey, record: &VisitRecord) -> StoreResult<PutResult> {
        self.hit();
        self.inner.create_visit(key, record).await
    }

    async fn record_visit(
        &self,
        key: &ItemKey,
        at: DateTime<Utc>,
        notes: Option<&Notes>,
    ) -> StoreResult<Option<VisitRecord>> {
        self.hit();
        self.inner.record_visit(key, at, notes).await
    }

    async fn update_notes(&self, key: &ItemKey, notes: &Notes) -> StoreResult<Option<VisitRecord>> {
        self.hit();
        self.inner.update_notes(key, notes).await
    }

    async fn query_visits(&self, pk: &PartitionKey, prefix: KeyPrefix) -> StoreResult<Vec<VisitItem>> {
        self.hit();
        if self.stale_query.swap(false, Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        self.inner.query_visits(pk, prefix).await
    }
}

/// A ledger where a first-visit create always loses and the record never
/// becomes readable, so every stamp attempt is contended.
#[derive(Default)]
pub struct ContendedLedger {
    inner: MemoryStore,
}

impl ContendedLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for ContendedLedger {
    async fn put_attendee(&self, attendee: &Attendee) -> StoreResult<()> {
        self.inner.put_attendee(attendee).await
    }

    async fn query_attendees_by_short_id(&self, short_id: &ShortId) -> StoreResult<Vec<Attendee>> {
        self.inner.query_attendees_by_short_id(short_id).await
    }

    async fn put_sponsor(&self, sponsor: &Sponsor) -> StoreResult<()> {
        self.inner.put_sponsor(sponsor).await
    }

    async fn get_sponsor(&self, sponsor_id: &SponsorId) -> StoreResult<Option<Sponsor>> {
        self.inner.get_sponsor(sponsor_id).await
    }

    async fn list_sponsors(&self) -> StoreResult<Vec<Sponsor>> {
        self.inner.list_sponsors().await
    }

    async fn get_visit(&self, _: &ItemKey) -> StoreResult<Option<VisitRecord>> {
        Ok(None)
    }

    async fn put_visit(&self, key: &ItemKey, record: &VisitRecord) -> StoreResult<()> {
        self.inner.put_visit(key, record).await
    }

    async fn create_visit(&self, _: &ItemKey, _: &VisitRecord) -> StoreResult<PutResult> {
        Ok(PutResult::AlreadyExists)
    }

    async fn record_visit(
        &self,
        key: &ItemKey,
        at: DateTime<Utc>,
        notes: Option<&Notes>,
    ) -> StoreResult<Option<VisitRecord>> {
        self.inner.record_visit(key, at, notes).await
    }

    async fn update_notes(&self, key: &ItemKey, notes: &Notes) -> StoreResult<Option<VisitRecord>> {
        self.inner.update_notes(key, notes).await
    }

    async fn query_visits(&self, pk: &PartitionKey, prefix: KeyPrefix) -> StoreResult<Vec<VisitItem>> {
        self.inner.query_visits(pk, prefix).await
    }
}
