//! SQLite implementation of the Ledger trait.
//!
//! This is the persistent backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use passport_core::{
    Attendee, ItemKey, KeyPrefix, Notes, PartitionKey, ShortId, Sponsor, SponsorId, UserId,
    VisitRecord,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Ledger, PutResult, VisitItem};

/// SQLite-based ledger implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(format!("mutex poisoned: {}", e)))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

const VISIT_COLUMNS: &str = "sk, created_at, last_visit, visit_count, notes";

/// A visit row as stored, before validation.
struct VisitRow {
    sk: String,
    created_at: String,
    last_visit: String,
    visit_count: i64,
    notes: Option<String>,
}

impl VisitRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            sk: row.get("sk")?,
            created_at: row.get("created_at")?,
            last_visit: row.get("last_visit")?,
            visit_count: row.get("visit_count")?,
            notes: row.get("notes")?,
        })
    }

    fn into_item(self) -> Result<VisitItem> {
        let visit_count = u64::try_from(self.visit_count).map_err(|_| {
            StoreError::InvalidData(format!("negative visit_count under {}", self.sk))
        })?;

        let record = VisitRecord {
            created_at: parse_timestamp(&self.created_at)?,
            last_visit: parse_timestamp(&self.last_visit)?,
            visit_count,
            notes: self.notes.and_then(Notes::new),
        };

        Ok(VisitItem {
            sort_key: self.sk,
            record,
        })
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("timestamp {raw:?}: {e}")))
}

/// An attendee row as stored; identifiers are validated in `into_attendee`.
struct AttendeeRow {
    user_id: String,
    short_id: String,
    first_name: String,
    last_name: String,
    role: Option<String>,
    company: Option<String>,
}

impl AttendeeRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            short_id: row.get("short_id")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            role: row.get("role")?,
            company: row.get("company")?,
        })
    }

    fn into_attendee(self) -> Result<Attendee> {
        Ok(Attendee {
            user_id: UserId::new(self.user_id)?,
            short_id: ShortId::new(self.short_id)?,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            company: self.company,
        })
    }
}

fn row_to_sponsor(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, bool)> {
    Ok((
        row.get("sponsor_id")?,
        row.get("sponsor_name")?,
        row.get("key")?,
        row.get("required")?,
    ))
}

fn finish_sponsor(
    (sponsor_id, sponsor_name, key, required): (String, String, String, bool),
) -> Result<Sponsor> {
    Ok(Sponsor {
        sponsor_id: SponsorId::new(sponsor_id)?,
        sponsor_name,
        key,
        required,
    })
}

#[async_trait]
impl Ledger for SqliteStore {
    async fn put_attendee(&self, attendee: &Attendee) -> Result<()> {
        let attendee = attendee.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO attendees
                    (user_id, short_id, first_name, last_name, role, company)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    attendee.user_id.as_str(),
                    attendee.short_id.as_str(),
                    attendee.first_name,
                    attendee.last_name,
                    attendee.role,
                    attendee.company,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn query_attendees_by_short_id(&self, short_id: &ShortId) -> Result<Vec<Attendee>> {
        let short_id = short_id.clone();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, short_id, first_name, last_name, role, company
                 FROM attendees WHERE short_id = ?1
                 ORDER BY user_id",
            )?;
            let rows = stmt
                .query_map(params![short_id.as_str()], AttendeeRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(AttendeeRow::into_attendee).collect()
        })
        .await
    }

    async fn put_sponsor(&self, sponsor: &Sponsor) -> Result<()> {
        let sponsor = sponsor.clone();
        self.blocking(move |conn| {
            let key = ItemKey::sponsor_profile(&sponsor.sponsor_id);
            conn.execute(
                "INSERT OR REPLACE INTO sponsors
                    (pk, sk, sponsor_id, sponsor_name, key, required)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key.pk.encode(),
                    key.sk.encode(),
                    sponsor.sponsor_id.as_str(),
                    sponsor.sponsor_name,
                    sponsor.key,
                    sponsor.required,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_sponsor(&self, sponsor_id: &SponsorId) -> Result<Option<Sponsor>> {
        let key = ItemKey::sponsor_profile(sponsor_id);
        self.blocking(move |conn| {
            conn.query_row(
                "SELECT sponsor_id, sponsor_name, key, required
                 FROM sponsors WHERE pk = ?1 AND sk = ?2",
                params![key.pk.encode(), key.sk.encode()],
                row_to_sponsor,
            )
            .optional()?
            .map(finish_sponsor)
            .transpose()
        })
        .await
    }

    async fn list_sponsors(&self) -> Result<Vec<Sponsor>> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT sponsor_id, sponsor_name, key, required
                 FROM sponsors ORDER BY sponsor_id",
            )?;
            let rows = stmt
                .query_map([], row_to_sponsor)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(finish_sponsor).collect()
        })
        .await
    }

    async fn get_visit(&self, key: &ItemKey) -> Result<Option<VisitRecord>> {
        let (pk, sk) = (key.pk.encode(), key.sk.encode());
        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {VISIT_COLUMNS} FROM visits WHERE pk = ?1 AND sk = ?2"),
                    params![pk, sk],
                    VisitRow::from_row,
                )
                .optional()?;
            row.map(|r| r.into_item().map(|item| item.record))
                .transpose()
        })
        .await
    }

    async fn put_visit(&self, key: &ItemKey, record: &VisitRecord) -> Result<()> {
        let (pk, sk) = (key.pk.encode(), key.sk.encode());
        let record = record.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO visits
                    (pk, sk, created_at, last_visit, visit_count, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    pk,
                    sk,
                    format_timestamp(&record.created_at),
                    format_timestamp(&record.last_visit),
                    record.visit_count as i64,
                    record.notes.as_ref().map(Notes::as_str),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn create_visit(&self, key: &ItemKey, record: &VisitRecord) -> Result<PutResult> {
        let (pk, sk) = (key.pk.encode(), key.sk.encode());
        let record = record.clone();
        self.blocking(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO visits
                    (pk, sk, created_at, last_visit, visit_count, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(pk, sk) DO NOTHING",
                params![
                    pk,
                    sk,
                    format_timestamp(&record.created_at),
                    format_timestamp(&record.last_visit),
                    record.visit_count as i64,
                    record.notes.as_ref().map(Notes::as_str),
                ],
            )?;

            Ok(if inserted == 1 {
                PutResult::Created
            } else {
                PutResult::AlreadyExists
            })
        })
        .await
    }

    async fn record_visit(
        &self,
        key: &ItemKey,
        at: DateTime<Utc>,
        notes: Option<&Notes>,
    ) -> Result<Option<VisitRecord>> {
        let (pk, sk) = (key.pk.encode(), key.sk.encode());
        let notes = notes.map(|n| n.as_str().to_string());
        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    &format!(
                        "UPDATE visits
                         SET visit_count = visit_count + 1,
                             last_visit = ?3,
                             notes = COALESCE(?4, notes)
                         WHERE pk = ?1 AND sk = ?2
                         RETURNING {VISIT_COLUMNS}"
                    ),
                    params![pk, sk, format_timestamp(&at), notes],
                    VisitRow::from_row,
                )
                .optional()?;
            row.map(|r| r.into_item().map(|item| item.record))
                .transpose()
        })
        .await
    }

    async fn update_notes(&self, key: &ItemKey, notes: &Notes) -> Result<Option<VisitRecord>> {
        let (pk, sk) = (key.pk.encode(), key.sk.encode());
        let notes = notes.as_str().to_string();
        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    &format!(
                        "UPDATE visits SET notes = ?3
                         WHERE pk = ?1 AND sk = ?2
                         RETURNING {VISIT_COLUMNS}"
                    ),
                    params![pk, sk, notes],
                    VisitRow::from_row,
                )
                .optional()?;
            row.map(|r| r.into_item().map(|item| item.record))
                .transpose()
        })
        .await
    }

    async fn query_visits(&self, pk: &PartitionKey, prefix: KeyPrefix) -> Result<Vec<VisitItem>> {
        let pk = pk.encode();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VISIT_COLUMNS} FROM visits
                 WHERE pk = ?1 AND substr(sk, 1, length(?2)) = ?2
                 ORDER BY sk"
            ))?;
            let rows = stmt
                .query_map(params![pk, prefix.as_str()], VisitRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(VisitRow::into_item).collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use passport_core::SortKey;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn key(user: &str, sponsor: &str) -> ItemKey {
        ItemKey::visit(&UserId::new(user).unwrap(), &SponsorId::new(sponsor).unwrap())
    }

    #[tokio::test]
    async fn test_attendee_lookup() {
        let store = SqliteStore::open_memory().unwrap();
        let attendee = Attendee {
            user_id: UserId::new("u-1").unwrap(),
            short_id: ShortId::new("ABC123").unwrap(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            role: Some("Admiral".into()),
            company: None,
        };
        store.put_attendee(&attendee).await.unwrap();

        let found = store
            .query_attendees_by_short_id(&ShortId::new("ABC123").unwrap())
            .await
            .unwrap();
        assert_eq!(found, vec![attendee]);
    }

    #[tokio::test]
    async fn test_visit_lifecycle() {
        let store = SqliteStore::open_memory().unwrap();
        let k = key("u-1", "5");

        assert_eq!(store.get_visit(&k).await.unwrap(), None);
        assert_eq!(
            store
                .create_visit(&k, &VisitRecord::first_visit(at(100), None))
                .await
                .unwrap(),
            PutResult::Created
        );
        assert_eq!(
            store
                .create_visit(&k, &VisitRecord::first_visit(at(200), None))
                .await
                .unwrap(),
            PutResult::AlreadyExists
        );

        let visited = store
            .record_visit(&k, at(300), Notes::new("great booth").as_ref())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(visited.visit_count, 2);
        assert_eq!(visited.created_at, at(100));
        assert_eq!(visited.last_visit, at(300));
        assert_eq!(visited.notes, Notes::new("great booth"));

        let visited = store.record_visit(&k, at(400), None).await.unwrap().unwrap();
        assert_eq!(visited.visit_count, 3);
        assert_eq!(visited.notes, Notes::new("great booth"));

        let commented = store
            .update_notes(&k, &Notes::new("typo fix").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(commented.visit_count, 3);
        assert_eq!(commented.last_visit, at(400));
        assert_eq!(commented.notes, Notes::new("typo fix"));
    }

    #[tokio::test]
    async fn test_updates_on_missing_record() {
        let store = SqliteStore::open_memory().unwrap();
        let k = key("u-1", "5");
        assert_eq!(store.record_visit(&k, at(1), None).await.unwrap(), None);
        assert_eq!(
            store
                .update_notes(&k, &Notes::new("x").unwrap())
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_prefix_query_includes_qualified_keys() {
        let store = SqliteStore::open_memory().unwrap();
        let user = UserId::new("u-1").unwrap();
        let record = VisitRecord::first_visit(at(100), None);

        store.put_visit(&key("u-1", "2"), &record).await.unwrap();
        let legacy = ItemKey {
            pk: PartitionKey::User(user.clone()),
            sk: SortKey::Sponsor {
                id: SponsorId::new("2").unwrap(),
                qualifier: Some("2024-05-01T10:00:00+00:00".into()),
            },
        };
        store.put_visit(&legacy, &record).await.unwrap();
        let profile = ItemKey {
            pk: PartitionKey::User(user.clone()),
            sk: SortKey::Profile,
        };
        store.put_visit(&profile, &record).await.unwrap();

        let items = store
            .query_visits(&PartitionKey::User(user), KeyPrefix::Sponsor)
            .await
            .unwrap();
        let keys: Vec<&str> = items.iter().map(|i| i.sort_key.as_str()).collect();
        assert_eq!(keys, vec!["SPONSOR#2", "SPONSOR#2#2024-05-01T10:00:00+00:00"]);
    }

    #[tokio::test]
    async fn test_sponsor_profiles() {
        let store = SqliteStore::open_memory().unwrap();
        let sponsor = Sponsor {
            sponsor_id: SponsorId::new("5").unwrap(),
            sponsor_name: "Encora".into(),
            key: "d6f1c7c4".into(),
            required: true,
        };
        store.put_sponsor(&sponsor).await.unwrap();

        assert_eq!(
            store.get_sponsor(&sponsor.sponsor_id).await.unwrap(),
            Some(sponsor.clone())
        );
        assert_eq!(store.list_sponsors().await.unwrap(), vec![sponsor]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passport.db");
        let k = key("u-1", "5");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .create_visit(&k, &VisitRecord::first_visit(at(100), Notes::new("hi")))
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let record = store.get_visit(&k).await.unwrap().unwrap();
        assert_eq!(record.visit_count, 1);
        assert_eq!(record.notes, Notes::new("hi"));
    }
}
