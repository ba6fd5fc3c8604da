//! Versioned SQLite schema.
//!
//! Steps are applied in order inside one transaction. The highest applied
//! version is recorded in `schema_migrations`, so reopening an up-to-date
//! database changes nothing.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Result, StoreError};

struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "profiles",
        sql: r#"
        -- Attendees are provisioned by registration and looked up by badge code.
        CREATE TABLE attendees (
            user_id TEXT PRIMARY KEY,
            short_id TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            role TEXT,
            company TEXT
        );
        CREATE INDEX idx_attendees_short_id ON attendees(short_id);

        -- SPONSOR#<id> / PROFILE
        CREATE TABLE sponsors (
            pk TEXT NOT NULL,
            sk TEXT NOT NULL,
            sponsor_id TEXT NOT NULL,
            sponsor_name TEXT NOT NULL,
            key TEXT NOT NULL,
            required INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (pk, sk)
        );
        "#,
    },
    Step {
        version: 2,
        name: "visits",
        sql: r#"
        -- USER#<user_id> / SPONSOR#<sponsor_id>
        CREATE TABLE visits (
            pk TEXT NOT NULL,
            sk TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_visit TEXT NOT NULL,
            visit_count INTEGER NOT NULL CHECK (visit_count >= 1),
            notes TEXT,
            PRIMARY KEY (pk, sk)
        );
        "#,
    },
];

/// Version a fully migrated database reports.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Highest applied version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Bring the schema up to [`latest_version`]. Returns the resulting version.
///
/// A database written by a newer build is refused rather than downgraded.
pub fn migrate(conn: &mut Connection) -> Result<u32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )?;

    let current = schema_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(StoreError::Migration(format!(
            "schema version {current} is newer than supported version {latest}"
        )));
    }
    if current == latest {
        debug!(version = current, "schema up to date");
        return Ok(current);
    }

    let tx = conn.transaction()?;
    for step in STEPS.iter().filter(|step| step.version > current) {
        tx.execute_batch(step.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![step.version, step.name, chrono::Utc::now().to_rfc3339()],
        )?;
        debug!(version = step.version, name = step.name, "applied migration");
    }
    tx.commit()?;

    info!(from = current, to = latest, "schema migrated");
    Ok(latest)
}
