//! Entities: attendees, sponsors, visit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ShortId, SponsorId, UserId};

/// A registered attendee. Read-only for this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub user_id: UserId,
    pub short_id: ShortId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// A sponsor booth. Read-only for this service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sponsor {
    pub sponsor_id: SponsorId,
    pub sponsor_name: String,
    /// Shared login credential.
    pub key: String,
    /// Whether a stamp from this sponsor is needed to complete the passport.
    pub required: bool,
}

impl fmt::Debug for Sponsor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sponsor")
            .field("sponsor_id", &self.sponsor_id)
            .field("sponsor_name", &self.sponsor_name)
            .field("key", &"<redacted>")
            .field("required", &self.required)
            .finish()
    }
}

/// Free-text notes attached to a visit.
///
/// Never empty: an empty submission means "no notes" and is represented by
/// `None` at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Notes(String);

impl Notes {
    /// Wrap a non-empty string.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Interpret an optional submitted value. Absent and `""` both mean no notes.
    pub fn from_submitted(value: Option<String>) -> Option<Self> {
        value.and_then(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Notes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Notes {
    type Error = &'static str;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(value).ok_or("notes must not be empty")
    }
}

impl From<Notes> for String {
    fn from(notes: Notes) -> String {
        notes.0
    }
}

/// Per-(attendee, sponsor) visit record.
///
/// Invariants kept by the stamping engine:
/// - `created_at` never changes after creation.
/// - `visit_count` starts at 1 and only ever grows by one per registered visit.
/// - `last_visit` moves only when `visit_count` does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub created_at: DateTime<Utc>,
    pub last_visit: DateTime<Utc>,
    pub visit_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Notes>,
}

impl VisitRecord {
    /// The record written on a first visit.
    pub fn first_visit(now: DateTime<Utc>, notes: Option<Notes>) -> Self {
        Self {
            created_at: now,
            last_visit: now,
            visit_count: 1,
            notes,
        }
    }

    /// Apply a registered visit in place.
    pub fn register_visit(&mut self, now: DateTime<Utc>, notes: Option<Notes>) {
        self.visit_count += 1;
        self.last_visit = now;
        if let Some(notes) = notes {
            self.notes = Some(notes);
        }
    }

    /// Replace the notes without touching the counters.
    pub fn replace_notes(&mut self, notes: Notes) {
        self.notes = Some(notes);
    }
}
