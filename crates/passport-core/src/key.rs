//! Structured keys for the single-table layout.
//!
//! Every item lives under a partition key and a sort key, both encoded as
//! `<KIND>#<id>` strings:
//!
//! | Item | Partition key | Sort key |
//! |---|---|---|
//! | Visit record | `USER#<user_id>` | `SPONSOR#<sponsor_id>` |
//! | Sponsor profile | `SPONSOR#<sponsor_id>` | `PROFILE` |
//!
//! Keys are built and parsed through these types only. Older records may carry
//! a trailing qualifier (`SPONSOR#<id>#<timestamp>`); the qualifier is kept
//! so the key round-trips, but the sponsor id is always the segment directly
//! after the kind tag.

use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::types::{SponsorId, UserId};

/// Separator between key segments.
pub const KEY_SEPARATOR: char = '#';

const USER_TAG: &str = "USER";
const SPONSOR_TAG: &str = "SPONSOR";
const PROFILE_TAG: &str = "PROFILE";

/// Partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartitionKey {
    /// An attendee's partition. Holds all of their visit records.
    User(UserId),
    /// A sponsor's partition. Holds the sponsor profile.
    Sponsor(SponsorId),
}

impl PartitionKey {
    /// Encode to the stored string form.
    pub fn encode(&self) -> String {
        match self {
            PartitionKey::User(id) => format!("{USER_TAG}{KEY_SEPARATOR}{id}"),
            PartitionKey::Sponsor(id) => format!("{SPONSOR_TAG}{KEY_SEPARATOR}{id}"),
        }
    }

    /// Parse the stored string form.
    pub fn parse(raw: &str) -> Result<Self> {
        let (tag, rest) = raw
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| CoreError::InvalidKey(raw.to_string()))?;
        match tag {
            USER_TAG => Ok(PartitionKey::User(UserId::new(rest)?)),
            SPONSOR_TAG => Ok(PartitionKey::Sponsor(SponsorId::new(rest)?)),
            other => Err(CoreError::UnknownKeyKind(other.to_string())),
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for PartitionKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SortKey {
    /// A visit record for one sponsor.
    Sponsor {
        id: SponsorId,
        /// Trailing segment found on legacy records. Never written by the engine.
        qualifier: Option<String>,
    },
    /// The profile item of a partition.
    Profile,
}

impl SortKey {
    /// Sort key of the visit record for `id`.
    pub fn sponsor(id: SponsorId) -> Self {
        SortKey::Sponsor {
            id,
            qualifier: None,
        }
    }

    /// The sponsor this key refers to, if any.
    pub fn sponsor_id(&self) -> Option<&SponsorId> {
        match self {
            SortKey::Sponsor { id, .. } => Some(id),
            SortKey::Profile => None,
        }
    }

    /// Encode to the stored string form.
    pub fn encode(&self) -> String {
        match self {
            SortKey::Sponsor {
                id,
                qualifier: None,
            } => format!("{SPONSOR_TAG}{KEY_SEPARATOR}{id}"),
            SortKey::Sponsor {
                id,
                qualifier: Some(q),
            } => format!("{SPONSOR_TAG}{KEY_SEPARATOR}{id}{KEY_SEPARATOR}{q}"),
            SortKey::Profile => PROFILE_TAG.to_string(),
        }
    }

    /// Parse the stored string form.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw == PROFILE_TAG {
            return Ok(SortKey::Profile);
        }

        let mut segments = raw.splitn(3, KEY_SEPARATOR);
        let tag = segments.next().unwrap_or_default();
        if tag != SPONSOR_TAG {
            return Err(CoreError::UnknownKeyKind(tag.to_string()));
        }

        let id = segments
            .next()
            .ok_or_else(|| CoreError::InvalidKey(raw.to_string()))?;
        let qualifier = segments.next().map(str::to_string);

        Ok(SortKey::Sponsor {
            id: SponsorId::new(id)?,
            qualifier,
        })
    }

    /// Whether this key starts with `prefix`.
    pub fn has_prefix(&self, prefix: KeyPrefix) -> bool {
        self.encode().starts_with(prefix.as_str())
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for SortKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Sort-key prefixes usable in range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Every visit record in a partition.
    Sponsor,
}

impl KeyPrefix {
    /// The encoded prefix, separator included.
    pub const fn as_str(&self) -> &'static str {
        match self {
            KeyPrefix::Sponsor => "SPONSOR#",
        }
    }
}

/// A full composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub pk: PartitionKey,
    pub sk: SortKey,
}

impl ItemKey {
    /// Key of the visit record for an (attendee, sponsor) pair.
    pub fn visit(user_id: &UserId, sponsor_id: &SponsorId) -> Self {
        Self {
            pk: PartitionKey::User(user_id.clone()),
            sk: SortKey::sponsor(sponsor_id.clone()),
        }
    }

    /// Key of a sponsor's profile item.
    pub fn sponsor_profile(sponsor_id: &SponsorId) -> Self {
        Self {
            pk: PartitionKey::Sponsor(sponsor_id.clone()),
            sk: SortKey::Profile,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pk, self.sk)
    }
}
