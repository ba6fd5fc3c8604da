//! Strong identifier types.
//!
//! All identifiers are newtypes over `String` so an attendee's durable id can
//! never be passed where a short badge code is expected. Construction rejects
//! empty values and the key separator, which keeps encoded store keys
//! unambiguous.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::key::KEY_SEPARATOR;

fn validate(kind: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CoreError::EmptyIdentifier { kind });
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(CoreError::ReservedCharacter {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a validated identifier.
            pub fn new(value: impl Into<String>) -> Result<Self> {
                let value = value.into();
                validate($kind, &value)?;
                Ok(Self(value))
            }

            /// Borrow the raw string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into the raw string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = CoreError;

            fn try_from(value: &str) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

identifier!(
    /// Durable attendee identity. Primary key of the attendee partition.
    UserId,
    "user_id"
);

identifier!(
    /// Short, attendee-facing code printed on the badge.
    ///
    /// Resolved to a [`UserId`] through a secondary index. Uniqueness per
    /// attendee is guaranteed by registration, not checked here.
    ShortId,
    "short_id"
);

identifier!(
    /// Sponsor identity. Only ever taken from a verified token on write paths.
    SponsorId,
    "sponsor_id"
);
