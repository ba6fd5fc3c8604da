//! # Passport Core
//!
//! Pure types for the passport stamping service: attendee and sponsor
//! identities, visit records, and the structured keys used to lay them out
//! in a single-table store.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`UserId`], [`ShortId`], [`SponsorId`] - Validated identifiers
//! - [`Attendee`], [`Sponsor`] - Read-only profiles provisioned elsewhere
//! - [`VisitRecord`] - The mutable per-(attendee, sponsor) record
//! - [`Notes`] - Submitted free text, never empty
//! - [`PartitionKey`], [`SortKey`], [`ItemKey`] - Store key scheme
//! - [`Clock`] - Injectable time source

pub mod clock;
pub mod entity;
pub mod error;
pub mod key;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use entity::{Attendee, Notes, Sponsor, VisitRecord};
pub use error::{CoreError, Result};
pub use key::{ItemKey, KeyPrefix, PartitionKey, SortKey, KEY_SEPARATOR};
pub use types::{ShortId, SponsorId, UserId};
