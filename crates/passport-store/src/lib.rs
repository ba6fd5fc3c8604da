//! # Passport Store
//!
//! Storage abstraction for the passport stamping service. Attendees, sponsor
//! profiles and visit records live in one logical table addressed by
//! structured partition and sort keys.
//!
//! ## Key Types
//!
//! - [`Ledger`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`PutResult`] - Result of a conditional create
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use passport_core::{ItemKey, SponsorId, UserId, VisitRecord};
//! use passport_store::{Ledger, PutResult, SqliteStore};
//!
//! async fn example() -> passport_store::Result<()> {
//!     let store = SqliteStore::open("passport.db")?;
//!
//!     let key = ItemKey::visit(&UserId::new("u-1")?, &SponsorId::new("5")?);
//!     let record = VisitRecord::first_visit(Utc::now(), None);
//!     if store.create_visit(&key, &record).await? == PutResult::AlreadyExists {
//!         store.record_visit(&key, Utc::now(), None).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Ledger, LedgerExt, PutResult, VisitItem};
