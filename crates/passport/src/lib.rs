//! # Passport
//!
//! A passport stamping service for conference networking. Attendees carry a
//! short badge id; sponsor booths hold a signed token. When an attendee
//! visits a booth, the booth submits the token and the badge id and the
//! service records a stamp.
//!
//! ## Overview
//!
//! - **Stamping**: verify the sponsor token, resolve the attendee, then
//!   create or update the (attendee, sponsor) visit record
//! - **Status**: rebuild an attendee's stamped sponsors from their partition
//! - **Sponsors**: key-based login issuing tokens, and a booth's view of one
//!   attendee
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use passport::{Passport, PassportConfig, StampRequest};
//! use passport::core::SystemClock;
//! use passport::store::SqliteStore;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let mut config = PassportConfig::default();
//!     config.token.secret = Some("booth-secret".into());
//!
//!     let ledger = SqliteStore::open("passport.db")?;
//!     let passport = Passport::new(ledger, config.token.build_keys()?, Arc::new(SystemClock));
//!
//!     let outcome = passport
//!         .stamp(StampRequest::new("ABC123", "<sponsor token>").with_notes("great booth"))
//!         .await?;
//!     println!("{} ({} visits)", outcome.message(), outcome.visit_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `passport::core` - Identifiers, entities and store keys
//! - `passport::auth` - Token signing and verification
//! - `passport::store` - The ledger trait and its backends

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod resolver;
pub mod service;
pub mod sponsor;
pub mod status;

// Re-export component crates
pub use passport_auth as auth;
pub use passport_core as core;
pub use passport_store as store;

// Re-export main types for convenience
pub use config::{PassportConfig, StoreBackend, TokenKeys};
pub use engine::{StampOutcome, StampRequest, StampingEngine, Transition};
pub use error::{ErrorClass, PassportError, Result};
pub use resolver::IdentityResolver;
pub use service::Passport;
pub use sponsor::{LoginRequest, LoginResponse, SponsorPortal, SponsorView};
pub use status::{CompletionView, PassportView, StatusReconstructor};
