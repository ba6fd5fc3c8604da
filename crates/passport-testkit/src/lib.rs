//! # Passport Testkit
//!
//! Testing utilities for the passport service.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Fixed tokens with the verdict every verifier must reach
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A seeded in-memory service, a manual clock, token minting,
//!   and ledger wrappers that inject failures
//!
//! ## Golden Vectors
//!
//! ```rust
//! use passport_testkit::vectors::verify_all_vectors;
//!
//! for (name, outcome) in verify_all_vectors() {
//!     assert!(outcome.is_ok(), "{name}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use passport_testkit::generators::{stamp_steps, StampStep};
//!
//! proptest! {
//!     #[test]
//!     fn steps_are_nonempty(steps in stamp_steps(8)) {
//!         prop_assert!(!steps.is_empty());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use passport::StampRequest;
//! use passport_testkit::fixtures::scenario;
//!
//! async fn first_stamp() {
//!     let fixture = scenario().await;
//!     let token = fixture.token_for("5");
//!     let outcome = fixture
//!         .passport
//!         .stamp(StampRequest::new("ABC123", token))
//!         .await
//!         .unwrap();
//!     assert_eq!(outcome.visit_count, 1);
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    fixture_start, scenario, sign_raw_hs256, ContendedLedger, FailingLedger, ManualClock,
    SpyLedger, TestFixture, FIXTURE_SECRET,
};
pub use generators::{stamp_steps, StampStep};
pub use vectors::{all_vectors, check_vector, verify_all_vectors, TokenVector};
