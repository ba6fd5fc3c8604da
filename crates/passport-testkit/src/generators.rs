//! Proptest generators for property-based testing.

use proptest::prelude::*;

use passport_core::{Attendee, ShortId, SponsorId, UserId};

/// Generate a badge short id.
pub fn short_id() -> impl Strategy<Value = ShortId> {
    "[A-Z0-9]{6}".prop_map(|s| ShortId::new(s).unwrap())
}

/// Generate a durable user id.
pub fn user_id() -> impl Strategy<Value = UserId> {
    "u-[a-z0-9]{1,12}".prop_map(|s| UserId::new(s).unwrap())
}

/// Generate a sponsor id.
pub fn sponsor_id() -> impl Strategy<Value = SponsorId> {
    "[1-9][0-9]{0,2}".prop_map(|s| SponsorId::new(s).unwrap())
}

/// Generate submitted notes as a booth would send them, including absent,
/// empty, and whitespace-only values.
pub fn submitted_notes() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("   ".to_string())),
        "[a-zA-Z0-9 ,.!]{1,40}".prop_map(Some),
    ]
}

/// Generate an attendee profile.
pub fn attendee() -> impl Strategy<Value = Attendee> {
    (
        user_id(),
        short_id(),
        "[A-Z][a-z]{1,10}",
        "[A-Z][a-z]{1,12}",
        prop::option::of("[A-Za-z ]{1,20}"),
        prop::option::of("[A-Za-z ]{1,20}"),
    )
        .prop_map(
            |(user_id, short_id, first_name, last_name, role, company)| Attendee {
                user_id,
                short_id,
                first_name,
                last_name,
                role,
                company,
            },
        )
}

/// One stamp submission after the first visit.
#[derive(Debug, Clone)]
pub struct StampStep {
    pub notes: Option<String>,
    pub register_visit: Option<bool>,
}

impl StampStep {
    /// Whether this step only replaces notes.
    pub fn is_comment_only(&self) -> bool {
        matches!(self.notes.as_deref(), Some(n) if !n.is_empty())
            && self.register_visit == Some(false)
    }
}

impl Arbitrary for StampStep {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            submitted_notes(),
            prop_oneof![Just(None), Just(Some(true)), Just(Some(false))],
        )
            .prop_map(|(notes, register_visit)| StampStep {
                notes,
                register_visit,
            })
            .boxed()
    }
}

/// Generate a sequence of stamp steps.
pub fn stamp_steps(max_len: usize) -> impl Strategy<Value = Vec<StampStep>> {
    prop::collection::vec(any::<StampStep>(), 1..=max_len)
}
