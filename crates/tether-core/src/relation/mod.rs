//! Parent/child linking between two already-built collections.
//!
//! Linking is pure: it never fetches. Descriptors are plain closures
//! supplied per call: a foreign-key extractor on the child and an assigner
//! that writes the designated reference slot.

mod link;
mod slot;


use serde::Deserialize;

// re-exports
pub use link::{LinkSummary, link_belongs_to, link_has_many};
pub use slot::{BelongsTo, HasMany, SharedHandle};

///
/// MissingParentPolicy
///
/// What belongs-to linking does with a foreign key that matches no parent.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MissingParentPolicy {
    /// Leave the child's reference slot unset.
    #[default]
    Ignore,
    /// Fail the whole link before any slot is written.
    Reject,
}
