//! Core runtime for tether: identity-keyed collections, order-aware
//! projections, collection groups, and parent/child linking.
//!
//! Nothing in this crate performs I/O. Batched fetching lives in
//! `tether-sql`, which hands its results to the linkers here.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod collection;
pub mod error;
pub mod group;
pub mod identity;
pub mod obs;
pub mod relation;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sinks, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        collection::Collection,
        group::CollectionGroup,
        identity::Identifiable,
        relation::{BelongsTo, HasMany},
    };
}
