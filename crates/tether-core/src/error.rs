use std::fmt;
use thiserror::Error as ThisError;

///
/// ErrorClass
/// Taxonomy shared by every error the workspace returns.
/// Labels are stable and safe to use in logs and metrics.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    UsageContract,
    Fetch,
    LinkIntegrity,
    Scan,
    Config,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::UsageContract => "usage_contract",
            Self::Fetch => "fetch",
            Self::LinkIntegrity => "link_integrity",
            Self::Scan => "scan",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

///
/// CollectionError
///
/// The caller asked a collection for a guarantee it never made.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CollectionError {
    #[error("collection is unordered: no order sequence has been established")]
    Unordered,
}

impl CollectionError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        ErrorClass::UsageContract
    }
}

///
/// LinkError
///
/// Failures raised while linking two collections: a foreign key with no
/// parent under strict linking, or a slot the caller still has borrowed.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum LinkError {
    #[error("{missing} foreign key(s) have no matching parent (first: {first})")]
    MissingParent { missing: usize, first: String },

    #[error("has-many slot is still borrowed; release the borrow before relinking")]
    SlotBorrowed,
}

impl LinkError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::MissingParent { .. } => ErrorClass::LinkIntegrity,
            Self::SlotBorrowed => ErrorClass::UsageContract,
        }
    }
}
