use tether_core::error::{ErrorClass, LinkError};
use thiserror::Error as ThisError;

///
/// ScanError
///
/// A fetched row could not be turned into an entity.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ScanError {
    #[error("row has {found} column(s), expected {expected}")]
    Arity { expected: usize, found: usize },

    #[error("column {index}: expected {expected}, found {found}")]
    Type {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("column {index} is missing from the row")]
    Missing { index: usize },
}

impl ScanError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        ErrorClass::Scan
    }
}

///
/// ColumnError
///
/// A column name that cannot be placed into a predicate clause.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("invalid column name '{name}'")]
pub struct ColumnError {
    pub name: String,
}

impl ColumnError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        ErrorClass::UsageContract
    }
}

///
/// QueryError
///
/// Failure of `QueryExecutor::query_collection`: either the executor's own
/// error, passed through untouched, or a scan failure on a returned row.
///

#[derive(Debug, ThisError)]
pub enum QueryError<E> {
    #[error(transparent)]
    Execute(E),

    #[error("row {row}: {source}")]
    Scan { row: usize, source: ScanError },
}

///
/// RelationError
///
/// Failure of one relation load. Nothing is linked when this is returned.
///

#[derive(Debug, ThisError)]
pub enum RelationError<E> {
    /// The batched fetch failed; the executor error is carried unmodified.
    #[error(transparent)]
    Fetch(E),

    #[error("row {row}: {source}")]
    Scan { row: usize, source: ScanError },

    #[error(transparent)]
    Link(#[from] LinkError),

    /// A key column failed validation; nothing was fetched.
    #[error(transparent)]
    Column(#[from] ColumnError),
}

impl<E> RelationError<E> {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Fetch(_) => ErrorClass::Fetch,
            Self::Scan { .. } => ErrorClass::Scan,
            Self::Link(err) => err.class(),
            Self::Column(_) => ErrorClass::UsageContract,
        }
    }

    /// The executor error, if the fetch itself failed.
    #[must_use]
    pub const fn fetch_error(&self) -> Option<&E> {
        match self {
            Self::Fetch(err) => Some(err),
            _ => None,
        }
    }
}

impl<E> From<QueryError<E>> for RelationError<E> {
    fn from(err: QueryError<E>) -> Self {
        match err {
            QueryError::Execute(err) => Self::Fetch(err),
            QueryError::Scan { row, source } => Self::Scan { row, source },
        }
    }
}

///
/// StatementError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum StatementError {
    #[error("raw statement not found for key: {key}")]
    NotFound { key: String },

    #[error("global statement store is already installed")]
    AlreadyInstalled,
}

impl StatementError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        ErrorClass::UsageContract
    }
}

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid loader config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Column(#[from] ColumnError),
}

impl ConfigError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        ErrorClass::Config
    }
}
