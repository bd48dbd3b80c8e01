//! SQL-facing half of tether: bound values, rows and the scan contract, the
//! query executor boundary, named raw statements, loader configuration and
//! the batched relation loader.

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod executor;
pub mod loader;
pub mod row;
pub mod statement;
pub mod value;

// re-exports
pub use config::LoaderConfig;
pub use error::{ConfigError, QueryError, RelationError, ScanError, StatementError};
pub use executor::{Dialect, QueryContext, QueryExecutor};
pub use loader::{Loader, RelationQuery, load_belongs_to, load_has_many};
pub use row::{Column, Row, Scan};
pub use statement::RawStatementStore;
pub use value::{FromValue, IdValuesExt, Value};
