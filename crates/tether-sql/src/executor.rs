use crate::{
    error::QueryError,
    row::{Row, Scan},
    value::Value,
};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tether_core::{collection::Collection, identity::Identifiable};

///
/// QueryContext
///
/// Per-call cancellation and diagnostics context. The loader only carries
/// it through; executors decide how to honor the deadline.
///

#[derive(Clone, Debug, Default)]
pub struct QueryContext {
    label: Option<String>,
    deadline: Option<Instant>,
}

impl QueryContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            label: None,
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when no deadline is set.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }
}

///
/// Dialect
///
/// Placeholder style of the underlying SQL driver.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `?, ?, ?`
    #[default]
    Question,
    /// `$1, $2, $3`
    Dollar,
    /// `:1, :2, :3`
    Colon,
}

impl Dialect {
    /// Render `count` placeholders, the first one at 1-based position
    /// `start`. Positional styles number from `start`; `Question` ignores it.
    #[must_use]
    pub fn placeholders(self, count: usize, start: usize) -> String {
        let start = start.max(1);
        let rendered: Vec<String> = match self {
            Self::Question => vec!["?".to_string(); count],
            Self::Dollar => (start..start + count).map(|n| format!("${n}")).collect(),
            Self::Colon => (start..start + count).map(|n| format!(":{n}")).collect(),
        };

        rendered.join(", ")
    }
}

///
/// QueryExecutor
///
/// The query collaborator: runs parameterized statements and renders
/// placeholders for its driver. The loader never touches a connection
/// directly.
///

pub trait QueryExecutor {
    type Error;

    /// Render `count` placeholders starting at 1-based position `start`.
    fn placeholders(&self, count: usize, start: usize) -> String;

    /// Execute `statement` with `args` and return the rows in result order.
    fn query_rows(
        &self,
        ctx: &QueryContext,
        statement: &str,
        args: &[Value],
    ) -> Result<Vec<Row>, Self::Error>;

    /// Execute `statement` and scan every row into an ordered collection,
    /// in result order.
    fn query_collection<P>(
        &self,
        ctx: &QueryContext,
        statement: &str,
        args: &[Value],
    ) -> Result<Collection<P>, QueryError<Self::Error>>
    where
        P: Identifiable + Scan,
    {
        let rows = self
            .query_rows(ctx, statement, args)
            .map_err(QueryError::Execute)?;

        let mut coll = Collection::new_ordered();
        for (index, row) in rows.iter().enumerate() {
            let item = P::scan(row).map_err(|source| QueryError::Scan { row: index, source })?;
            coll.add(item);
        }

        Ok(coll)
    }
}

impl<X: QueryExecutor + ?Sized> QueryExecutor for &X {
    type Error = X::Error;

    fn placeholders(&self, count: usize, start: usize) -> String {
        (**self).placeholders(count, start)
    }

    fn query_rows(
        &self,
        ctx: &QueryContext,
        statement: &str,
        args: &[Value],
    ) -> Result<Vec<Row>, Self::Error> {
        (**self).query_rows(ctx, statement, args)
    }
}

///
/// TESTS
///
