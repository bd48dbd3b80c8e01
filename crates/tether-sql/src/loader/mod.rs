//! Relation loader.
//!
//! Resolves one relation for a whole collection with a single batched
//! fetch, then hands both sides to the in-memory linker. Nothing is linked
//! unless the fetch and every scan succeed.

#[cfg(test)]
mod tests;

use crate::{
    config::LoaderConfig,
    error::{RelationError, StatementError},
    executor::{QueryContext, QueryExecutor},
    row::{Column, Scan},
    statement::RawStatementStore,
    value::{IdValuesExt, Value},
};
use std::{any::type_name, fmt::Debug};
use tether_core::{
    collection::Collection,
    error::LinkError,
    identity::Identifiable,
    obs::{MetricsEvent, RelationKind, Span, record},
    relation::{link_belongs_to, link_has_many},
};
use tracing::debug;

///
/// RelationQuery
///
/// Select base for a relation fetch. The base is a complete `SELECT` with
/// no top-level `WHERE`; the key predicate is appended after it. Subqueries
/// inside the base may filter freely.
///
/// An optional filter is ANDed with the key predicate inside parentheses,
/// and an optional tail (`ORDER BY`, `LIMIT`, ...) follows the predicate.
/// Arguments bound by the base or filter come first; generated key
/// placeholders are numbered after them.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelationQuery {
    select_base: String,
    filter: Option<String>,
    tail: Option<String>,
    args: Vec<Value>,
}

impl RelationQuery {
    #[must_use]
    pub fn new(select_base: impl Into<String>) -> Self {
        Self {
            select_base: select_base.into(),
            filter: None,
            tail: None,
            args: Vec::new(),
        }
    }

    /// Select base registered under `key` in `store`.
    pub fn from_store(store: &RawStatementStore, key: &str) -> Result<Self, StatementError> {
        store.require(key).map(Self::new)
    }

    /// Extra predicate combined with the key predicate.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Clause text placed after the key predicate.
    #[must_use]
    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = Some(tail.into());
        self
    }

    /// Append one argument bound by the base or the filter.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn select_base(&self) -> &str {
        &self.select_base
    }

    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    #[must_use]
    pub fn tail(&self) -> Option<&str> {
        self.tail.as_deref()
    }

    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// 1-based position of the first generated placeholder.
    #[must_use]
    pub const fn next_position(&self) -> usize {
        self.args.len() + 1
    }

    /// Full statement restricting `column` to the rendered placeholders.
    #[must_use]
    pub fn statement(&self, column: &Column, placeholders: &str) -> String {
        let base = self.select_base.trim_end();
        let mut sql = match self.filter.as_deref().map(str::trim) {
            Some(filter) if !filter.is_empty() => {
                format!("{base} WHERE ({filter}) AND {column} IN ({placeholders})")
            }
            _ => format!("{base} WHERE {column} IN ({placeholders})"),
        };

        if let Some(tail) = self.tail.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            sql.push(' ');
            sql.push_str(tail);
        }

        sql
    }

    /// Leading arguments followed by `keys`.
    fn bind(&self, keys: impl IntoIterator<Item = Value>) -> Vec<Value> {
        self.args.iter().cloned().chain(keys).collect()
    }
}

///
/// Loader
///
/// Query executor bundled with the loader settings.
///

#[derive(Clone, Debug)]
pub struct Loader<X> {
    executor: X,
    config: LoaderConfig,
}

impl<X: QueryExecutor> Loader<X> {
    #[must_use]
    pub const fn new(executor: X, config: LoaderConfig) -> Self {
        Self { executor, config }
    }

    #[must_use]
    pub const fn executor(&self) -> &X {
        &self.executor
    }

    #[must_use]
    pub const fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load the parents referenced by `children` and link each child to its
    /// parent.
    ///
    /// Foreign keys are deduplicated in first-occurrence order and fetched
    /// in one statement against the configured primary-key column. Returns
    /// the fetched parents, ordered as the executor returned them. An empty
    /// key set performs no fetch and links nothing. An invalid primary-key
    /// column fails before anything is fetched.
    pub fn belongs_to<C, P>(
        &self,
        ctx: &QueryContext,
        children: &Collection<C>,
        query: &RelationQuery,
        mut foreign_key: impl FnMut(&C) -> P::Id,
        assign: impl FnMut(&C, &P),
    ) -> Result<Collection<P>, RelationError<X::Error>>
    where
        C: Identifiable,
        P: Identifiable + Scan,
        P::Id: Into<Value> + Debug,
    {
        self.config.primary_key_column.validate()?;

        let keys = children.unique_to_vec(&mut foreign_key);
        if keys.is_empty() {
            debug!(entity = type_name::<P>(), "belongs-to load skipped, no foreign keys");
            return Ok(Collection::new_ordered());
        }

        let placeholders = self.placeholders(keys.len(), query.next_position());
        let statement = query.statement(&self.config.primary_key_column, &placeholders);
        debug!(entity = type_name::<P>(), keys = ?keys, %statement, "belongs-to load");

        let args = query.bind(keys.iter().cloned().map(Into::into));
        let parents = self.fetch::<P>(ctx, RelationKind::BelongsTo, &statement, &args, keys.len())?;

        let summary = link_belongs_to(
            children,
            &parents,
            foreign_key,
            assign,
            self.config.missing_parent,
        )?;
        debug!(
            linked = summary.linked,
            unmatched = summary.unmatched,
            "belongs-to linked"
        );

        Ok(parents)
    }

    /// Load the children of `parents` and attach to each parent the
    /// sub-collection whose `fk_column` equals its identifier.
    ///
    /// Parent identifiers are bound in parent iteration order. Every parent
    /// receives a collection, possibly empty. Returns all fetched children.
    /// An invalid `fk_column` fails before anything is fetched.
    pub fn has_many<P, C>(
        &self,
        ctx: &QueryContext,
        parents: &Collection<P>,
        query: &RelationQuery,
        fk_column: &Column,
        foreign_key: impl FnMut(&C) -> P::Id,
        assign: impl FnMut(&P, Collection<C>) -> Result<(), LinkError>,
    ) -> Result<Collection<C>, RelationError<X::Error>>
    where
        P: Identifiable,
        P::Id: Into<Value>,
        C: Identifiable + Scan + Clone,
    {
        fk_column.validate()?;

        let keys = parents.ids_as_values();
        if keys.is_empty() {
            debug!(entity = type_name::<C>(), "has-many load skipped, no parents");
            return Ok(Collection::new_ordered());
        }

        let placeholders = self.placeholders(keys.len(), query.next_position());
        let statement = query.statement(fk_column, &placeholders);
        debug!(entity = type_name::<C>(), keys = ?keys, %statement, "has-many load");

        let key_count = keys.len();
        let args = query.bind(keys);
        let children = self.fetch::<C>(ctx, RelationKind::HasMany, &statement, &args, key_count)?;

        let summary = link_has_many(parents, &children, foreign_key, assign)?;
        debug!(
            linked = summary.linked,
            unmatched = summary.unmatched,
            "has-many linked"
        );

        Ok(children)
    }

    fn placeholders(&self, count: usize, start: usize) -> String {
        match self.config.dialect {
            Some(dialect) => dialect.placeholders(count, start),
            None => self.executor.placeholders(count, start),
        }
    }

    fn fetch<T>(
        &self,
        ctx: &QueryContext,
        kind: RelationKind,
        statement: &str,
        args: &[Value],
        keys: usize,
    ) -> Result<Collection<T>, RelationError<X::Error>>
    where
        T: Identifiable + Scan,
    {
        let entity_path = type_name::<T>();
        let mut span = Span::new(kind, entity_path);
        span.set_keys(keys);

        match self.executor.query_collection::<T>(ctx, statement, args) {
            Ok(fetched) => {
                span.set_rows(fetched.len());
                Ok(fetched)
            }
            Err(err) => {
                record(MetricsEvent::FetchFailed { kind, entity_path });
                Err(err.into())
            }
        }
    }
}

/// Belongs-to load with the default loader settings.
///
/// See [`Loader::belongs_to`].
pub fn load_belongs_to<X, C, P>(
    ctx: &QueryContext,
    executor: &X,
    children: &Collection<C>,
    query: &RelationQuery,
    foreign_key: impl FnMut(&C) -> P::Id,
    assign: impl FnMut(&C, &P),
) -> Result<Collection<P>, RelationError<X::Error>>
where
    X: QueryExecutor + ?Sized,
    C: Identifiable,
    P: Identifiable + Scan,
    P::Id: Into<Value> + Debug,
{
    Loader::new(executor, LoaderConfig::default()).belongs_to(ctx, children, query, foreign_key, assign)
}

/// Has-many load with the default loader settings.
///
/// See [`Loader::has_many`].
pub fn load_has_many<X, P, C>(
    ctx: &QueryContext,
    executor: &X,
    parents: &Collection<P>,
    query: &RelationQuery,
    fk_column: &Column,
    foreign_key: impl FnMut(&C) -> P::Id,
    assign: impl FnMut(&P, Collection<C>) -> Result<(), LinkError>,
) -> Result<Collection<C>, RelationError<X::Error>>
where
    X: QueryExecutor + ?Sized,
    P: Identifiable,
    P::Id: Into<Value>,
    C: Identifiable + Scan + Clone,
{
    Loader::new(executor, LoaderConfig::default()).has_many(
        ctx,
        parents,
        query,
        fk_column,
        foreign_key,
        assign,
    )
}
