//! Order-aware projections and rebuilds over a [`Collection`].
//!
//! None of these mutate the source. Unless a method says otherwise, an
//! ordered source is walked along its order sequence and an unordered one
//! in map order.

use super::Collection;
use crate::identity::Identifiable;
use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

impl<P: Identifiable> Collection<P> {
    /// One output per entity, no skipping: `[f(p) for p in self]`.
    ///
    /// The result length always equals `self.len()`.
    pub fn map_to_vec<V>(&self, f: impl FnMut(&P) -> V) -> Vec<V> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.iter().map(f));

        out
    }

    /// One key/value pair per entity: `{k: v for p in self}`.
    ///
    /// Duplicate keys overwrite: the later-visited entity wins. "Later" is
    /// only well defined for an ordered source; for an unordered one the
    /// surviving value is unspecified.
    pub fn map_to_map<K, V>(&self, mut f: impl FnMut(&P) -> (K, V)) -> HashMap<K, V>
    where
        K: Eq + Hash,
    {
        let mut out = HashMap::with_capacity(self.len());
        for item in self {
            let (key, value) = f(item);
            out.insert(key, value);
        }

        out
    }

    /// Conditional projection: `None` skips the entity.
    pub fn filter_map_to_vec<V>(&self, f: impl FnMut(&P) -> Option<V>) -> Vec<V> {
        self.iter().filter_map(f).collect()
    }

    /// Conditional key/value projection: `None` skips the entity.
    ///
    /// Each pair is an owned value produced for that entity alone; nothing
    /// yielded here can alias storage reused by a later iteration.
    /// Duplicate keys overwrite as in [`Collection::map_to_map`].
    pub fn filter_map_to_map<K, V>(&self, f: impl FnMut(&P) -> Option<(K, V)>) -> HashMap<K, V>
    where
        K: Eq + Hash,
    {
        self.iter().filter_map(f).collect()
    }

    /// Project every entity and keep the first occurrence of each value.
    pub fn unique_to_vec<V>(&self, project: impl FnMut(&P) -> V) -> Vec<V>
    where
        V: Clone + Eq + Hash,
    {
        self.unique_to_vec_skipping(project, |_| false)
    }

    /// Like [`Collection::unique_to_vec`], discarding values matched by
    /// `skip` before the uniqueness check.
    pub fn unique_to_vec_skipping<V>(
        &self,
        mut project: impl FnMut(&P) -> V,
        mut skip: impl FnMut(&V) -> bool,
    ) -> Vec<V>
    where
        V: Clone + Eq + Hash,
    {
        let mut seen = HashSet::with_capacity(self.len());
        let mut out = Vec::new();
        for item in self {
            let value = project(item);
            if skip(&value) || !seen.insert(value.clone()) {
                continue;
            }
            out.push(value);
        }

        out
    }

    /// Build a new ordered collection by transforming every entity of `src`.
    ///
    /// Walks the source order sequence (map order if the source has none).
    /// Colliding identifiers keep the first transformed entity. An absent
    /// source yields an absent result.
    pub fn build_ordered_from<S: Identifiable>(
        src: Option<&Collection<S>>,
        transform: impl FnMut(&S) -> P,
    ) -> Option<Self> {
        Self::build_ordered_from_filtered(src, transform, |_| false)
    }

    /// [`Collection::build_ordered_from`] that drops transformed entities
    /// matched by `skip`.
    pub fn build_ordered_from_filtered<S: Identifiable>(
        src: Option<&Collection<S>>,
        mut transform: impl FnMut(&S) -> P,
        mut skip: impl FnMut(&P) -> bool,
    ) -> Option<Self> {
        let src = src?;
        let mut built = Self::new_ordered();
        for item in src {
            let next = transform(item);
            if !skip(&next) {
                built.add_if_new(next);
            }
        }

        Some(built)
    }

    /// Build a new unordered collection by transforming every entity of
    /// `src` in map order. Colliding identifiers keep whichever transformed
    /// entity is visited first. An absent source yields an absent result.
    pub fn build_unordered_from<S: Identifiable>(
        src: Option<&Collection<S>>,
        transform: impl FnMut(&S) -> P,
    ) -> Option<Self> {
        Self::build_unordered_from_filtered(src, transform, |_| false)
    }

    /// [`Collection::build_unordered_from`] that drops transformed entities
    /// matched by `skip`.
    pub fn build_unordered_from_filtered<S: Identifiable>(
        src: Option<&Collection<S>>,
        mut transform: impl FnMut(&S) -> P,
        mut skip: impl FnMut(&P) -> bool,
    ) -> Option<Self> {
        let src = src?;
        let mut built = Self::new_unordered();
        src.for_each_unordered(|item| {
            let next = transform(item);
            if !skip(&next) {
                built.add_if_new(next);
            }
        });

        Some(built)
    }
}
