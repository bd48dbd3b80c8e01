
use crate::{
    collection::{Collection, Order},
    identity::Identifiable,
};
use serde::{Serialize, Serializer, ser::SerializeStruct};
use std::{cmp::Ordering, collections::HashMap, fmt, hash::Hash};

///
/// CollectionGroup
///
/// Partition of entities into sub-collections keyed by an arbitrary
/// grouping key, with an optional display order over the keys themselves.
///
/// The group owns its sub-collections; the entities inside them are shared
/// handles. When a key order exists it holds every key of the map exactly
/// once.
///

pub struct CollectionGroup<P: Identifiable, K> {
    collections: HashMap<K, Collection<P>>,
    order: Order<K>,
}

impl<P, K> CollectionGroup<P, K>
where
    P: Identifiable,
    K: Clone + Eq + Hash,
{
    /// Create an empty, unordered group.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: HashMap::new(),
            order: Order::Unordered,
        }
    }

    /// Partition `src` by `key_fn` in a single pass.
    ///
    /// Sub-collections inherit the source mode; an ordered source appends
    /// entities to each sub-collection in source order. The group itself
    /// starts unordered; call [`CollectionGroup::sort_keys_by`] for a key
    /// order.
    pub fn group_by(src: &Collection<P>, mut key_fn: impl FnMut(&P) -> K) -> Self
    where
        P: Clone,
    {
        let mut group = Self::new();
        for item in src {
            let key = key_fn(item);
            group
                .collections
                .entry(key)
                .or_insert_with(|| src.empty_like())
                .add_if_new(item.clone());
        }

        group
    }

    /// Number of sub-collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.order.is_ordered()
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&Collection<P>> {
        self.collections.get(key)
    }

    #[must_use]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut Collection<P>> {
        self.collections.get_mut(key)
    }

    /// Install `coll` under `key`, returning the sub-collection it replaced.
    /// A new key is appended to the key order, if one exists.
    pub fn set(&mut self, key: K, coll: Collection<P>) -> Option<Collection<P>> {
        let replaced = self.collections.insert(key.clone(), coll);
        if replaced.is_none() {
            self.order.push_new(key);
        }

        replaced
    }

    /// Detach and return the sub-collection under `key`, dropping the key
    /// from the key order as well.
    pub fn remove(&mut self, key: &K) -> Option<Collection<P>> {
        let removed = self.collections.remove(key)?;
        self.order.remove(key);

        Some(removed)
    }

    /// Establish or replace the display order of the keys (stable).
    pub fn sort_keys_by(&mut self, compare: impl FnMut(&K, &K) -> Ordering) {
        let collections = &self.collections;
        self.order
            .sort_by(|| collections.keys().cloned().collect(), compare);
    }

    /// Establish or replace the key order by a derived sort key (stable).
    pub fn sort_keys_by_key<S: Ord>(&mut self, mut sort_key: impl FnMut(&K) -> S) {
        self.sort_keys_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    }

    /// Establish or replace the key order using the keys' natural order.
    pub fn sort_keys(&mut self)
    where
        K: Ord,
    {
        self.sort_keys_by(Ord::cmp);
    }

    /// Fresh copy of the keys, in key order if set.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        match self.order.as_slice() {
            Some(order) => order.to_vec(),
            None => self.collections.keys().cloned().collect(),
        }
    }

    /// Sub-collections, in key order if set.
    #[must_use]
    pub fn collections(&self) -> Vec<&Collection<P>> {
        self.entries().into_iter().map(|(_, coll)| coll).collect()
    }

    /// `(key, sub-collection)` pairs, in key order if set.
    #[must_use]
    pub fn entries(&self) -> Vec<(&K, &Collection<P>)> {
        match self.order.as_slice() {
            Some(order) => order
                .iter()
                .filter_map(|key| self.collections.get_key_value(key))
                .collect(),
            None => self.collections.iter().collect(),
        }
    }

    /// Borrow the underlying key → sub-collection map.
    #[must_use]
    pub const fn collections_map(&self) -> &HashMap<K, Collection<P>> {
        &self.collections
    }
}

impl<P, K> Default for CollectionGroup<P, K>
where
    P: Identifiable,
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P, K> fmt::Debug for CollectionGroup<P, K>
where
    P: Identifiable + fmt::Debug,
    K: Clone + Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

/// An unordered group serializes as its key → collection map; an ordered
/// one as `{ "order": [...], "map": {...} }`.
impl<P, K> Serialize for CollectionGroup<P, K>
where
    P: Identifiable + Serialize,
    K: Clone + Eq + Hash + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.order.as_slice() {
            None => serializer.collect_map(&self.collections),
            Some(order) => {
                let mut state = serializer.serialize_struct("CollectionGroup", 2)?;
                state.serialize_field("order", order)?;
                state.serialize_field("map", &self.collections)?;
                state.end()
            }
        }
    }
}
