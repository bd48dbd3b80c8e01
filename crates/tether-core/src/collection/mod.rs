mod order;
mod project;


use crate::{error::CollectionError, identity::Identifiable};
use serde::{Serialize, Serializer};
use std::{
    cmp::Ordering,
    collections::{HashMap, hash_map},
    fmt, slice,
};

// re-exports
pub use order::Order;

///
/// Collection
///
/// Identity-keyed container of shared entity handles.
///
/// Uniqueness is enforced by identifier: one handle per `P::Id`. An optional
/// order sequence records explicit iteration order. When present, every key
/// of the map appears in it exactly once, and every iterating, projecting or
/// rebuilding operation walks it. When absent, iteration follows the map and
/// is unspecified.
///
/// Filtered or rebuilt collections are independent values; they never share
/// the source's map or order sequence, only the entity handles.
///
/// No internal synchronization. A collection shared across threads needs an
/// external guard around the whole value.
///

pub struct Collection<P: Identifiable> {
    items: HashMap<P::Id, P>,
    order: Order<P::Id>,
}

impl<P: Identifiable> Collection<P> {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create an empty collection that tracks insertion order.
    #[must_use]
    pub fn new_ordered() -> Self {
        Self {
            items: HashMap::new(),
            order: Order::empty(),
        }
    }

    /// Create an empty collection with no order sequence.
    #[must_use]
    pub fn new_unordered() -> Self {
        Self {
            items: HashMap::new(),
            order: Order::Unordered,
        }
    }

    /// Build an ordered collection from a batch, keeping input order.
    ///
    /// A repeated identifier keeps its first position and its last handle,
    /// exactly as repeated [`Collection::add`] calls would.
    #[must_use]
    pub fn from_ordered(items: impl IntoIterator<Item = P>) -> Self {
        let mut coll = Self::new_ordered();
        coll.extend(items);

        coll
    }

    /// Build an unordered collection from a batch.
    #[must_use]
    pub fn from_unordered(items: impl IntoIterator<Item = P>) -> Self {
        let mut coll = Self::new_unordered();
        coll.extend(items);

        coll
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Number of distinct identifiers held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.order.is_ordered()
    }

    /// Borrow the order sequence, if one has been established.
    #[must_use]
    pub fn order(&self) -> Option<&[P::Id]> {
        self.order.as_slice()
    }

    #[must_use]
    pub fn has(&self, id: &P::Id) -> bool {
        self.items.contains_key(id)
    }

    /// Look up an entity by identifier.
    #[must_use]
    pub fn find(&self, id: &P::Id) -> Option<&P> {
        self.items.get(id)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Insert `item`, replacing any entity with the same identifier.
    ///
    /// A new identifier is appended to the order sequence (if ordered).
    /// A replaced identifier keeps its position. Returns the replaced handle.
    pub fn add(&mut self, item: P) -> Option<P> {
        let id = item.id();
        match self.items.entry(id) {
            hash_map::Entry::Occupied(mut slot) => Some(slot.insert(item)),
            hash_map::Entry::Vacant(slot) => {
                self.order.push_new(slot.key().clone());
                slot.insert(item);
                None
            }
        }
    }

    /// Insert `item` only if its identifier is not present yet.
    /// First write wins. Returns `true` when the item was inserted.
    pub fn add_if_new(&mut self, item: P) -> bool {
        let id = item.id();
        match self.items.entry(id) {
            hash_map::Entry::Occupied(_) => false,
            hash_map::Entry::Vacant(slot) => {
                self.order.push_new(slot.key().clone());
                slot.insert(item);
                true
            }
        }
    }

    /// Drop the order sequence; the collection becomes unordered.
    pub fn remove_order(&mut self) {
        self.order = Order::Unordered;
    }

    /// Stable sort of the order sequence.
    ///
    /// An unordered collection is promoted: its order sequence is created
    /// from the current map iteration and then sorted. Ties keep their prior
    /// relative position.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&P, &P) -> Ordering,
    {
        let items = &self.items;
        self.order.sort_by(
            || items.keys().cloned().collect(),
            |a, b| match (items.get(a), items.get(b)) {
                (Some(a), Some(b)) => compare(a, b),
                _ => Ordering::Equal,
            },
        );
    }

    /// Stable sort by a key extracted from each entity.
    pub fn sort_by_key<K, F>(&mut self, mut key: F)
    where
        K: Ord,
        F: FnMut(&P) -> K,
    {
        self.sort_by(|a, b| key(a).cmp(&key(b)));
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Fresh copy of the identifiers, in order if ordered.
    #[must_use]
    pub fn ids(&self) -> Vec<P::Id> {
        match self.order.as_slice() {
            Some(order) => order.to_vec(),
            None => self.items.keys().cloned().collect(),
        }
    }

    /// Fresh copy of the entity handles, in order if ordered.
    #[must_use]
    pub fn items(&self) -> Vec<P>
    where
        P: Clone,
    {
        self.iter().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// Borrowing iterator; walks the order sequence if ordered.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, P> {
        let inner = match self.order.as_slice() {
            Some(order) => IterInner::Ordered {
                ids: order.iter(),
                items: &self.items,
            },
            None => IterInner::Unordered(self.items.values()),
        };

        Iter { inner }
    }

    /// Visit every entity once, in order if ordered.
    pub fn for_each(&self, f: impl FnMut(&P)) {
        self.iter().for_each(f);
    }

    /// Visit every entity once in map order, ignoring any order sequence.
    pub fn for_each_unordered(&self, f: impl FnMut(&P)) {
        self.items.values().for_each(f);
    }

    /// Visit every entity once in order.
    ///
    /// Fails when no order sequence has ever been established, which
    /// separates "meant to be unordered" from "expected an order that was
    /// never set". An empty ordered collection succeeds.
    pub fn for_each_ordered(&self, f: impl FnMut(&P)) -> Result<(), CollectionError> {
        if !self.order.is_ordered() {
            return Err(CollectionError::Unordered);
        }
        self.iter().for_each(f);

        Ok(())
    }

    /// New collection holding the entities matching `predicate`.
    ///
    /// Keeps the source mode; an ordered source keeps the relative order of
    /// the retained entities.
    #[must_use]
    pub fn filter(&self, mut predicate: impl FnMut(&P) -> bool) -> Self
    where
        P: Clone,
    {
        let mut filtered = self.empty_like();
        for item in self.iter().filter(|item| predicate(*item)) {
            filtered.add(item.clone());
        }

        filtered
    }

    /// Empty collection in the same ordered/unordered mode as `self`.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        if self.is_ordered() {
            Self::new_ordered()
        } else {
            Self::new_unordered()
        }
    }
}

impl<P: Identifiable> Default for Collection<P> {
    fn default() -> Self {
        Self::new_unordered()
    }
}

impl<P> Clone for Collection<P>
where
    P: Identifiable + Clone,
{
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            order: self.order.clone(),
        }
    }
}

impl<P> fmt::Debug for Collection<P>
where
    P: Identifiable + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("ordered", &self.is_ordered())
            .field("items", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl<P: Identifiable> Extend<P> for Collection<P> {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        for item in iter {
            self.add(item);
        }
    }
}

impl<'a, P: Identifiable> IntoIterator for &'a Collection<P> {
    type Item = &'a P;
    type IntoIter = Iter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Serializes as the sequence of items, in order if ordered.
impl<P> Serialize for Collection<P>
where
    P: Identifiable + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

///
/// Iter
///
/// Borrowing iterator over a [`Collection`].
///

pub struct Iter<'a, P: Identifiable> {
    inner: IterInner<'a, P>,
}

enum IterInner<'a, P: Identifiable> {
    Ordered {
        ids: slice::Iter<'a, P::Id>,
        items: &'a HashMap<P::Id, P>,
    },
    Unordered(hash_map::Values<'a, P::Id, P>),
}

impl<'a, P: Identifiable> Iterator for Iter<'a, P> {
    type Item = &'a P;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IterInner::Ordered { ids, items } => {
                let items: &'a HashMap<P::Id, P> = *items;
                ids.find_map(|id| items.get(id))
            }
            IterInner::Unordered(values) => values.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            IterInner::Ordered { ids, .. } => (0, ids.size_hint().1),
            IterInner::Unordered(values) => values.size_hint(),
        }
    }
}
