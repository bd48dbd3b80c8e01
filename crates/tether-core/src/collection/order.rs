use std::cmp::Ordering;

///
/// Order
///
/// Optional explicit iteration order over the keys of a keyed container.
/// `Ordered` holds every key of the container exactly once; `Unordered`
/// means iteration follows the map and must not be relied upon.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Order<K> {
    #[default]
    Unordered,
    Ordered(Vec<K>),
}

impl<K> Order<K> {
    /// An ordered sequence with no keys yet.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Ordered(Vec::new())
    }

    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        matches!(self, Self::Ordered(_))
    }

    /// Borrow the sequence if one has been established.
    #[must_use]
    pub fn as_slice(&self) -> Option<&[K]> {
        match self {
            Self::Ordered(keys) => Some(keys),
            Self::Unordered => None,
        }
    }

    /// Append a key that is known to be new to the container.
    /// No-op when unordered.
    pub(crate) fn push_new(&mut self, key: K) {
        if let Self::Ordered(keys) = self {
            keys.push(key);
        }
    }

    /// Drop `key` from the sequence. No-op when unordered.
    pub(crate) fn remove(&mut self, key: &K)
    where
        K: PartialEq,
    {
        if let Self::Ordered(keys) = self {
            keys.retain(|candidate| candidate != key);
        }
    }

    /// Stable-sort the sequence, establishing it from `establish` first if
    /// the container was unordered.
    pub(crate) fn sort_by<F>(&mut self, establish: impl FnOnce() -> Vec<K>, compare: F)
    where
        F: FnMut(&K, &K) -> Ordering,
    {
        match self {
            Self::Ordered(keys) => keys.sort_by(compare),
            Self::Unordered => {
                let mut keys = establish();
                keys.sort_by(compare);
                *self = Self::Ordered(keys);
            }
        }
    }
}
