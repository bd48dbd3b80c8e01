use crate::{collection::Collection, error::LinkError, identity::Identifiable};
use serde::{Serialize, Serializer};
use std::{
    cell::{Cell, Ref, RefCell},
    fmt,
    rc::{self, Rc},
    sync::{self, Arc},
};

///
/// SharedHandle
///
/// A shared entity handle that can be held without keeping the entity
/// alive. `Rc` and `Arc` downgrade to their weak counterparts; a plain
/// reference is its own non-owning form.
///

pub trait SharedHandle: Clone {
    type Weak: Clone;

    fn downgrade(&self) -> Self::Weak;

    fn upgrade(weak: &Self::Weak) -> Option<Self>;
}

impl<T: ?Sized> SharedHandle for Rc<T> {
    type Weak = rc::Weak<T>;

    fn downgrade(&self) -> Self::Weak {
        Rc::downgrade(self)
    }

    fn upgrade(weak: &Self::Weak) -> Option<Self> {
        weak.upgrade()
    }
}

impl<T: ?Sized> SharedHandle for Arc<T> {
    type Weak = sync::Weak<T>;

    fn downgrade(&self) -> Self::Weak {
        Arc::downgrade(self)
    }

    fn upgrade(weak: &Self::Weak) -> Option<Self> {
        weak.upgrade()
    }
}

impl<T: ?Sized> SharedHandle for &T {
    type Weak = Self;

    fn downgrade(&self) -> Self::Weak {
        *self
    }

    fn upgrade(weak: &Self::Weak) -> Option<Self> {
        Some(*weak)
    }
}

///
/// BelongsTo
///
/// Child-side reference slot holding at most one parent.
///
/// The parent is held weakly, so a child never keeps its parent alive and a
/// graph linked in both directions (child to parent, parent to children)
/// forms no ownership cycle. Whoever holds the parent collection returned
/// by a load owns the parents.
///

pub struct BelongsTo<P: SharedHandle> {
    target: RefCell<Option<P::Weak>>,
}

impl<P: SharedHandle> BelongsTo<P> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            target: RefCell::new(None),
        }
    }

    /// Point the slot at `parent`, replacing any earlier link.
    pub fn set(&self, parent: &P) {
        self.target.replace(Some(parent.downgrade()));
    }

    pub fn clear(&self) {
        self.target.replace(None);
    }

    /// `true` while the slot points at a parent that is still alive.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.get().is_some()
    }

    /// Upgraded handle to the linked parent; `None` when never linked or
    /// when the parent has been dropped.
    #[must_use]
    pub fn get(&self) -> Option<P> {
        self.target.borrow().as_ref().and_then(P::upgrade)
    }
}

impl<P: SharedHandle> Default for BelongsTo<P> {
    fn default() -> Self {
        Self::new()
    }
}

// link state only; the parent is never followed
impl<P: SharedHandle> fmt::Debug for BelongsTo<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BelongsTo")
            .field("linked", &self.is_linked())
            .finish()
    }
}

/// Serializes as the parent identifier (or null), never the parent itself.
impl<P> Serialize for BelongsTo<P>
where
    P: SharedHandle + Identifiable,
    P::Id: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get().map(|parent| parent.id()).serialize(serializer)
    }
}

///
/// HasMany
///
/// Parent-side slot holding the sub-collection of linked children.
/// Reads as an empty collection until linked, so iteration never needs an
/// absence check.
///

pub struct HasMany<C: Identifiable> {
    children: RefCell<Collection<C>>,
    linked: Cell<bool>,
}

impl<C: Identifiable> HasMany<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            children: RefCell::new(Collection::new_ordered()),
            linked: Cell::new(false),
        }
    }

    /// Replace the linked children.
    ///
    /// Fails with [`LinkError::SlotBorrowed`] while a guard from
    /// [`HasMany::borrow`] is still alive; the slot is left untouched.
    pub fn set(&self, children: Collection<C>) -> Result<(), LinkError> {
        let mut slot = self
            .children
            .try_borrow_mut()
            .map_err(|_| LinkError::SlotBorrowed)?;
        *slot = children;
        self.linked.set(true);

        Ok(())
    }

    /// `true` once a link has been written, even an empty one.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.linked.get()
    }

    /// Borrow the linked children.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, Collection<C>> {
        self.children.borrow()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.borrow().is_empty()
    }

    /// Snapshot of the linked child handles, in order.
    #[must_use]
    pub fn items(&self) -> Vec<C>
    where
        C: Clone,
    {
        self.children.borrow().items()
    }
}

impl<C: Identifiable> Default for HasMany<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for HasMany<C>
where
    C: Identifiable + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasMany")
            .field("linked", &self.linked.get())
            .field("children", &*self.children.borrow())
            .finish()
    }
}

impl<C> Serialize for HasMany<C>
where
    C: Identifiable + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.children.borrow().serialize(serializer)
    }
}
