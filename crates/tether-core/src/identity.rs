use std::{collections::HashMap, hash::Hash, rc::Rc, sync::Arc};

///
/// Identifiable
///
/// Capability every entity exposes: a stable, comparable, hashable identifier.
///
/// Collections never own entities by value. They hold shared handles
/// (`Rc<T>`, `Arc<T>` or `&T`), which forward this trait to the entity, so a
/// mutation through one alias is visible through every collection holding it.
///

pub trait Identifiable {
    type Id: Clone + Eq + Hash;

    fn id(&self) -> Self::Id;
}

impl<T: Identifiable + ?Sized> Identifiable for Rc<T> {
    type Id = T::Id;

    fn id(&self) -> Self::Id {
        (**self).id()
    }
}

impl<T: Identifiable + ?Sized> Identifiable for Arc<T> {
    type Id = T::Id;

    fn id(&self) -> Self::Id {
        (**self).id()
    }
}

impl<T: Identifiable + ?Sized> Identifiable for &T {
    type Id = T::Id;

    fn id(&self) -> Self::Id {
        (**self).id()
    }
}

/// Index a slice of handles by identifier; later duplicates overwrite earlier ones.
#[must_use]
pub fn ids_to_map<P>(items: &[P]) -> HashMap<P::Id, P>
where
    P: Identifiable + Clone,
{
    let mut map = HashMap::with_capacity(items.len());
    for item in items {
        map.insert(item.id(), item.clone());
    }

    map
}

///
/// TESTS
///
