use super::MissingParentPolicy;
use crate::{
    collection::Collection,
    error::LinkError,
    group::CollectionGroup,
    identity::Identifiable,
    obs::{MetricsEvent, RelationKind, record},
};
use std::{any::type_name, fmt::Debug};

///
/// LinkSummary
///
/// Outcome of one link pass.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LinkSummary {
    /// Children attached to a parent.
    pub linked: usize,
    /// Children whose foreign key matched no parent.
    pub unmatched: usize,
}

/// Link every child to the parent whose identifier equals its foreign key.
///
/// `assign` receives each matched child with its parent handle and is
/// expected to write the child's reference slot. Children whose foreign key
/// matches no parent are handled per `policy`: `Ignore` leaves them unset,
/// `Reject` fails before any slot is written.
pub fn link_belongs_to<C, P>(
    children: &Collection<C>,
    parents: &Collection<P>,
    mut foreign_key: impl FnMut(&C) -> P::Id,
    mut assign: impl FnMut(&C, &P),
    policy: MissingParentPolicy,
) -> Result<LinkSummary, LinkError>
where
    C: Identifiable,
    P: Identifiable,
    P::Id: Debug,
{
    let mut matched = Vec::with_capacity(children.len());
    let mut first_missing = None;
    let mut unmatched = 0;

    for child in children {
        let key = foreign_key(child);
        match parents.find(&key) {
            Some(parent) => matched.push((child, parent)),
            None => {
                unmatched += 1;
                if first_missing.is_none() {
                    first_missing = Some(format!("{key:?}"));
                }
            }
        }
    }

    if unmatched > 0 {
        record(MetricsEvent::LinkGap {
            kind: RelationKind::BelongsTo,
            entity_path: type_name::<C>(),
            unmatched: count(unmatched),
        });

        if policy == MissingParentPolicy::Reject {
            return Err(LinkError::MissingParent {
                missing: unmatched,
                first: first_missing.unwrap_or_default(),
            });
        }
    }

    for &(child, parent) in &matched {
        assign(child, parent);
    }
    record(MetricsEvent::Link {
        kind: RelationKind::BelongsTo,
        entity_path: type_name::<C>(),
        linked: count(matched.len()),
    });

    Ok(LinkSummary {
        linked: matched.len(),
        unmatched,
    })
}

/// Attach to every parent the sub-collection of children whose foreign key
/// equals the parent identifier.
///
/// Sub-collections keep the relative order of `children` and inherit its
/// mode. A parent with no matching child receives an empty collection,
/// never nothing.
///
/// `assign` writes the parent's slot and may refuse (for example a slot
/// that is still borrowed); the first refusal stops linking and is
/// returned.
pub fn link_has_many<P, C>(
    parents: &Collection<P>,
    children: &Collection<C>,
    foreign_key: impl FnMut(&C) -> P::Id,
    mut assign: impl FnMut(&P, Collection<C>) -> Result<(), LinkError>,
) -> Result<LinkSummary, LinkError>
where
    P: Identifiable,
    C: Identifiable + Clone,
{
    let mut buckets = CollectionGroup::group_by(children, foreign_key);
    let mut linked = 0;

    for parent in parents {
        let own = buckets
            .remove(&parent.id())
            .unwrap_or_else(|| children.empty_like());
        linked += own.len();
        assign(parent, own)?;
    }

    // whatever was not claimed by a parent is orphaned
    let unmatched: usize = buckets.collections().iter().map(|c| c.len()).sum();
    if unmatched > 0 {
        record(MetricsEvent::LinkGap {
            kind: RelationKind::HasMany,
            entity_path: type_name::<C>(),
            unmatched: count(unmatched),
        });
    }
    record(MetricsEvent::Link {
        kind: RelationKind::HasMany,
        entity_path: type_name::<C>(),
        linked: count(linked),
    });

    Ok(LinkSummary { linked, unmatched })
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}
