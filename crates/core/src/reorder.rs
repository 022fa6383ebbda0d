//! Merge of a user-reordered subset into the full ordered collection.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use crate::model::{ClientFlags, Course, CourseId, Module, ModuleId};

/// An item of a reorderable list.
pub trait Ordered: Clone {
    type Id: Copy + Eq + Hash;

    fn id(&self) -> Self::Id;

    fn sort_order(&self) -> Option<u32>;

    fn set_sort_order(&mut self, position: u32);

    /// Drop client-only state (drag flags, pending markers).
    fn clear_transient(&mut self);
}

/// `(id, position)` pair sent to the backend after a reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortEntry<Id> {
    pub id: Id,
    pub sort_order: u32,
}

/// 1-based position of every id in `reordered`, first occurrence wins.
#[must_use]
pub fn positions<T: Ordered>(reordered: &[T]) -> HashMap<T::Id, u32> {
    let mut next = HashMap::with_capacity(reordered.len());
    let mut position = 0_u32;
    for item in reordered {
        if !next.contains_key(&item.id()) {
            position = position.saturating_add(1);
            next.insert(item.id(), position);
        }
    }
    next
}

/// Sort entries for the persistence call that follows a reorder.
#[must_use]
pub fn sort_entries<T: Ordered>(reordered: &[T]) -> Vec<SortEntry<T::Id>> {
    let mut seen = HashSet::with_capacity(reordered.len());
    reordered
        .iter()
        .filter(|item| seen.insert(item.id()))
        .zip(1_u32..)
        .map(|(item, sort_order)| SortEntry {
            id: item.id(),
            sort_order,
        })
        .collect()
}

/// Merge `reordered` (a subset in its new order) into `previous`.
///
/// The result lists the subset first, positioned `1..=n`, followed by every
/// item of `previous` that is not part of the subset, unchanged and in its
/// original relative order. Items whose stored position already matches are
/// returned as the same `Arc`; moved items are shallow copies of their
/// previous record; items unknown to `previous` are inserted with their
/// transient client state cleared.
#[must_use]
pub fn merge_order<T: Ordered>(previous: &[Arc<T>], reordered: &[T]) -> Vec<Arc<T>> {
    let next = positions(reordered);
    let by_id: HashMap<T::Id, &Arc<T>> = previous.iter().map(|item| (item.id(), item)).collect();

    let mut emitted = HashSet::with_capacity(next.len());
    let mut merged = Vec::with_capacity(previous.len() + reordered.len());

    for item in reordered {
        let id = item.id();
        if !emitted.insert(id) {
            continue;
        }
        let Some(&position) = next.get(&id) else {
            continue;
        };

        let entry = match by_id.get(&id) {
            None => {
                let mut fresh = item.clone();
                fresh.clear_transient();
                fresh.set_sort_order(position);
                Arc::new(fresh)
            }
            Some(existing) if existing.sort_order() == Some(position) => Arc::clone(existing),
            Some(existing) => {
                let mut moved = T::clone(existing);
                moved.set_sort_order(position);
                Arc::new(moved)
            }
        };
        merged.push(entry);
    }

    merged.extend(
        previous
            .iter()
            .filter(|item| !next.contains_key(&item.id()))
            .cloned(),
    );
    merged
}

impl Ordered for Course {
    type Id = CourseId;

    fn id(&self) -> CourseId {
        self.id
    }

    fn sort_order(&self) -> Option<u32> {
        self.sort_order
    }

    fn set_sort_order(&mut self, position: u32) {
        self.sort_order = Some(position);
    }

    fn clear_transient(&mut self) {
        self.client = ClientFlags::default();
    }
}

impl Ordered for Module {
    type Id = ModuleId;

    fn id(&self) -> ModuleId {
        self.id
    }

    fn sort_order(&self) -> Option<u32> {
        self.sort_order
    }

    fn set_sort_order(&mut self, position: u32) {
        self.sort_order = Some(position);
    }

    fn clear_transient(&mut self) {
        self.client = ClientFlags::default();
    }
}
