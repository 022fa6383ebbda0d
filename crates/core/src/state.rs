//! Replace-whole-value state holders.
//!
//! Readers get an `Arc` snapshot that never changes underneath them; writers
//! swap in a new snapshot. Nothing is mutated in place.

use std::sync::{Arc, PoisonError, RwLock};

use crate::reorder::{merge_order, Ordered};

/// A single shared value that is only ever replaced as a whole.
#[derive(Debug)]
pub struct StateCell<T> {
    current: RwLock<Arc<T>>,
}

impl<T> StateCell<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn get(&self) -> Arc<T> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swap in `value` and return the new snapshot.
    pub fn replace(&self, value: T) -> Arc<T> {
        let next = Arc::new(value);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&next);
        next
    }

    /// Derive the next value from the current one under the write lock.
    ///
    /// `f` returns the replacement plus a result for the caller; returning
    /// `None` leaves the current snapshot in place.
    pub fn update<R>(&self, f: impl FnOnce(&T) -> (Option<T>, R)) -> (Arc<T>, R) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let (next, result) = f(&**guard);
        if let Some(next) = next {
            *guard = Arc::new(next);
        }
        (Arc::clone(&guard), result)
    }
}

impl<T: Default> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Ordered collection snapshot.
pub type ListSnapshot<T> = Arc<Vec<Arc<T>>>;

/// The locally held ordered collection of a list view.
#[derive(Debug)]
pub struct ListStore<T> {
    cell: StateCell<Vec<Arc<T>>>,
}

impl<T: Ordered> ListStore<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            cell: StateCell::new(items.into_iter().map(Arc::new).collect()),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ListSnapshot<T> {
        self.cell.get()
    }

    /// Replace the whole collection, e.g. after a fresh fetch.
    pub fn replace(&self, items: Vec<T>) -> ListSnapshot<T> {
        self.cell.replace(items.into_iter().map(Arc::new).collect())
    }

    /// Merge a reordered subset into the current collection.
    ///
    /// Runs under the write lock so two local edits cannot overwrite each other.
    pub fn apply_reorder(&self, reordered: &[T]) -> ListSnapshot<T> {
        let (snapshot, ()) = self
            .cell
            .update(|current| (Some(merge_order(current, reordered)), ()));
        snapshot
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl<T: Ordered> Default for ListStore<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
