//! Locally held course and module lists with optimistic reordering.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use course_core::model::{Course, Module};
use course_core::reorder::sort_entries;
use course_core::{ListSnapshot, ListStore, Ordered, SortEntry};
use storage::repository::{OrderingRepository, StorageError};
use tracing::debug;

use crate::dispatch::{Operation, PersistDispatcher};
use crate::error::OrderingError;
use crate::optimistic::Applied;

pub type PersistFuture = Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send>>;

/// A list item whose positions the backend can store.
pub trait PersistOrder: Ordered + Send + Sync + 'static {
    const OPERATION: Operation;

    fn persist(ordering: Arc<dyn OrderingRepository>, entries: Vec<SortEntry<Self::Id>>)
        -> PersistFuture;
}

impl PersistOrder for Course {
    const OPERATION: Operation = Operation::ReorderCourses;

    fn persist(
        ordering: Arc<dyn OrderingRepository>,
        entries: Vec<SortEntry<Self::Id>>,
    ) -> PersistFuture {
        Box::pin(async move { ordering.reorder_courses(&entries).await })
    }
}

impl PersistOrder for Module {
    const OPERATION: Operation = Operation::ReorderModules;

    fn persist(
        ordering: Arc<dyn OrderingRepository>,
        entries: Vec<SortEntry<Self::Id>>,
    ) -> PersistFuture {
        Box::pin(async move { ordering.reorder_modules(&entries).await })
    }
}

pub type CourseList = OrderedList<Course>;
pub type ModuleList = OrderedList<Module>;

/// Ordered collection shown by a list view.
///
/// A reorder is merged into the local collection first; the new positions are
/// then persisted without waiting.
pub struct OrderedList<T: PersistOrder> {
    store: ListStore<T>,
    ordering: Arc<dyn OrderingRepository>,
    dispatcher: PersistDispatcher,
}

impl<T: PersistOrder> OrderedList<T>
where
    T::Id: Display,
{
    #[must_use]
    pub fn new(
        items: Vec<T>,
        ordering: Arc<dyn OrderingRepository>,
        dispatcher: PersistDispatcher,
    ) -> Self {
        Self {
            store: ListStore::new(items),
            ordering,
            dispatcher,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ListSnapshot<T> {
        self.store.snapshot()
    }

    pub fn replace(&self, items: Vec<T>) -> ListSnapshot<T> {
        self.store.replace(items)
    }

    /// Merge `reordered` (a subset in its new order) and persist its positions.
    ///
    /// # Errors
    ///
    /// Returns `OrderingError::Dispatch` if the persistence call cannot be
    /// spawned; the local merge is kept.
    pub fn reorder(&self, reordered: &[T]) -> Result<Applied<Vec<Arc<T>>>, OrderingError> {
        let operation = T::OPERATION;
        let entries = sort_entries(reordered);
        let snapshot = self.store.apply_reorder(reordered);
        debug!(
            %operation,
            moved = entries.len(),
            total = snapshot.len(),
            "applied reorder locally"
        );

        let call = T::persist(Arc::clone(&self.ordering), entries);
        let dispatched = self.dispatcher.dispatch(operation, call)?;
        Ok(Applied {
            snapshot,
            dispatched,
        })
    }

    /// Reorder by id, looking the items up in the current collection.
    ///
    /// # Errors
    ///
    /// Returns `OrderingError::UnknownItem` if an id is not in the list; nothing
    /// changes then.
    pub fn reorder_ids(&self, ids: &[T::Id]) -> Result<Applied<Vec<Arc<T>>>, OrderingError> {
        let current = self.store.snapshot();
        let reordered = ids
            .iter()
            .map(|id| {
                current
                    .iter()
                    .find(|item| item.id() == *id)
                    .map(|item| T::clone(item))
                    .ok_or_else(|| OrderingError::UnknownItem(id.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.reorder(&reordered)
    }
}
