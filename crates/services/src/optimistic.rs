//! Raw row plus its projection, updated together.

use std::sync::Arc;

use course_core::StateCell;

use crate::dispatch::Dispatched;

/// A raw row and the view projected from it.
///
/// The view is never edited directly: every edit goes to the raw row and the
/// view is projected again.
#[derive(Debug, Clone)]
pub struct Projected<R, V> {
    raw: R,
    view: V,
}

impl<R, V> Projected<R, V> {
    #[must_use]
    pub fn raw(&self) -> &R {
        &self.raw
    }

    #[must_use]
    pub fn view(&self) -> &V {
        &self.view
    }
}

/// Local result of an edit plus the handle of its persistence call.
#[derive(Debug)]
pub struct Applied<T> {
    pub snapshot: Arc<T>,
    pub dispatched: Dispatched,
}

pub(crate) struct ProjectedCell<R, V> {
    cell: StateCell<Projected<R, V>>,
    project: fn(&R) -> V,
}

impl<R: Clone, V> ProjectedCell<R, V> {
    pub(crate) fn new(raw: R, project: fn(&R) -> V) -> Self {
        let view = project(&raw);
        Self {
            cell: StateCell::new(Projected { raw, view }),
            project,
        }
    }

    pub(crate) fn current(&self) -> Arc<Projected<R, V>> {
        self.cell.get()
    }

    /// Apply `edit` to a copy of the raw row and swap in the re-projection.
    ///
    /// An `Err` from `edit` leaves the current snapshot untouched.
    pub(crate) fn record<E>(
        &self,
        edit: impl FnOnce(&mut R) -> Result<(), E>,
    ) -> Result<Arc<Projected<R, V>>, E> {
        let project = self.project;
        let (snapshot, outcome) = self.cell.update(|current| {
            let mut raw = current.raw.clone();
            match edit(&mut raw) {
                Ok(()) => {
                    let view = project(&raw);
                    (Some(Projected { raw, view }), Ok(()))
                }
                Err(err) => (None, Err(err)),
            }
        });
        outcome.map(|()| snapshot)
    }

    /// Replace the raw row, e.g. after a fresh fetch.
    pub(crate) fn reset(&self, raw: R) -> Arc<Projected<R, V>> {
        let view = (self.project)(&raw);
        self.cell.replace(Projected { raw, view })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(raw: &u32) -> u32 {
        raw * 2
    }

    #[test]
    fn view_follows_raw_edits() {
        let cell = ProjectedCell::new(2_u32, double);
        assert_eq!(*cell.current().view(), 4);

        let next = cell
            .record(|raw| -> Result<(), ()> {
                *raw += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(*next.raw(), 3);
        assert_eq!(*next.view(), 6);
    }

    #[test]
    fn failed_edit_keeps_snapshot() {
        let cell = ProjectedCell::new(2_u32, double);
        let before = cell.current();

        let result = cell.record(|raw| {
            *raw = 100;
            Err("rejected")
        });

        assert_eq!(result.unwrap_err(), "rejected");
        assert!(Arc::ptr_eq(&before, &cell.current()));
        assert_eq!(*cell.current().raw(), 2);
    }

    #[test]
    fn reset_reprojects() {
        let cell = ProjectedCell::new(1_u32, double);
        assert_eq!(*cell.reset(10).view(), 20);
    }
}
