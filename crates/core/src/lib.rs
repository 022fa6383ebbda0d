#![forbid(unsafe_code)]
//! Content-progress engine of the learning platform.
//!
//! Raw query rows are projected into typed view models
//! ([`projector`]), each step is classified as complete or not
//! ([`completion`]), and step results roll up into unit progress and status
//! ([`progress`]). Reorderable lists are merged locally before persistence
//! ([`reorder`], [`state`]).

pub mod completion;
pub mod error;
pub mod model;
pub mod progress;
pub mod projector;
pub mod reorder;
pub mod state;
pub mod time;

pub use completion::is_step_complete;
pub use error::Error;
pub use progress::{course_status, module_status, percent, StepProgress};
pub use projector::{project_course, project_module};
pub use reorder::{merge_order, Ordered, SortEntry};
pub use state::{ListSnapshot, ListStore, StateCell};
pub use time::Clock;
