#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod course_session;
pub mod dispatch;
pub mod error;
pub mod list_service;
pub mod module_session;
pub mod optimistic;
pub mod progress_service;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::{CatalogImport, CatalogService, ImportSummary};
pub use course_session::{CourseSession, CourseSnapshot};
pub use dispatch::{Dispatched, Notification, Operation, PersistDispatcher};
pub use error::{AppServicesError, CatalogError, DispatchError, OrderingError, SessionError};
pub use list_service::{CourseList, ModuleList, OrderedList, PersistOrder};
pub use module_session::{ModuleSession, ModuleSnapshot};
pub use optimistic::{Applied, Projected};
pub use progress_service::ProgressService;
