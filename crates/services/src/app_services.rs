use std::sync::Arc;

use course_core::model::UserId;
use storage::repository::{OrderingRepository, Storage};
use storage::sqlite::SqliteRepository;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::catalog_service::CatalogService;
use crate::dispatch::{Notification, PersistDispatcher};
use crate::error::{AppServicesError, CatalogError};
use crate::list_service::{CourseList, ModuleList};
use crate::progress_service::ProgressService;
use crate::Clock;

/// Assembles app-facing services over one storage backend.
///
/// Every service shares a single dispatcher, so failed persistence calls of all
/// of them arrive on the receiver returned by the constructor.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<CatalogService>,
    progress: Arc<ProgressService>,
    ordering: Arc<dyn OrderingRepository>,
    dispatcher: PersistDispatcher,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if connecting or migrating fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
    ) -> Result<(Self, UnboundedReceiver<Notification>), AppServicesError> {
        let repo = SqliteRepository::connect(db_url).await?.with_clock(clock);
        repo.migrate().await?;
        Ok(Self::from_storage(&Storage::from_backend(repo), clock))
    }

    /// Build services over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory(clock: Clock) -> (Self, UnboundedReceiver<Notification>) {
        let repo = storage::repository::InMemoryRepository::with_clock(clock);
        Self::from_storage(&Storage::from_backend(repo), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> (Self, UnboundedReceiver<Notification>) {
        let (dispatcher, notifications) = PersistDispatcher::new();
        let catalog = Arc::new(CatalogService::new(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.content),
        ));
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&catalog),
            Arc::clone(&storage.progress),
            dispatcher.clone(),
        ));
        let services = Self {
            catalog,
            progress,
            ordering: Arc::clone(&storage.ordering),
            dispatcher,
        };
        (services, notifications)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    /// The user's course list, ready for local reordering.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the courses cannot be fetched.
    pub async fn course_list(&self, user: UserId) -> Result<CourseList, CatalogError> {
        let courses = self.catalog.list_courses(user).await?;
        Ok(CourseList::new(
            courses,
            Arc::clone(&self.ordering),
            self.dispatcher.clone(),
        ))
    }

    /// # Errors
    ///
    /// Returns `CatalogError` if the modules cannot be fetched.
    pub async fn module_list(&self, user: UserId) -> Result<ModuleList, CatalogError> {
        let modules = self.catalog.list_modules(user).await?;
        Ok(ModuleList::new(
            modules,
            Arc::clone(&self.ordering),
            self.dispatcher.clone(),
        ))
    }
}
