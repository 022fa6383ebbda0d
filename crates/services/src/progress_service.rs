use std::sync::Arc;

use course_core::model::{CourseId, ModuleId, UserId};
use course_core::Clock;
use storage::repository::ProgressRepository;

use crate::catalog_service::CatalogService;
use crate::course_session::CourseSession;
use crate::dispatch::PersistDispatcher;
use crate::error::SessionError;
use crate::module_session::ModuleSession;

/// Opens optimistic sessions on freshly fetched rows.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<CatalogService>,
    progress: Arc<dyn ProgressRepository>,
    dispatcher: PersistDispatcher,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<CatalogService>,
        progress: Arc<dyn ProgressRepository>,
        dispatcher: PersistDispatcher,
    ) -> Self {
        Self {
            clock,
            catalog,
            progress,
            dispatcher,
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::Catalog` if the course cannot be fetched.
    pub async fn open_course(&self, user: UserId, id: CourseId) -> Result<CourseSession, SessionError> {
        let raw = self.catalog.raw_course(user, id).await?;
        Ok(CourseSession::new(
            user,
            raw,
            self.clock,
            Arc::clone(&self.progress),
            self.dispatcher.clone(),
        ))
    }

    /// # Errors
    ///
    /// Returns `SessionError::Catalog` if the module cannot be fetched.
    pub async fn open_module(&self, user: UserId, id: ModuleId) -> Result<ModuleSession, SessionError> {
        let raw = self.catalog.raw_module(user, id).await?;
        Ok(ModuleSession::new(
            user,
            raw,
            self.clock,
            Arc::clone(&self.progress),
            self.dispatcher.clone(),
        ))
    }
}
