use std::sync::Arc;

use course_core::model::{Course, CourseId, Module, ModuleId, RawCourse, RawModule, UserId};
use course_core::{project_course, project_module};
use serde::{Deserialize, Serialize};
use storage::repository::{CatalogRepository, ContentRepository, StorageError};
use tracing::info;

use crate::error::CatalogError;

/// Content tree accepted by [`CatalogService::import`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogImport {
    #[serde(default)]
    pub courses: Vec<RawCourse>,
    #[serde(default)]
    pub modules: Vec<RawModule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ImportSummary {
    pub courses: usize,
    pub modules: usize,
}

/// Fetches raw rows for a user and projects them into views.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
    content: Arc<dyn ContentRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>, content: Arc<dyn ContentRepository>) -> Self {
        Self { catalog, content }
    }

    /// All courses, projected for `user`, in list order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn list_courses(&self, user: UserId) -> Result<Vec<Course>, CatalogError> {
        let rows = self.catalog.list_courses(user).await?;
        Ok(rows.iter().map(project_course).collect())
    }

    /// # Errors
    ///
    /// Returns `CatalogError::CourseNotFound` if the course does not exist.
    pub async fn course(&self, user: UserId, id: CourseId) -> Result<Course, CatalogError> {
        Ok(project_course(&self.raw_course(user, id).await?))
    }

    /// Raw row of a course, as optimistic sessions start from it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CourseNotFound` if the course does not exist.
    pub async fn raw_course(&self, user: UserId, id: CourseId) -> Result<RawCourse, CatalogError> {
        self.catalog
            .get_course(user, id)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => CatalogError::CourseNotFound(id),
                other => CatalogError::Storage(other),
            })
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn list_modules(&self, user: UserId) -> Result<Vec<Module>, CatalogError> {
        let rows = self.catalog.list_modules(user).await?;
        Ok(rows.iter().map(project_module).collect())
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ModuleNotFound` if the module does not exist.
    pub async fn module(&self, user: UserId, id: ModuleId) -> Result<Module, CatalogError> {
        Ok(project_module(&self.raw_module(user, id).await?))
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ModuleNotFound` if the module does not exist.
    pub async fn raw_module(&self, user: UserId, id: ModuleId) -> Result<RawModule, CatalogError> {
        self.catalog
            .get_module(user, id)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => CatalogError::ModuleNotFound(id),
                other => CatalogError::Storage(other),
            })
    }

    /// Store every course and module of `bundle`. User relations are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` on the first write that fails.
    pub async fn import(&self, bundle: &CatalogImport) -> Result<ImportSummary, CatalogError> {
        for course in &bundle.courses {
            self.content.upsert_course(course).await?;
        }
        for module in &bundle.modules {
            self.content.upsert_module(module).await?;
        }
        let summary = ImportSummary {
            courses: bundle.courses.len(),
            modules: bundle.modules.len(),
        };
        info!(
            courses = summary.courses,
            modules = summary.modules,
            "imported catalog"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::ContentStatus;
    use storage::repository::Storage;

    fn service() -> (CatalogService, Storage) {
        let storage = Storage::in_memory();
        let service = CatalogService::new(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.content),
        );
        (service, storage)
    }

    fn bundle() -> CatalogImport {
        serde_json::from_value(serde_json::json!({
            "courses": [
                { "id": 2, "title": "Second", "sort_order": 2,
                  "lessons": [ { "id": 20, "type": "reading" } ] },
                { "id": 1, "title": "First", "sort_order": 1,
                  "lessons": [ { "id": 10, "type": "reading" } ] }
            ],
            "modules": [
                { "id": 9, "title": "Empty module", "module_steps": null }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn import_then_list_in_sort_order() {
        let (service, _storage) = service();
        let summary = service.import(&bundle()).await.unwrap();
        assert_eq!(summary, ImportSummary { courses: 2, modules: 1 });

        let courses = service.list_courses(UserId::new(1)).await.unwrap();
        let ids: Vec<u64> = courses.iter().map(|c| c.id.value()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(courses.iter().all(|c| c.status == ContentStatus::NotStarted));
    }

    #[tokio::test]
    async fn projection_reflects_markers() {
        let (service, storage) = service();
        service.import(&bundle()).await.unwrap();
        storage
            .progress
            .complete_lesson(UserId::new(1), course_core::model::LessonId::new(10))
            .await
            .unwrap();

        let course = service.course(UserId::new(1), CourseId::new(1)).await.unwrap();
        assert_eq!(course.progress, 100);
        assert!(course.completed);
    }

    #[tokio::test]
    async fn empty_module_reports_completed_without_progress() {
        let (service, _storage) = service();
        service.import(&bundle()).await.unwrap();

        let module = service.module(UserId::new(1), ModuleId::new(9)).await.unwrap();
        assert_eq!(module.progress, 0);
        assert!(!module.completed);
        assert_eq!(module.status, ContentStatus::Completed);
    }

    #[tokio::test]
    async fn missing_rows_name_the_id() {
        let (service, _storage) = service();
        let err = service
            .course(UserId::new(1), CourseId::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::CourseNotFound(id) if id == CourseId::new(404)));

        let err = service
            .module(UserId::new(1), ModuleId::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ModuleNotFound(_)));
    }
}
