use std::sync::Arc;

use async_trait::async_trait;
use course_core::model::{
    AssessmentId, ContentStatus, CourseId, EvaluationId, LessonId, ModuleId, ModuleQuestionId,
    ModuleStepId, OptionId, Rating, SkillEvaluationId, SkillId, SubskillEvaluationId, UserId,
};
use course_core::time::fixed_clock;
use course_core::SortEntry;
use services::{AppServices, CatalogImport, Operation, SessionError};
use storage::repository::{
    InMemoryRepository, ModuleAnswer, OrderingRepository, ProgressRepository, Storage,
    StorageError,
};

const USER: UserId = UserId::new(42);

fn catalog() -> CatalogImport {
    serde_json::from_value(serde_json::json!({
        "courses": [
            { "id": 1, "title": { "en": "Breathing", "de": "Atmen" }, "sort_order": 1,
              "lessons": [
                  { "id": 10, "type": "reading", "sort_order": 1 },
                  { "id": 11, "type": "questions", "sort_order": 2, "questions": [
                      { "id": 100, "options": [ { "id": 1, "is_correct": true }, { "id": 2 } ] }
                  ] }
              ] },
            { "id": 2, "title": "Focus", "sort_order": 2,
              "lessons": [ { "id": 20, "type": "reading" } ] }
        ],
        "modules": [
            { "id": 5, "title": "Week one", "sort_order": 1,
              "module_steps": [
                  { "id": 50, "type": "descriptive", "sort_order": 1 },
                  { "id": 51, "type": "questions", "sort_order": 2,
                    "module_questions": [ { "id": 500 } ] }
              ] }
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn course_progress_survives_a_refetch() {
    let (app, mut notifications) = AppServices::in_memory(fixed_clock());
    app.catalog().import(&catalog()).await.unwrap();

    let session = app.progress().open_course(USER, CourseId::new(1)).await.unwrap();
    session
        .complete_lesson(LessonId::new(10))
        .unwrap()
        .dispatched
        .outcome()
        .await
        .unwrap();
    let applied = session.answer(&[OptionId::new(2)]).unwrap();
    assert_eq!(applied.snapshot.view().status, ContentStatus::Completed);
    applied.dispatched.outcome().await.unwrap();

    let fetched = app.catalog().course(USER, CourseId::new(1)).await.unwrap();
    assert_eq!(fetched.progress, 100);
    assert_eq!(fetched.title.resolve("de"), "Atmen");
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn module_session_over_app_services() {
    let (app, _notifications) = AppServices::in_memory(fixed_clock());
    app.catalog().import(&catalog()).await.unwrap();

    let session = app.progress().open_module(USER, ModuleId::new(5)).await.unwrap();
    session.start().unwrap().dispatched.outcome().await.unwrap();
    session
        .complete_step(ModuleStepId::new(50))
        .unwrap()
        .dispatched
        .outcome()
        .await
        .unwrap();
    session
        .answer(&[ModuleAnswer::new(ModuleQuestionId::new(500), "slowly")])
        .unwrap()
        .dispatched
        .outcome()
        .await
        .unwrap();

    let fetched = app.catalog().module(USER, ModuleId::new(5)).await.unwrap();
    assert_eq!(fetched.status, ContentStatus::Completed);
    assert_eq!(
        fetched.steps[1].content.item_count(),
        1,
        "question step keeps its single question"
    );
}

#[tokio::test]
async fn opening_unknown_course_fails() {
    let (app, _notifications) = AppServices::in_memory(fixed_clock());
    let err = app
        .progress()
        .open_course(USER, CourseId::new(404))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::Catalog(_)));
}

#[tokio::test]
async fn reordered_list_is_persisted() {
    let (app, _notifications) = AppServices::in_memory(fixed_clock());
    app.catalog().import(&catalog()).await.unwrap();

    let list = app.course_list(USER).await.unwrap();
    let applied = list.reorder_ids(&[CourseId::new(2)]).unwrap();
    applied.dispatched.outcome().await.unwrap();

    let fetched = app.catalog().list_courses(USER).await.unwrap();
    let ids: Vec<u64> = fetched.iter().map(|c| c.id.value()).collect();
    // Course 1 keeps position 1 and wins the tie by id.
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(fetched[1].sort_order, Some(1));
}

/// Backend that accepts reads but refuses every write.
#[derive(Clone, Default)]
struct Offline;

fn offline() -> StorageError {
    StorageError::Connection("backend offline".into())
}

#[async_trait]
impl ProgressRepository for Offline {
    async fn enroll_course(&self, _: UserId, _: CourseId) -> Result<(), StorageError> {
        Err(offline())
    }
    async fn complete_lesson(&self, _: UserId, _: LessonId) -> Result<(), StorageError> {
        Err(offline())
    }
    async fn submit_answers(&self, _: UserId, _: &[OptionId]) -> Result<(), StorageError> {
        Err(offline())
    }
    async fn submit_evaluations(
        &self,
        _: UserId,
        _: &[Rating<EvaluationId>],
    ) -> Result<(), StorageError> {
        Err(offline())
    }
    async fn submit_assessment(
        &self,
        _: UserId,
        _: Rating<AssessmentId>,
    ) -> Result<(), StorageError> {
        Err(offline())
    }
    async fn submit_skill_assessment(
        &self,
        _: UserId,
        _: Rating<SkillId>,
    ) -> Result<(), StorageError> {
        Err(offline())
    }
    async fn start_module(&self, _: UserId, _: ModuleId) -> Result<(), StorageError> {
        Err(offline())
    }
    async fn complete_module_step(&self, _: UserId, _: ModuleStepId) -> Result<(), StorageError> {
        Err(offline())
    }
    async fn submit_module_answers(
        &self,
        _: UserId,
        _: &[ModuleAnswer],
    ) -> Result<(), StorageError> {
        Err(offline())
    }
    async fn submit_skill_evaluation(
        &self,
        _: UserId,
        _: Rating<SkillEvaluationId>,
    ) -> Result<(), StorageError> {
        Err(offline())
    }
    async fn submit_subskill_evaluations(
        &self,
        _: UserId,
        _: &[Rating<SubskillEvaluationId>],
    ) -> Result<(), StorageError> {
        Err(offline())
    }
}

#[async_trait]
impl OrderingRepository for Offline {
    async fn reorder_courses(&self, _: &[SortEntry<CourseId>]) -> Result<(), StorageError> {
        Err(offline())
    }
    async fn reorder_modules(&self, _: &[SortEntry<ModuleId>]) -> Result<(), StorageError> {
        Err(offline())
    }
}

fn offline_storage(reads: &InMemoryRepository) -> Storage {
    Storage {
        catalog: Arc::new(reads.clone()),
        content: Arc::new(reads.clone()),
        progress: Arc::new(Offline),
        ordering: Arc::new(Offline),
    }
}

#[tokio::test]
async fn failed_write_keeps_local_state_and_notifies() {
    let reads = InMemoryRepository::with_clock(fixed_clock());
    let (app, mut notifications) =
        AppServices::from_storage(&offline_storage(&reads), fixed_clock());
    app.catalog().import(&catalog()).await.unwrap();

    let session = app.progress().open_course(USER, CourseId::new(2)).await.unwrap();
    let applied = session.complete_lesson(LessonId::new(20)).unwrap();
    let request_id = applied.dispatched.request_id();
    assert!(applied.dispatched.outcome().await.is_err());

    let notification = notifications.recv().await.unwrap();
    assert_eq!(notification.request_id, request_id);
    assert_eq!(notification.operation, Operation::CompleteLesson);
    assert!(notification.message.contains("backend offline"));

    // Local edit is not rolled back; the backend never saw it.
    assert_eq!(session.course().status, ContentStatus::Completed);
    let fetched = app.catalog().course(USER, CourseId::new(2)).await.unwrap();
    assert_eq!(fetched.status, ContentStatus::NotStarted);
}

#[tokio::test]
async fn failed_reorder_keeps_local_order() {
    let reads = InMemoryRepository::new();
    let (app, mut notifications) = AppServices::from_storage(&offline_storage(&reads), fixed_clock());
    app.catalog().import(&catalog()).await.unwrap();

    let list = app.course_list(USER).await.unwrap();
    let applied = list.reorder_ids(&[CourseId::new(2), CourseId::new(1)]).unwrap();
    assert!(applied.dispatched.outcome().await.is_err());
    assert_eq!(
        notifications.recv().await.unwrap().operation,
        Operation::ReorderCourses
    );

    let local: Vec<u64> = list.snapshot().iter().map(|c| c.id.value()).collect();
    assert_eq!(local, vec![2, 1]);
}

#[tokio::test]
async fn sqlite_backed_services_record_progress() {
    let url = "sqlite:file:memdb_services_flow?mode=memory&cache=shared";
    let (app, _notifications) = AppServices::new_sqlite(url, fixed_clock()).await.unwrap();
    app.catalog().import(&catalog()).await.unwrap();

    let session = app.progress().open_course(USER, CourseId::new(1)).await.unwrap();
    session.enroll().unwrap().dispatched.outcome().await.unwrap();
    session
        .complete_lesson(LessonId::new(10))
        .unwrap()
        .dispatched
        .outcome()
        .await
        .unwrap();

    let fetched = app.catalog().course(USER, CourseId::new(1)).await.unwrap();
    assert!(fetched.enrolled);
    assert_eq!(fetched.progress, 50);
    assert_eq!(fetched.status, ContentStatus::InProgress);
}
