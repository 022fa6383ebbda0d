use course_core::model::{
    AssessmentId, ContentStatus, CourseId, EvaluationId, LessonId, LocalizedText, ModuleId, ModuleQuestionId,
    ModuleStepId, OptionId, Rating, RawCourse, RawModule, SkillEvaluationId, SkillId,
    SubskillEvaluationId, UserId,
};
use course_core::time::{fixed_clock, fixed_now};
use course_core::{SortEntry, project_course, project_module};
use storage::repository::{
    CatalogRepository, ContentRepository, ModuleAnswer, OrderingRepository, ProgressRepository,
    StorageError,
};
use storage::sqlite::SqliteRepository;

const USER: UserId = UserId::new(7);

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url)
        .await
        .expect("connect")
        .with_clock(fixed_clock());
    repo.migrate().await.expect("migrate");
    repo
}

fn course(id: u64, sort_order: u32) -> RawCourse {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "slug": format!("course-{id}"),
        "title": { "en": "Rust", "de": "Rost" },
        "description": "Systems programming",
        "type": "course",
        "sort_order": sort_order,
        "creator": { "id": 3, "name": "Ada", "avatar_url": null },
        "skill": { "id": 4, "title": "Rust", "subskills": [
            { "id": 41, "title": "Ownership", "sort_order": 1 }
        ] },
        "lessons": [
            { "id": (id * 100 + 1), "title": "Read", "type": "reading", "sort_order": 1,
              "body": "# Intro" },
            { "id": (id * 100 + 2), "title": "Quiz", "type": "questions", "sort_order": 2,
              "questions": [ { "id": (id * 100 + 2), "text": "2 + 2?", "options": [
                  { "id": (id * 1000 + 1), "text": "4", "is_correct": true, "sort_order": 1 },
                  { "id": (id * 1000 + 2), "text": "5", "is_correct": false, "sort_order": 2 }
              ] } ] },
            { "id": (id * 100 + 3), "title": "Rate", "type": "evaluations", "sort_order": 3,
              "evaluations": [ { "id": (id * 100 + 3), "title": "Clarity" } ] },
            { "id": (id * 100 + 4), "title": "Assess", "type": "assessment", "sort_order": 4,
              "assessment": { "id": (id * 100 + 4), "title": "Overall" } }
        ]
    }))
    .expect("course fixture")
}

fn module(id: u64, sort_order: u32) -> RawModule {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "title": format!("Module {id}"),
        "sort_order": sort_order,
        "skills": { "id": 4, "title": "Rust", "subskills": [
            { "id": 41, "title": "Ownership", "sort_order": 1 }
        ] },
        "module_steps": [
            { "id": (id * 10 + 1), "title": "Intro", "type": "descriptive", "sort_order": 1 },
            { "id": (id * 10 + 2), "title": "Ask", "type": "questions", "sort_order": 2,
              "module_questions": [ { "id": (id * 10 + 2), "text": "Why?" } ] },
            { "id": (id * 10 + 3), "title": "Self check", "type": "subskill_evaluations",
              "sort_order": 3,
              "module_subskill_evaluations": [
                  { "id": (id * 10 + 3), "subskill_id": 41, "sort_order": 1 }
              ] },
            { "id": (id * 10 + 4), "title": "Overall", "type": "skill_evaluation",
              "sort_order": 4,
              "module_skill_evaluations": [ { "id": (id * 10 + 4), "skill_id": 4 } ] }
        ]
    }))
    .expect("module fixture")
}

#[tokio::test]
async fn sqlite_course_round_trip_keeps_content_tree() {
    let repo = connect("memdb_course_tree").await;
    let original = course(1, 1);
    repo.upsert_course(&original).await.expect("upsert");

    let fetched = repo.get_course(USER, CourseId::new(1)).await.expect("get");
    assert_eq!(fetched, original);
    assert_eq!(
        fetched.title,
        LocalizedText::localized([("en", "Rust"), ("de", "Rost")])
    );
}

#[tokio::test]
async fn sqlite_markers_drive_course_progress() {
    let repo = connect("memdb_course_progress").await;
    repo.upsert_course(&course(1, 1)).await.expect("upsert");

    repo.enroll_course(USER, CourseId::new(1)).await.expect("enroll");
    repo.complete_lesson(USER, LessonId::new(101))
        .await
        .expect("lesson");
    let projected = project_course(&repo.get_course(USER, CourseId::new(1)).await.unwrap());
    assert!(projected.enrolled);
    assert_eq!(projected.progress, 25);
    assert_eq!(projected.status, ContentStatus::InProgress);

    repo.submit_answers(USER, &[OptionId::new(1001)])
        .await
        .expect("answers");
    repo.submit_evaluations(USER, &[Rating::new(EvaluationId::new(103), 4.0).unwrap()])
        .await
        .expect("evaluations");
    repo.submit_assessment(USER, Rating::new(AssessmentId::new(104), 5.0).unwrap())
        .await
        .expect("assessment");
    repo.submit_skill_assessment(USER, Rating::new(SkillId::new(4), 3.0).unwrap())
        .await
        .expect("skill");

    let raw = repo.get_course(USER, CourseId::new(1)).await.unwrap();
    let first = &raw.lessons[0].user_lessons[0];
    assert_eq!(first.created_at, Some(fixed_now()));

    let projected = project_course(&raw);
    assert_eq!(projected.progress, 100);
    assert!(projected.completed);
    assert_eq!(projected.status, ContentStatus::Completed);
    assert_eq!(projected.skill.and_then(|s| s.user_rating), Some(3.0));

    let other = project_course(
        &repo.get_course(UserId::new(8), CourseId::new(1))
            .await
            .unwrap(),
    );
    assert_eq!(other.progress, 0);
    assert_eq!(other.status, ContentStatus::NotStarted);
}

#[tokio::test]
async fn sqlite_answers_replace_earlier_choice() {
    let repo = connect("memdb_answers_replace").await;
    repo.upsert_course(&course(1, 1)).await.expect("upsert");

    repo.submit_answers(USER, &[OptionId::new(1001)]).await.unwrap();
    repo.submit_answers(USER, &[OptionId::new(1002)]).await.unwrap();

    let raw = repo.get_course(USER, CourseId::new(1)).await.unwrap();
    let options = &raw.lessons[1].questions[0].options;
    assert!(options[0].user_answers.is_empty());
    assert_eq!(options[1].user_answers.len(), 1);

    let err = repo
        .submit_answers(USER, &[OptionId::new(9999)])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_reupsert_prunes_removed_children() {
    let repo = connect("memdb_prune").await;
    let mut raw = course(1, 1);
    repo.upsert_course(&raw).await.expect("upsert");
    repo.complete_lesson(USER, LessonId::new(101)).await.unwrap();

    raw.lessons.truncate(1);
    repo.upsert_course(&raw).await.expect("re-upsert");

    let fetched = repo.get_course(USER, CourseId::new(1)).await.unwrap();
    assert_eq!(fetched.lessons.len(), 1);
    assert_eq!(fetched.lessons[0].user_lessons.len(), 1);
}

#[tokio::test]
async fn sqlite_module_markers_drive_module_status() {
    let repo = connect("memdb_module_progress").await;
    repo.upsert_module(&module(5, 1)).await.expect("upsert");

    let fresh = project_module(&repo.get_module(USER, ModuleId::new(5)).await.unwrap());
    assert_eq!(fresh.status, ContentStatus::NotStarted);

    repo.start_module(USER, ModuleId::new(5)).await.unwrap();
    repo.complete_module_step(USER, ModuleStepId::new(51))
        .await
        .unwrap();
    repo.submit_module_answers(USER, &[ModuleAnswer::new(ModuleQuestionId::new(52), "because")])
        .await
        .unwrap();
    let started = project_module(&repo.get_module(USER, ModuleId::new(5)).await.unwrap());
    assert_eq!(started.status, ContentStatus::InProgress);
    assert_eq!(started.progress, 50);

    repo.submit_subskill_evaluations(
        USER,
        &[Rating::new(SubskillEvaluationId::new(53), 2.0).unwrap()],
    )
    .await
    .unwrap();
    repo.submit_skill_evaluation(USER, Rating::new(SkillEvaluationId::new(54), 4.0).unwrap())
        .await
        .unwrap();

    let done = project_module(&repo.get_module(USER, ModuleId::new(5)).await.unwrap());
    assert_eq!(done.progress, 100);
    assert!(done.completed);
    assert_eq!(done.status, ContentStatus::Completed);
}

#[tokio::test]
async fn sqlite_reorder_is_all_or_nothing() {
    let repo = connect("memdb_reorder").await;
    for (id, order) in [(1, 1), (2, 2), (3, 3)] {
        repo.upsert_course(&course(id, order)).await.expect("upsert");
    }

    repo.reorder_courses(&[
        SortEntry { id: CourseId::new(3), sort_order: 1 },
        SortEntry { id: CourseId::new(1), sort_order: 2 },
        SortEntry { id: CourseId::new(2), sort_order: 3 },
    ])
    .await
    .expect("reorder");

    let ids: Vec<u64> = repo
        .list_courses(USER)
        .await
        .unwrap()
        .iter()
        .map(|c| c.id.value())
        .collect();
    assert_eq!(ids, vec![3, 1, 2]);

    let err = repo
        .reorder_courses(&[
            SortEntry { id: CourseId::new(1), sort_order: 1 },
            SortEntry { id: CourseId::new(42), sort_order: 2 },
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let course_one = repo.get_course(USER, CourseId::new(1)).await.unwrap();
    assert_eq!(course_one.sort_order, Some(2));
}

#[tokio::test]
async fn sqlite_reorder_modules_and_missing_rows() {
    let repo = connect("memdb_modules_reorder").await;
    repo.upsert_module(&module(1, 1)).await.unwrap();
    repo.upsert_module(&module(2, 2)).await.unwrap();

    repo.reorder_modules(&[
        SortEntry { id: ModuleId::new(2), sort_order: 1 },
        SortEntry { id: ModuleId::new(1), sort_order: 2 },
    ])
    .await
    .unwrap();

    let modules = repo.list_modules(USER).await.unwrap();
    assert_eq!(modules[0].id, ModuleId::new(2));

    assert!(matches!(
        repo.get_module(USER, ModuleId::new(99)).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.enroll_course(USER, CourseId::new(99)).await,
        Err(StorageError::NotFound)
    ));
}
