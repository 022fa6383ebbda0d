use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{
    AnswerRow, AssessmentId, CourseId, EvaluationId, LessonId, ModuleId, ModuleQuestionId,
    ModuleStepId, OptionId, Rating, RatingRow, RawCourse, RawModule, SkillEvaluationId, SkillId,
    SubskillEvaluationId, TouchRow, UserId,
};
use course_core::{Clock, SortEntry};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Free-text answer to a module question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAnswer {
    pub question_id: ModuleQuestionId,
    pub answer: String,
}

impl ModuleAnswer {
    #[must_use]
    pub fn new(question_id: ModuleQuestionId, answer: impl Into<String>) -> Self {
        Self {
            question_id,
            answer: answer.into(),
        }
    }
}

/// The query layer: raw nested rows, already filtered to one user.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// All courses with the user's relations, ordered by `sort_order`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read.
    async fn list_courses(&self, user: UserId) -> Result<Vec<RawCourse>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn get_course(&self, user: UserId, id: CourseId) -> Result<RawCourse, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read.
    async fn list_modules(&self, user: UserId) -> Result<Vec<RawModule>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the module does not exist.
    async fn get_module(&self, user: UserId, id: ModuleId) -> Result<RawModule, StorageError>;
}

/// Admin-side writes of the content tree. User relations on the input are ignored.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Insert or replace a course with its skill, creator and lessons.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the tree cannot be stored.
    async fn upsert_course(&self, course: &RawCourse) -> Result<(), StorageError>;

    /// Insert or replace a module with its skill and steps.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the tree cannot be stored.
    async fn upsert_module(&self, module: &RawModule) -> Result<(), StorageError>;
}

/// User progress markers. Every write targets an existing content node and
/// fails with `StorageError::NotFound` otherwise.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the marker cannot be stored.
    async fn enroll_course(&self, user: UserId, course: CourseId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the marker cannot be stored.
    async fn complete_lesson(&self, user: UserId, lesson: LessonId) -> Result<(), StorageError>;

    /// Select options, replacing earlier answers of the questions they belong to.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any option is unknown; nothing is stored then.
    async fn submit_answers(&self, user: UserId, options: &[OptionId])
    -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any evaluation is unknown.
    async fn submit_evaluations(
        &self,
        user: UserId,
        ratings: &[Rating<EvaluationId>],
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the rating cannot be stored.
    async fn submit_assessment(
        &self,
        user: UserId,
        rating: Rating<AssessmentId>,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the rating cannot be stored.
    async fn submit_skill_assessment(
        &self,
        user: UserId,
        rating: Rating<SkillId>,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the marker cannot be stored.
    async fn start_module(&self, user: UserId, module: ModuleId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the marker cannot be stored.
    async fn complete_module_step(
        &self,
        user: UserId,
        step: ModuleStepId,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any question is unknown.
    async fn submit_module_answers(
        &self,
        user: UserId,
        answers: &[ModuleAnswer],
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the rating cannot be stored.
    async fn submit_skill_evaluation(
        &self,
        user: UserId,
        rating: Rating<SkillEvaluationId>,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any evaluation is unknown.
    async fn submit_subskill_evaluations(
        &self,
        user: UserId,
        ratings: &[Rating<SubskillEvaluationId>],
    ) -> Result<(), StorageError>;
}

/// Persisted positions of reorderable lists.
#[async_trait]
pub trait OrderingRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any course is unknown; nothing is stored then.
    async fn reorder_courses(&self, entries: &[SortEntry<CourseId>]) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any module is unknown; nothing is stored then.
    async fn reorder_modules(&self, entries: &[SortEntry<ModuleId>]) -> Result<(), StorageError>;
}

/// Content templates without any user relation.
#[derive(Default)]
struct Catalog {
    courses: HashMap<CourseId, RawCourse>,
    modules: HashMap<ModuleId, RawModule>,
}

impl Catalog {
    fn lesson_exists(&self, id: LessonId) -> bool {
        self.courses
            .values()
            .flat_map(|c| c.lessons.iter())
            .any(|l| l.id == id)
    }

    /// Every option of the question that owns `option`.
    fn sibling_options(&self, option: OptionId) -> Option<Vec<OptionId>> {
        self.courses
            .values()
            .flat_map(|c| c.lessons.iter())
            .flat_map(|l| l.questions.iter())
            .find(|q| q.options.iter().any(|o| o.id == option))
            .map(|q| q.options.iter().map(|o| o.id).collect())
    }

    fn evaluation_exists(&self, id: EvaluationId) -> bool {
        self.courses
            .values()
            .flat_map(|c| c.lessons.iter())
            .flat_map(|l| l.evaluations.iter())
            .any(|e| e.id == id)
    }

    fn assessment_exists(&self, id: AssessmentId) -> bool {
        self.courses
            .values()
            .flat_map(|c| c.lessons.iter())
            .filter_map(|l| l.assessment.as_ref())
            .any(|a| a.id == id)
    }

    fn skill_exists(&self, id: SkillId) -> bool {
        self.courses
            .values()
            .filter_map(|c| c.skill.as_ref())
            .chain(self.modules.values().filter_map(|m| m.skills.as_ref()))
            .any(|s| s.id == id)
    }

    fn module_step_exists(&self, id: ModuleStepId) -> bool {
        self.modules
            .values()
            .flat_map(|m| m.module_steps.iter())
            .any(|s| s.id == id)
    }

    fn module_question_exists(&self, id: ModuleQuestionId) -> bool {
        self.modules
            .values()
            .flat_map(|m| m.module_steps.iter())
            .flat_map(|s| s.module_questions.iter())
            .any(|q| q.id == id)
    }

    fn skill_evaluation_exists(&self, id: SkillEvaluationId) -> bool {
        self.modules
            .values()
            .flat_map(|m| m.module_steps.iter())
            .flat_map(|s| s.module_skill_evaluations.iter())
            .any(|e| e.id == id)
    }

    fn subskill_evaluation_exists(&self, id: SubskillEvaluationId) -> bool {
        self.modules
            .values()
            .flat_map(|m| m.module_steps.iter())
            .flat_map(|s| s.module_subskill_evaluations.iter())
            .any(|e| e.id == id)
    }
}

/// One user's join rows.
#[derive(Default)]
struct UserMarkers {
    enrollments: HashMap<CourseId, DateTime<Utc>>,
    lessons: HashMap<LessonId, DateTime<Utc>>,
    answers: HashMap<OptionId, DateTime<Utc>>,
    evaluations: HashMap<EvaluationId, RatingRow>,
    assessments: HashMap<AssessmentId, RatingRow>,
    skill_assessments: HashMap<SkillId, RatingRow>,
    modules: HashMap<ModuleId, DateTime<Utc>>,
    module_steps: HashMap<ModuleStepId, DateTime<Utc>>,
    module_answers: HashMap<ModuleQuestionId, AnswerRow>,
    skill_evaluations: HashMap<SkillEvaluationId, RatingRow>,
    subskill_evaluations: HashMap<SubskillEvaluationId, RatingRow>,
}

impl UserMarkers {
    fn hydrate_course(&self, template: &RawCourse) -> RawCourse {
        let mut course = template.clone();
        if let Some(at) = self.enrollments.get(&course.id) {
            course.user_courses = vec![TouchRow::at(*at)];
        }
        if let Some(skill) = course.skill.as_mut() {
            skill.user_assessments =
                self.skill_assessments.get(&skill.id).cloned().into_iter().collect();
        }
        for lesson in &mut course.lessons {
            if let Some(at) = self.lessons.get(&lesson.id) {
                lesson.user_lessons = vec![TouchRow::at(*at)];
            }
            for option in lesson.questions.iter_mut().flat_map(|q| q.options.iter_mut()) {
                if let Some(at) = self.answers.get(&option.id) {
                    option.user_answers = vec![TouchRow::at(*at)];
                }
            }
            for evaluation in &mut lesson.evaluations {
                evaluation.user_evaluations =
                    self.evaluations.get(&evaluation.id).cloned().into_iter().collect();
            }
            if let Some(assessment) = lesson.assessment.as_mut() {
                assessment.user_assessments =
                    self.assessments.get(&assessment.id).cloned().into_iter().collect();
            }
        }
        course
    }

    fn hydrate_module(&self, template: &RawModule) -> RawModule {
        let mut module = template.clone();
        if let Some(at) = self.modules.get(&module.id) {
            module.user_modules = vec![TouchRow::at(*at)];
        }
        if let Some(skill) = module.skills.as_mut() {
            skill.user_assessments =
                self.skill_assessments.get(&skill.id).cloned().into_iter().collect();
        }
        for step in &mut module.module_steps {
            if let Some(at) = self.module_steps.get(&step.id) {
                step.user_module_steps = vec![TouchRow::at(*at)];
            }
            for question in &mut step.module_questions {
                question.user_answers =
                    self.module_answers.get(&question.id).cloned().into_iter().collect();
            }
            for evaluation in &mut step.module_skill_evaluations {
                evaluation.user_skill_evaluations =
                    self.skill_evaluations.get(&evaluation.id).cloned().into_iter().collect();
            }
            for evaluation in &mut step.module_subskill_evaluations {
                evaluation.user_subskill_evaluations =
                    self.subskill_evaluations.get(&evaluation.id).cloned().into_iter().collect();
            }
        }
        module
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    catalog: Arc<Mutex<Catalog>>,
    markers: Arc<Mutex<HashMap<UserId, UserMarkers>>>,
    clock: Clock,
}

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// `sort_order` ascending, unordered rows last, ties by id.
fn sort_key(sort_order: Option<u32>) -> (bool, u32) {
    (sort_order.is_none(), sort_order.unwrap_or(u32::MAX))
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Clock::default())
    }

    /// Repository that stamps markers with `clock`.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            catalog: Arc::new(Mutex::new(Catalog::default())),
            markers: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Validate against the catalog, then mutate the user's markers.
    fn write_markers<R>(
        &self,
        user: UserId,
        f: impl FnOnce(&Catalog, &mut UserMarkers, DateTime<Utc>) -> Result<R, StorageError>,
    ) -> Result<R, StorageError> {
        let catalog = self.catalog.lock().map_err(lock_err)?;
        let mut markers = self.markers.lock().map_err(lock_err)?;
        let entry = markers.entry(user).or_default();
        f(&catalog, entry, self.clock.now())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn list_courses(&self, user: UserId) -> Result<Vec<RawCourse>, StorageError> {
        let catalog = self.catalog.lock().map_err(lock_err)?;
        let markers = self.markers.lock().map_err(lock_err)?;
        let empty = UserMarkers::default();
        let mine = markers.get(&user).unwrap_or(&empty);

        let mut courses: Vec<RawCourse> = catalog
            .courses
            .values()
            .map(|c| mine.hydrate_course(c))
            .collect();
        courses.sort_by_key(|c| (sort_key(c.sort_order), c.id));
        Ok(courses)
    }

    async fn get_course(&self, user: UserId, id: CourseId) -> Result<RawCourse, StorageError> {
        let catalog = self.catalog.lock().map_err(lock_err)?;
        let markers = self.markers.lock().map_err(lock_err)?;
        let template = catalog.courses.get(&id).ok_or(StorageError::NotFound)?;
        Ok(match markers.get(&user) {
            Some(mine) => mine.hydrate_course(template),
            None => template.clone(),
        })
    }

    async fn list_modules(&self, user: UserId) -> Result<Vec<RawModule>, StorageError> {
        let catalog = self.catalog.lock().map_err(lock_err)?;
        let markers = self.markers.lock().map_err(lock_err)?;
        let empty = UserMarkers::default();
        let mine = markers.get(&user).unwrap_or(&empty);

        let mut modules: Vec<RawModule> = catalog
            .modules
            .values()
            .map(|m| mine.hydrate_module(m))
            .collect();
        modules.sort_by_key(|m| (sort_key(m.sort_order), m.id));
        Ok(modules)
    }

    async fn get_module(&self, user: UserId, id: ModuleId) -> Result<RawModule, StorageError> {
        let catalog = self.catalog.lock().map_err(lock_err)?;
        let markers = self.markers.lock().map_err(lock_err)?;
        let template = catalog.modules.get(&id).ok_or(StorageError::NotFound)?;
        Ok(match markers.get(&user) {
            Some(mine) => mine.hydrate_module(template),
            None => template.clone(),
        })
    }
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &RawCourse) -> Result<(), StorageError> {
        let mut catalog = self.catalog.lock().map_err(lock_err)?;
        catalog
            .courses
            .insert(course.id, course.without_user_relations());
        Ok(())
    }

    async fn upsert_module(&self, module: &RawModule) -> Result<(), StorageError> {
        let mut catalog = self.catalog.lock().map_err(lock_err)?;
        catalog
            .modules
            .insert(module.id, module.without_user_relations());
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn enroll_course(&self, user: UserId, course: CourseId) -> Result<(), StorageError> {
        self.write_markers(user, |catalog, mine, now| {
            if !catalog.courses.contains_key(&course) {
                return Err(StorageError::NotFound);
            }
            mine.enrollments.entry(course).or_insert(now);
            Ok(())
        })
    }

    async fn complete_lesson(&self, user: UserId, lesson: LessonId) -> Result<(), StorageError> {
        self.write_markers(user, |catalog, mine, now| {
            if !catalog.lesson_exists(lesson) {
                return Err(StorageError::NotFound);
            }
            mine.lessons.entry(lesson).or_insert(now);
            Ok(())
        })
    }

    async fn submit_answers(
        &self,
        user: UserId,
        options: &[OptionId],
    ) -> Result<(), StorageError> {
        self.write_markers(user, |catalog, mine, now| {
            let mut siblings = HashSet::new();
            for option in options {
                let owned = catalog
                    .sibling_options(*option)
                    .ok_or(StorageError::NotFound)?;
                siblings.extend(owned);
            }
            for sibling in &siblings {
                mine.answers.remove(sibling);
            }
            for option in options {
                mine.answers.insert(*option, now);
            }
            Ok(())
        })
    }

    async fn submit_evaluations(
        &self,
        user: UserId,
        ratings: &[Rating<EvaluationId>],
    ) -> Result<(), StorageError> {
        self.write_markers(user, |catalog, mine, now| {
            if !ratings.iter().all(|r| catalog.evaluation_exists(r.id())) {
                return Err(StorageError::NotFound);
            }
            for rating in ratings {
                mine.evaluations
                    .insert(rating.id(), RatingRow::new(rating.value(), now));
            }
            Ok(())
        })
    }

    async fn submit_assessment(
        &self,
        user: UserId,
        rating: Rating<AssessmentId>,
    ) -> Result<(), StorageError> {
        self.write_markers(user, |catalog, mine, now| {
            if !catalog.assessment_exists(rating.id()) {
                return Err(StorageError::NotFound);
            }
            mine.assessments
                .insert(rating.id(), RatingRow::new(rating.value(), now));
            Ok(())
        })
    }

    async fn submit_skill_assessment(
        &self,
        user: UserId,
        rating: Rating<SkillId>,
    ) -> Result<(), StorageError> {
        self.write_markers(user, |catalog, mine, now| {
            if !catalog.skill_exists(rating.id()) {
                return Err(StorageError::NotFound);
            }
            mine.skill_assessments
                .insert(rating.id(), RatingRow::new(rating.value(), now));
            Ok(())
        })
    }

    async fn start_module(&self, user: UserId, module: ModuleId) -> Result<(), StorageError> {
        self.write_markers(user, |catalog, mine, now| {
            if !catalog.modules.contains_key(&module) {
                return Err(StorageError::NotFound);
            }
            mine.modules.entry(module).or_insert(now);
            Ok(())
        })
    }

    async fn complete_module_step(
        &self,
        user: UserId,
        step: ModuleStepId,
    ) -> Result<(), StorageError> {
        self.write_markers(user, |catalog, mine, now| {
            if !catalog.module_step_exists(step) {
                return Err(StorageError::NotFound);
            }
            mine.module_steps.entry(step).or_insert(now);
            Ok(())
        })
    }

    async fn submit_module_answers(
        &self,
        user: UserId,
        answers: &[ModuleAnswer],
    ) -> Result<(), StorageError> {
        self.write_markers(user, |catalog, mine, now| {
            if !answers
                .iter()
                .all(|a| catalog.module_question_exists(a.question_id))
            {
                return Err(StorageError::NotFound);
            }
            for answer in answers {
                mine.module_answers.insert(
                    answer.question_id,
                    AnswerRow::new(answer.answer.clone(), now),
                );
            }
            Ok(())
        })
    }

    async fn submit_skill_evaluation(
        &self,
        user: UserId,
        rating: Rating<SkillEvaluationId>,
    ) -> Result<(), StorageError> {
        self.write_markers(user, |catalog, mine, now| {
            if !catalog.skill_evaluation_exists(rating.id()) {
                return Err(StorageError::NotFound);
            }
            mine.skill_evaluations
                .insert(rating.id(), RatingRow::new(rating.value(), now));
            Ok(())
        })
    }

    async fn submit_subskill_evaluations(
        &self,
        user: UserId,
        ratings: &[Rating<SubskillEvaluationId>],
    ) -> Result<(), StorageError> {
        self.write_markers(user, |catalog, mine, now| {
            if !ratings
                .iter()
                .all(|r| catalog.subskill_evaluation_exists(r.id()))
            {
                return Err(StorageError::NotFound);
            }
            for rating in ratings {
                mine.subskill_evaluations
                    .insert(rating.id(), RatingRow::new(rating.value(), now));
            }
            Ok(())
        })
    }
}

#[async_trait]
impl OrderingRepository for InMemoryRepository {
    async fn reorder_courses(&self, entries: &[SortEntry<CourseId>]) -> Result<(), StorageError> {
        let mut catalog = self.catalog.lock().map_err(lock_err)?;
        if !entries.iter().all(|e| catalog.courses.contains_key(&e.id)) {
            return Err(StorageError::NotFound);
        }
        for entry in entries {
            if let Some(course) = catalog.courses.get_mut(&entry.id) {
                course.sort_order = Some(entry.sort_order);
            }
        }
        Ok(())
    }

    async fn reorder_modules(&self, entries: &[SortEntry<ModuleId>]) -> Result<(), StorageError> {
        let mut catalog = self.catalog.lock().map_err(lock_err)?;
        if !entries.iter().all(|e| catalog.modules.contains_key(&e.id)) {
            return Err(StorageError::NotFound);
        }
        for entry in entries {
            if let Some(module) = catalog.modules.get_mut(&entry.id) {
                module.sort_order = Some(entry.sort_order);
            }
        }
        Ok(())
    }
}

/// Aggregates the repository seams behind trait objects.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub content: Arc<dyn ContentRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub ordering: Arc<dyn OrderingRepository>,
}

impl Storage {
    /// Wire every seam to the same backend.
    #[must_use]
    pub fn from_backend<R>(repo: R) -> Self
    where
        R: CatalogRepository
            + ContentRepository
            + ProgressRepository
            + OrderingRepository
            + Clone
            + 'static,
    {
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let content: Arc<dyn ContentRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let ordering: Arc<dyn OrderingRepository> = Arc::new(repo);
        Self {
            catalog,
            content,
            progress,
            ordering,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::time::{fixed_clock, fixed_now};

    const USER: UserId = UserId::new(1);
    const OTHER: UserId = UserId::new(2);

    fn course_fixture() -> RawCourse {
        serde_json::from_value(serde_json::json!({
            "id": 10,
            "slug": "rust-basics",
            "title": "Rust basics",
            "sort_order": 2,
            "skill": { "id": 5, "title": "Rust", "subskills": [] },
            "lessons": [
                { "id": 100, "type": "reading", "sort_order": 1 },
                { "id": 101, "type": "questions", "sort_order": 2, "questions": [
                    { "id": 1000, "options": [
                        { "id": 1, "is_correct": true },
                        { "id": 2, "is_correct": false }
                    ] }
                ] },
                { "id": 102, "type": "evaluations", "sort_order": 3,
                  "evaluations": [ { "id": 20 } ] },
                { "id": 103, "type": "assessment", "sort_order": 4,
                  "assessment": { "id": 30 } }
            ]
        }))
        .unwrap()
    }

    fn module_fixture(id: u64, sort_order: u32) -> RawModule {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("Module {id}"),
            "sort_order": sort_order,
            "module_steps": [
                { "id": (id * 10), "type": "questions",
                  "module_questions": [ { "id": (id * 100) } ] }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn upsert_strips_user_relations() {
        let repo = InMemoryRepository::new();
        let mut course = course_fixture();
        course.record_enrollment(fixed_now());
        repo.upsert_course(&course).await.unwrap();

        let fetched = repo.get_course(USER, course.id).await.unwrap();
        assert!(fetched.user_courses.is_empty());
    }

    #[tokio::test]
    async fn markers_are_scoped_to_the_user() {
        let repo = InMemoryRepository::with_clock(fixed_clock());
        let course = course_fixture();
        repo.upsert_course(&course).await.unwrap();

        repo.enroll_course(USER, course.id).await.unwrap();
        repo.complete_lesson(USER, LessonId::new(100)).await.unwrap();

        let mine = repo.get_course(USER, course.id).await.unwrap();
        assert_eq!(mine.user_courses, vec![TouchRow::at(fixed_now())]);
        assert_eq!(mine.lessons[0].user_lessons.len(), 1);

        let theirs = repo.get_course(OTHER, course.id).await.unwrap();
        assert!(theirs.user_courses.is_empty());
        assert!(theirs.lessons[0].user_lessons.is_empty());
    }

    #[tokio::test]
    async fn answers_replace_previous_selection_of_the_question() {
        let repo = InMemoryRepository::new();
        repo.upsert_course(&course_fixture()).await.unwrap();

        repo.submit_answers(USER, &[OptionId::new(1)]).await.unwrap();
        repo.submit_answers(USER, &[OptionId::new(2)]).await.unwrap();

        let course = repo.get_course(USER, CourseId::new(10)).await.unwrap();
        let options = &course.lessons[1].questions[0].options;
        assert!(options[0].user_answers.is_empty());
        assert_eq!(options[1].user_answers.len(), 1);
    }

    #[tokio::test]
    async fn unknown_option_stores_nothing() {
        let repo = InMemoryRepository::new();
        repo.upsert_course(&course_fixture()).await.unwrap();

        let err = repo
            .submit_answers(USER, &[OptionId::new(1), OptionId::new(999)])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        let course = repo.get_course(USER, CourseId::new(10)).await.unwrap();
        assert!(course.lessons[1].questions[0].options[0].user_answers.is_empty());
    }

    #[tokio::test]
    async fn ratings_are_overwritten() {
        let repo = InMemoryRepository::new();
        repo.upsert_course(&course_fixture()).await.unwrap();

        let first = Rating::new(EvaluationId::new(20), 2.0).unwrap();
        let second = Rating::new(EvaluationId::new(20), 4.0).unwrap();
        repo.submit_evaluations(USER, &[first]).await.unwrap();
        repo.submit_evaluations(USER, &[second]).await.unwrap();
        repo.submit_assessment(USER, Rating::new(AssessmentId::new(30), 3.0).unwrap())
            .await
            .unwrap();
        repo.submit_skill_assessment(USER, Rating::new(SkillId::new(5), 1.0).unwrap())
            .await
            .unwrap();

        let course = repo.get_course(USER, CourseId::new(10)).await.unwrap();
        let rows = &course.lessons[2].evaluations[0].user_evaluations;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, Some(4.0));
        let assessment = course.lessons[3].assessment.as_ref().unwrap();
        assert_eq!(assessment.user_assessments[0].value, Some(3.0));
        let skill = course.skill.as_ref().unwrap();
        assert_eq!(skill.user_assessments[0].value, Some(1.0));
    }

    #[tokio::test]
    async fn missing_targets_are_not_found() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.enroll_course(USER, CourseId::new(1)).await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            repo.get_module(USER, ModuleId::new(1)).await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            repo.complete_module_step(USER, ModuleStepId::new(1)).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn module_markers_round_trip() {
        let repo = InMemoryRepository::new();
        repo.upsert_module(&module_fixture(1, 1)).await.unwrap();

        repo.start_module(USER, ModuleId::new(1)).await.unwrap();
        repo.complete_module_step(USER, ModuleStepId::new(10))
            .await
            .unwrap();
        repo.submit_module_answers(USER, &[ModuleAnswer::new(ModuleQuestionId::new(100), "yes")])
            .await
            .unwrap();

        let module = repo.get_module(USER, ModuleId::new(1)).await.unwrap();
        assert_eq!(module.user_modules.len(), 1);
        let step = &module.module_steps[0];
        assert_eq!(step.user_module_steps.len(), 1);
        assert_eq!(
            step.module_questions[0].user_answers[0].answer.as_deref(),
            Some("yes")
        );
    }

    #[tokio::test]
    async fn reorder_updates_list_order() {
        let repo = InMemoryRepository::new();
        for (id, order) in [(1, 1), (2, 2), (3, 3)] {
            repo.upsert_module(&module_fixture(id, order)).await.unwrap();
        }

        repo.reorder_modules(&[
            SortEntry { id: ModuleId::new(3), sort_order: 1 },
            SortEntry { id: ModuleId::new(1), sort_order: 2 },
            SortEntry { id: ModuleId::new(2), sort_order: 3 },
        ])
        .await
        .unwrap();

        let ids: Vec<u64> = repo
            .list_modules(USER)
            .await
            .unwrap()
            .iter()
            .map(|m| m.id.value())
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn reorder_with_unknown_id_changes_nothing() {
        let repo = InMemoryRepository::new();
        repo.upsert_course(&course_fixture()).await.unwrap();

        let err = repo
            .reorder_courses(&[
                SortEntry { id: CourseId::new(10), sort_order: 9 },
                SortEntry { id: CourseId::new(11), sort_order: 1 },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        let course = repo.get_course(USER, CourseId::new(10)).await.unwrap();
        assert_eq!(course.sort_order, Some(2));
    }

    #[tokio::test]
    async fn storage_in_memory_shares_one_backend() {
        let storage = Storage::in_memory();
        storage.content.upsert_course(&course_fixture()).await.unwrap();
        storage
            .progress
            .enroll_course(USER, CourseId::new(10))
            .await
            .unwrap();

        let courses = storage.catalog.list_courses(USER).await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].user_courses.len(), 1);
    }
}
