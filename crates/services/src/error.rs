//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::{
    AssessmentId, CourseId, EvaluationId, LessonId, ModuleId, ModuleQuestionId, ModuleStepId,
    OptionId, RatingError, SkillEvaluationId, SubskillEvaluationId,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("module {0} not found")]
    ModuleNotFound(ModuleId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PersistDispatcher`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("no async runtime available to run the persistence call")]
    NoRuntime,
}

/// Errors emitted by course and module sessions.
///
/// Target errors are raised before anything is applied locally.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("lesson {0} is not part of this course")]
    UnknownLesson(LessonId),
    #[error("option {0} is not part of this course")]
    UnknownOption(OptionId),
    #[error("evaluation {0} is not part of this course")]
    UnknownEvaluation(EvaluationId),
    #[error("assessment {0} is not part of this course")]
    UnknownAssessment(AssessmentId),
    #[error("course has no skill to assess")]
    MissingSkill,
    #[error("step {0} is not part of this module")]
    UnknownStep(ModuleStepId),
    #[error("question {0} is not part of this module")]
    UnknownModuleQuestion(ModuleQuestionId),
    #[error("skill evaluation {0} is not part of this module")]
    UnknownSkillEvaluation(SkillEvaluationId),
    #[error("subskill evaluation {0} is not part of this module")]
    UnknownSubskillEvaluation(SubskillEvaluationId),
    #[error(transparent)]
    Rating(#[from] RatingError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by ordered list services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrderingError {
    #[error("{0} is not in the list")]
    UnknownItem(String),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
