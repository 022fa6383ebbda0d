mod course;
mod ids;
pub mod markers;
mod module;
mod rating;
pub mod raw;
mod status;
mod step;
mod text;

pub use ids::{
    AssessmentId, CourseId, CreatorId, EvaluationId, LessonId, ModuleId, ModuleQuestionId,
    ModuleStepId, OptionId, ParseIdError, QuestionId, SkillEvaluationId, SkillId,
    SubskillEvaluationId, SubskillId, UserId,
};
pub use text::{LocalizedText, FALLBACK_LOCALE};

pub use course::{
    AnswerOption, Assessment, Course, Creator, Evaluation, Lesson, LessonContent, Question, Skill,
    Subskill,
};
pub use markers::{AnswerRow, RatingRow, TouchRow};
pub use module::{
    Module, ModuleQuestion, ModuleStep, ModuleStepContent, SkillEvaluation, SubskillEvaluation,
};
pub use rating::{Rating, RatingError};
pub use raw::{
    RawAssessment, RawCourse, RawCreator, RawEvaluation, RawLesson, RawModule, RawModuleQuestion,
    RawModuleSkillEvaluation, RawModuleStep, RawModuleSubskillEvaluation, RawOption, RawQuestion,
    RawSkill, RawSubskill,
};
pub use status::{ClientFlags, ContentStatus};
pub use step::{Answerable, Rated, Step, StepContent, StepType};
