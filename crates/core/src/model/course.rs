use serde::Serialize;

use crate::model::ids::{
    AssessmentId, CourseId, CreatorId, EvaluationId, LessonId, OptionId, QuestionId, SkillId,
    SubskillId,
};
use crate::model::status::{ClientFlags, ContentStatus};
use crate::model::step::{Answerable, Rated, Step, StepContent};
use crate::model::text::LocalizedText;

pub type LessonContent = StepContent<Question, Evaluation, Assessment>;

/// Course view model: content tree plus derived progress for the current user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub slug: String,
    pub title: LocalizedText,
    pub description: Option<LocalizedText>,
    #[serde(rename = "type")]
    pub kind: String,
    pub sort_order: Option<u32>,
    /// Enrollment marker present.
    pub enrolled: bool,
    pub skill: Option<Skill>,
    pub creator: Option<Creator>,
    pub lessons: Vec<Lesson>,
    pub completed_lessons: usize,
    pub total_lessons: usize,
    /// Integer percentage 0..=100.
    pub progress: u8,
    pub completed: bool,
    pub status: ContentStatus,
    #[serde(skip)]
    pub client: ClientFlags,
}

impl Course {
    #[must_use]
    pub fn lesson(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.id == id)
    }

    /// First lesson in order that is not complete yet.
    #[must_use]
    pub fn next_lesson(&self) -> Option<&Lesson> {
        self.lessons.iter().find(|l| !l.completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub title: LocalizedText,
    pub description: Option<LocalizedText>,
    pub sort_order: Option<u32>,
    pub body: Option<String>,
    pub touched: bool,
    pub content: LessonContent,
    pub completed: bool,
}

impl Step for Lesson {
    type Question = Question;
    type Evaluation = Evaluation;
    type Assessment = Assessment;

    fn touched(&self) -> bool {
        self.touched
    }

    fn content(&self) -> &LessonContent {
        &self.content
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub text: LocalizedText,
    pub sort_order: Option<u32>,
    pub options: Vec<AnswerOption>,
    /// At least one option is selected by the user; correctness is irrelevant.
    pub answered: bool,
}

impl Answerable for Question {
    fn is_answered(&self) -> bool {
        self.answered
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub id: OptionId,
    pub text: LocalizedText,
    pub sort_order: Option<u32>,
    pub is_correct: Option<bool>,
    pub is_user_answer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: EvaluationId,
    pub title: LocalizedText,
    pub sort_order: Option<u32>,
    pub user_rating: Option<f64>,
}

impl Rated for Evaluation {
    fn user_rating(&self) -> Option<f64> {
        self.user_rating
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: AssessmentId,
    pub title: LocalizedText,
    pub user_rating: Option<f64>,
}

impl Rated for Assessment {
    fn user_rating(&self) -> Option<f64> {
        self.user_rating
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: SkillId,
    pub title: LocalizedText,
    pub subskills: Vec<Subskill>,
    pub user_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subskill {
    pub id: SubskillId,
    pub title: LocalizedText,
    pub sort_order: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    pub id: CreatorId,
    pub name: String,
    pub avatar_url: Option<String>,
}
