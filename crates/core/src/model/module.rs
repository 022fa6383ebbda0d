use serde::Serialize;

use crate::model::course::Skill;
use crate::model::ids::{
    ModuleId, ModuleQuestionId, ModuleStepId, SkillEvaluationId, SkillId, SubskillEvaluationId,
    SubskillId,
};
use crate::model::status::{ClientFlags, ContentStatus};
use crate::model::step::{Answerable, Rated, Step, StepContent};
use crate::model::text::LocalizedText;

pub type ModuleStepContent = StepContent<ModuleQuestion, SubskillEvaluation, SkillEvaluation>;

/// Module view model: steps plus derived progress for the current user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: ModuleId,
    pub title: LocalizedText,
    pub description: Option<LocalizedText>,
    pub sort_order: Option<u32>,
    /// Enrollment marker present.
    pub enrolled: bool,
    pub skill: Option<Skill>,
    pub steps: Vec<ModuleStep>,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub progress: u8,
    pub completed: bool,
    pub status: ContentStatus,
    #[serde(skip)]
    pub client: ClientFlags,
}

impl Module {
    #[must_use]
    pub fn step(&self, id: ModuleStepId) -> Option<&ModuleStep> {
        self.steps.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStep {
    pub id: ModuleStepId,
    pub title: LocalizedText,
    pub sort_order: Option<u32>,
    pub body: Option<String>,
    pub touched: bool,
    pub content: ModuleStepContent,
    pub completed: bool,
}

impl Step for ModuleStep {
    type Question = ModuleQuestion;
    type Evaluation = SubskillEvaluation;
    type Assessment = SkillEvaluation;

    fn touched(&self) -> bool {
        self.touched
    }

    fn content(&self) -> &ModuleStepContent {
        &self.content
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleQuestion {
    pub id: ModuleQuestionId,
    pub text: LocalizedText,
    pub sort_order: Option<u32>,
    pub user_answer: Option<String>,
    pub answered: bool,
}

impl Answerable for ModuleQuestion {
    fn is_answered(&self) -> bool {
        self.answered
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillEvaluation {
    pub id: SkillEvaluationId,
    pub skill_id: Option<SkillId>,
    pub user_rating: Option<f64>,
}

impl Rated for SkillEvaluation {
    fn user_rating(&self) -> Option<f64> {
        self.user_rating
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubskillEvaluation {
    pub id: SubskillEvaluationId,
    pub subskill_id: SubskillId,
    pub sort_order: Option<u32>,
    pub user_rating: Option<f64>,
}

impl Rated for SubskillEvaluation {
    fn user_rating(&self) -> Option<f64> {
        self.user_rating
    }
}
