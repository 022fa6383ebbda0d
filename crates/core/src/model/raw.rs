//! Nested rows as produced by the external query layer.
//!
//! One `RawCourse` / `RawModule` per top-level entity, already filtered to the
//! current user: every `user_<x>` array holds only that user's join rows.
//! Missing or `null` arrays deserialize as empty so partial rows never fail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{
    AssessmentId, CourseId, CreatorId, EvaluationId, LessonId, ModuleId, ModuleQuestionId,
    ModuleStepId, OptionId, QuestionId, SkillEvaluationId, SkillId, SubskillEvaluationId,
    SubskillId,
};
use crate::model::markers::{nullable_default, nullable_vec, AnswerRow, RatingRow, TouchRow};
use crate::model::text::LocalizedText;

//
// ─── COURSE SHAPE ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCourse {
    pub id: CourseId,
    #[serde(default, deserialize_with = "nullable_default")]
    pub slug: String,
    #[serde(default, deserialize_with = "nullable_default")]
    pub title: LocalizedText,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    #[serde(rename = "type", default, deserialize_with = "nullable_default")]
    pub kind: String,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: Option<u32>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub user_courses: Vec<TouchRow>,
    #[serde(default)]
    pub skill: Option<RawSkill>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub lessons: Vec<RawLesson>,
    #[serde(default)]
    pub creator: Option<RawCreator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCreator {
    pub id: CreatorId,
    #[serde(default, deserialize_with = "nullable_default")]
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSkill {
    pub id: SkillId,
    #[serde(default, deserialize_with = "nullable_default")]
    pub title: LocalizedText,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub subskills: Vec<RawSubskill>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub user_assessments: Vec<RatingRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSubskill {
    pub id: SubskillId,
    #[serde(default, deserialize_with = "nullable_default")]
    pub title: LocalizedText,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLesson {
    pub id: LessonId,
    #[serde(default, deserialize_with = "nullable_default")]
    pub title: LocalizedText,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    #[serde(rename = "type", default, deserialize_with = "nullable_default")]
    pub kind: String,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: Option<u32>,
    #[serde(default, alias = "content")]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub user_lessons: Vec<TouchRow>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub questions: Vec<RawQuestion>,
    #[serde(default)]
    pub assessment: Option<RawAssessment>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub evaluations: Vec<RawEvaluation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuestion {
    pub id: QuestionId,
    #[serde(default, alias = "title", deserialize_with = "nullable_default")]
    pub text: LocalizedText,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: Option<u32>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub options: Vec<RawOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOption {
    pub id: OptionId,
    #[serde(default, alias = "title", deserialize_with = "nullable_default")]
    pub text: LocalizedText,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: Option<u32>,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub user_answers: Vec<TouchRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvaluation {
    pub id: EvaluationId,
    #[serde(default, deserialize_with = "nullable_default")]
    pub title: LocalizedText,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: Option<u32>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub user_evaluations: Vec<RatingRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAssessment {
    pub id: AssessmentId,
    #[serde(default, deserialize_with = "nullable_default")]
    pub title: LocalizedText,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub user_assessments: Vec<RatingRow>,
}

//
// ─── MODULE SHAPE ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawModule {
    pub id: ModuleId,
    #[serde(default, deserialize_with = "nullable_default")]
    pub title: LocalizedText,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: Option<u32>,
    #[serde(default)]
    pub skills: Option<RawSkill>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub module_steps: Vec<RawModuleStep>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub user_modules: Vec<TouchRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawModuleStep {
    pub id: ModuleStepId,
    #[serde(default, deserialize_with = "nullable_default")]
    pub title: LocalizedText,
    #[serde(rename = "type", default, deserialize_with = "nullable_default")]
    pub kind: String,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: Option<u32>,
    #[serde(default, alias = "content")]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub module_questions: Vec<RawModuleQuestion>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub module_skill_evaluations: Vec<RawModuleSkillEvaluation>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub module_subskill_evaluations: Vec<RawModuleSubskillEvaluation>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub user_module_steps: Vec<TouchRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawModuleQuestion {
    pub id: ModuleQuestionId,
    #[serde(default, alias = "title", deserialize_with = "nullable_default")]
    pub text: LocalizedText,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: Option<u32>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub user_answers: Vec<AnswerRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawModuleSkillEvaluation {
    pub id: SkillEvaluationId,
    #[serde(default)]
    pub skill_id: Option<SkillId>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub user_skill_evaluations: Vec<RatingRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawModuleSubskillEvaluation {
    pub id: SubskillEvaluationId,
    pub subskill_id: SubskillId,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: Option<u32>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub user_subskill_evaluations: Vec<RatingRow>,
}

//
// ─── LOCAL MARKER RECORDING ───────────────────────────────────────────────────
//
// Optimistic edits write markers into the raw row and re-project, so derived
// fields are always recomputed from markers. Each mutator returns `false`
// without touching the row when its target does not exist.
//

impl RawCourse {
    /// Record the enrollment marker. Idempotent.
    pub fn record_enrollment(&mut self, at: DateTime<Utc>) {
        if self.user_courses.is_empty() {
            self.user_courses.push(TouchRow::at(at));
        }
    }

    pub fn record_lesson_touch(&mut self, lesson_id: LessonId, at: DateTime<Utc>) -> bool {
        let Some(lesson) = self.lessons.iter_mut().find(|l| l.id == lesson_id) else {
            return false;
        };
        if lesson.user_lessons.is_empty() {
            lesson.user_lessons.push(TouchRow::at(at));
        }
        true
    }

    /// Select `option_ids`, replacing earlier answers of every question they belong to.
    ///
    /// Returns `false` (and records nothing) if any option is unknown.
    pub fn record_answers(&mut self, option_ids: &[OptionId], at: DateTime<Utc>) -> bool {
        let all_known = option_ids.iter().all(|id| {
            self.questions()
                .any(|q| q.options.iter().any(|o| o.id == *id))
        });
        if !all_known {
            return false;
        }

        for question in self.lessons.iter_mut().flat_map(|l| l.questions.iter_mut()) {
            let touched = question.options.iter().any(|o| option_ids.contains(&o.id));
            if !touched {
                continue;
            }
            for option in &mut question.options {
                option.user_answers = if option_ids.contains(&option.id) {
                    vec![TouchRow::at(at)]
                } else {
                    Vec::new()
                };
            }
        }
        true
    }

    pub fn record_evaluation(
        &mut self,
        evaluation_id: EvaluationId,
        value: f64,
        at: DateTime<Utc>,
    ) -> bool {
        let found = self
            .lessons
            .iter_mut()
            .flat_map(|l| l.evaluations.iter_mut())
            .find(|e| e.id == evaluation_id);
        match found {
            Some(evaluation) => {
                evaluation.user_evaluations = vec![RatingRow::new(value, at)];
                true
            }
            None => false,
        }
    }

    pub fn record_assessment(
        &mut self,
        assessment_id: AssessmentId,
        value: f64,
        at: DateTime<Utc>,
    ) -> bool {
        let found = self
            .lessons
            .iter_mut()
            .filter_map(|l| l.assessment.as_mut())
            .find(|a| a.id == assessment_id);
        match found {
            Some(assessment) => {
                assessment.user_assessments = vec![RatingRow::new(value, at)];
                true
            }
            None => false,
        }
    }

    /// Rate the skill attached to the course. Returns `false` if there is none.
    pub fn record_skill_assessment(&mut self, value: f64, at: DateTime<Utc>) -> bool {
        match self.skill.as_mut() {
            Some(skill) => {
                skill.user_assessments = vec![RatingRow::new(value, at)];
                true
            }
            None => false,
        }
    }

    /// Owning lesson of an option, if any.
    #[must_use]
    pub fn lesson_of_option(&self, option_id: OptionId) -> Option<LessonId> {
        self.lessons
            .iter()
            .find(|l| {
                l.questions
                    .iter()
                    .any(|q| q.options.iter().any(|o| o.id == option_id))
            })
            .map(|l| l.id)
    }

    fn questions(&self) -> impl Iterator<Item = &RawQuestion> {
        self.lessons.iter().flat_map(|l| l.questions.iter())
    }

    /// Copy of the content tree with every user relation removed.
    #[must_use]
    pub fn without_user_relations(&self) -> Self {
        let mut copy = self.clone();
        copy.user_courses.clear();
        if let Some(skill) = copy.skill.as_mut() {
            skill.user_assessments.clear();
        }
        for lesson in &mut copy.lessons {
            lesson.user_lessons.clear();
            for option in lesson.questions.iter_mut().flat_map(|q| q.options.iter_mut()) {
                option.user_answers.clear();
            }
            for evaluation in &mut lesson.evaluations {
                evaluation.user_evaluations.clear();
            }
            if let Some(assessment) = lesson.assessment.as_mut() {
                assessment.user_assessments.clear();
            }
        }
        copy
    }
}

impl RawModule {
    /// Record the enrollment marker. Idempotent.
    pub fn record_start(&mut self, at: DateTime<Utc>) {
        if self.user_modules.is_empty() {
            self.user_modules.push(TouchRow::at(at));
        }
    }

    pub fn record_step_touch(&mut self, step_id: ModuleStepId, at: DateTime<Utc>) -> bool {
        let Some(step) = self.module_steps.iter_mut().find(|s| s.id == step_id) else {
            return false;
        };
        if step.user_module_steps.is_empty() {
            step.user_module_steps.push(TouchRow::at(at));
        }
        true
    }

    pub fn record_answer(
        &mut self,
        question_id: ModuleQuestionId,
        answer: &str,
        at: DateTime<Utc>,
    ) -> bool {
        let found = self
            .module_steps
            .iter_mut()
            .flat_map(|s| s.module_questions.iter_mut())
            .find(|q| q.id == question_id);
        match found {
            Some(question) => {
                question.user_answers = vec![AnswerRow::new(answer, at)];
                true
            }
            None => false,
        }
    }

    pub fn record_skill_evaluation(
        &mut self,
        evaluation_id: SkillEvaluationId,
        value: f64,
        at: DateTime<Utc>,
    ) -> bool {
        let found = self
            .module_steps
            .iter_mut()
            .flat_map(|s| s.module_skill_evaluations.iter_mut())
            .find(|e| e.id == evaluation_id);
        match found {
            Some(evaluation) => {
                evaluation.user_skill_evaluations = vec![RatingRow::new(value, at)];
                true
            }
            None => false,
        }
    }

    pub fn record_subskill_evaluation(
        &mut self,
        evaluation_id: SubskillEvaluationId,
        value: f64,
        at: DateTime<Utc>,
    ) -> bool {
        let found = self
            .module_steps
            .iter_mut()
            .flat_map(|s| s.module_subskill_evaluations.iter_mut())
            .find(|e| e.id == evaluation_id);
        match found {
            Some(evaluation) => {
                evaluation.user_subskill_evaluations = vec![RatingRow::new(value, at)];
                true
            }
            None => false,
        }
    }

    /// Copy of the content tree with every user relation removed.
    #[must_use]
    pub fn without_user_relations(&self) -> Self {
        let mut copy = self.clone();
        copy.user_modules.clear();
        if let Some(skill) = copy.skills.as_mut() {
            skill.user_assessments.clear();
        }
        for step in &mut copy.module_steps {
            step.user_module_steps.clear();
            for question in &mut step.module_questions {
                question.user_answers.clear();
            }
            for evaluation in &mut step.module_skill_evaluations {
                evaluation.user_skill_evaluations.clear();
            }
            for evaluation in &mut step.module_subskill_evaluations {
                evaluation.user_subskill_evaluations.clear();
            }
        }
        copy
    }
}
