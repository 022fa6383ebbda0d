//! Raw query rows → view model.
//!
//! Every function here is a pure function of its input. Join arrays are
//! collapsed through [`crate::model::markers`], children are ordered by
//! `sort_order` (stable, unordered items last) and step completion plus
//! unit progress are derived on the way out.

use crate::model::markers::{first_answer, first_value, is_present};
use crate::model::{
    AnswerOption, Assessment, Course, Creator, Evaluation, Lesson, LessonContent, Module,
    ModuleQuestion, ModuleStep, ModuleStepContent, Question, RawAssessment, RawCourse, RawCreator,
    RawEvaluation, RawLesson, RawModule, RawModuleQuestion, RawModuleSkillEvaluation,
    RawModuleStep, RawModuleSubskillEvaluation, RawOption, RawQuestion, RawSkill, RawSubskill,
    Skill, SkillEvaluation, StepType, Subskill, SubskillEvaluation,
};
use crate::completion::is_step_complete;
use crate::progress::{course_status, module_status, StepProgress};

fn ordered<T>(items: &[T], sort_order: impl Fn(&T) -> Option<u32>) -> Vec<&T> {
    let mut refs: Vec<&T> = items.iter().collect();
    refs.sort_by_key(|item| {
        let order = sort_order(*item);
        (order.is_none(), order)
    });
    refs
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

#[must_use]
pub fn project_course(raw: &RawCourse) -> Course {
    let lessons: Vec<Lesson> = ordered(&raw.lessons, |l| l.sort_order)
        .into_iter()
        .map(project_lesson)
        .collect();
    let progress = StepProgress::from_steps(&lessons);

    Course {
        id: raw.id,
        slug: raw.slug.clone(),
        title: raw.title.clone(),
        description: raw.description.clone(),
        kind: raw.kind.clone(),
        sort_order: raw.sort_order,
        enrolled: is_present(&raw.user_courses),
        skill: raw.skill.as_ref().map(project_skill),
        creator: raw.creator.as_ref().map(project_creator),
        lessons,
        completed_lessons: progress.completed,
        total_lessons: progress.total,
        progress: progress.percent,
        completed: progress.is_completed(),
        status: course_status(progress.percent),
        client: Default::default(),
    }
}

#[must_use]
pub fn project_lesson(raw: &RawLesson) -> Lesson {
    let content = match StepType::from_tag(&raw.kind) {
        StepType::Reading => LessonContent::Reading,
        StepType::Questions => LessonContent::Questions(
            ordered(&raw.questions, |q| q.sort_order)
                .into_iter()
                .map(project_question)
                .collect(),
        ),
        StepType::Evaluations => LessonContent::Evaluations(
            ordered(&raw.evaluations, |e| e.sort_order)
                .into_iter()
                .map(project_evaluation)
                .collect(),
        ),
        StepType::Assessment => {
            LessonContent::Assessment(raw.assessment.as_ref().map(project_assessment))
        }
        StepType::Unknown(tag) => LessonContent::Unknown(tag),
    };

    let mut lesson = Lesson {
        id: raw.id,
        title: raw.title.clone(),
        description: raw.description.clone(),
        sort_order: raw.sort_order,
        body: raw.body.clone(),
        touched: is_present(&raw.user_lessons),
        content,
        completed: false,
    };
    lesson.completed = is_step_complete(&lesson);
    lesson
}

#[must_use]
pub fn project_question(raw: &RawQuestion) -> Question {
    let options: Vec<AnswerOption> = ordered(&raw.options, |o| o.sort_order)
        .into_iter()
        .map(project_option)
        .collect();
    Question {
        id: raw.id,
        text: raw.text.clone(),
        sort_order: raw.sort_order,
        answered: options.iter().any(|o| o.is_user_answer),
        options,
    }
}

#[must_use]
pub fn project_option(raw: &RawOption) -> AnswerOption {
    AnswerOption {
        id: raw.id,
        text: raw.text.clone(),
        sort_order: raw.sort_order,
        is_correct: raw.is_correct,
        is_user_answer: is_present(&raw.user_answers),
    }
}

#[must_use]
pub fn project_evaluation(raw: &RawEvaluation) -> Evaluation {
    Evaluation {
        id: raw.id,
        title: raw.title.clone(),
        sort_order: raw.sort_order,
        user_rating: first_value(&raw.user_evaluations),
    }
}

#[must_use]
pub fn project_assessment(raw: &RawAssessment) -> Assessment {
    Assessment {
        id: raw.id,
        title: raw.title.clone(),
        user_rating: first_value(&raw.user_assessments),
    }
}

#[must_use]
pub fn project_skill(raw: &RawSkill) -> Skill {
    Skill {
        id: raw.id,
        title: raw.title.clone(),
        subskills: ordered(&raw.subskills, |s| s.sort_order)
            .into_iter()
            .map(project_subskill)
            .collect(),
        user_rating: first_value(&raw.user_assessments),
    }
}

#[must_use]
pub fn project_subskill(raw: &RawSubskill) -> Subskill {
    Subskill {
        id: raw.id,
        title: raw.title.clone(),
        sort_order: raw.sort_order,
    }
}

#[must_use]
pub fn project_creator(raw: &RawCreator) -> Creator {
    Creator {
        id: raw.id,
        name: raw.name.clone(),
        avatar_url: raw.avatar_url.clone(),
    }
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

#[must_use]
pub fn project_module(raw: &RawModule) -> Module {
    let steps: Vec<ModuleStep> = ordered(&raw.module_steps, |s| s.sort_order)
        .into_iter()
        .map(project_module_step)
        .collect();
    let progress = StepProgress::from_steps(&steps);
    let enrolled = is_present(&raw.user_modules);

    Module {
        id: raw.id,
        title: raw.title.clone(),
        description: raw.description.clone(),
        sort_order: raw.sort_order,
        enrolled,
        skill: raw.skills.as_ref().map(project_skill),
        steps,
        completed_steps: progress.completed,
        total_steps: progress.total,
        progress: progress.percent,
        completed: progress.is_completed(),
        status: module_status(progress.completed, progress.total, enrolled),
        client: Default::default(),
    }
}

#[must_use]
pub fn project_module_step(raw: &RawModuleStep) -> ModuleStep {
    let content = match StepType::from_tag(&raw.kind) {
        StepType::Reading => ModuleStepContent::Reading,
        StepType::Questions => ModuleStepContent::Questions(
            ordered(&raw.module_questions, |q| q.sort_order)
                .into_iter()
                .map(project_module_question)
                .collect(),
        ),
        StepType::Evaluations => ModuleStepContent::Evaluations(
            ordered(&raw.module_subskill_evaluations, |e| e.sort_order)
                .into_iter()
                .map(project_subskill_evaluation)
                .collect(),
        ),
        StepType::Assessment => ModuleStepContent::Assessment(
            raw.module_skill_evaluations
                .first()
                .map(project_skill_evaluation),
        ),
        StepType::Unknown(tag) => ModuleStepContent::Unknown(tag),
    };

    let mut step = ModuleStep {
        id: raw.id,
        title: raw.title.clone(),
        sort_order: raw.sort_order,
        body: raw.body.clone(),
        touched: is_present(&raw.user_module_steps),
        content,
        completed: false,
    };
    step.completed = is_step_complete(&step);
    step
}

#[must_use]
pub fn project_module_question(raw: &RawModuleQuestion) -> ModuleQuestion {
    ModuleQuestion {
        id: raw.id,
        text: raw.text.clone(),
        sort_order: raw.sort_order,
        user_answer: first_answer(&raw.user_answers),
        answered: is_present(&raw.user_answers),
    }
}

#[must_use]
pub fn project_skill_evaluation(raw: &RawModuleSkillEvaluation) -> SkillEvaluation {
    SkillEvaluation {
        id: raw.id,
        skill_id: raw.skill_id,
        user_rating: first_value(&raw.user_skill_evaluations),
    }
}

#[must_use]
pub fn project_subskill_evaluation(raw: &RawModuleSubskillEvaluation) -> SubskillEvaluation {
    SubskillEvaluation {
        id: raw.id,
        subskill_id: raw.subskill_id,
        sort_order: raw.sort_order,
        user_rating: first_value(&raw.user_subskill_evaluations),
    }
}
