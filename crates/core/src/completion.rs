//! Per-step completion predicate.

use crate::model::{Answerable, Rated, Step, StepContent};

/// Whether one lesson or module step counts as complete for the current user.
///
/// | content | complete when |
/// |---|---|
/// | reading | the touch marker exists |
/// | questions | at least one question, every question answered (correctness ignored) |
/// | evaluations | at least one item, every item rated |
/// | assessment | the single item exists and carries a rating |
/// | unknown | never |
///
/// A question or evaluation step without items has nothing to answer and
/// never completes.
#[must_use]
pub fn is_step_complete<S: Step + ?Sized>(step: &S) -> bool {
    match step.content() {
        StepContent::Reading => step.touched(),
        StepContent::Questions(questions) => {
            !questions.is_empty() && questions.iter().all(Answerable::is_answered)
        }
        StepContent::Evaluations(items) => !items.is_empty() && items.iter().all(Rated::is_rated),
        StepContent::Assessment(item) => item.as_ref().is_some_and(Rated::is_rated),
        StepContent::Unknown(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AnswerOption, Assessment, AssessmentId, Evaluation, EvaluationId, Lesson, LessonContent,
        LessonId, LocalizedText, ModuleQuestion, ModuleQuestionId, ModuleStep, ModuleStepContent,
        ModuleStepId, OptionId, Question, QuestionId, SkillEvaluation, SkillEvaluationId,
    };

    fn lesson(touched: bool, content: LessonContent) -> Lesson {
        Lesson {
            id: LessonId::new(1),
            title: LocalizedText::plain("L"),
            description: None,
            sort_order: Some(1),
            body: None,
            touched,
            content,
            completed: false,
        }
    }

    fn question(id: u64, selected: &[bool]) -> Question {
        let options: Vec<AnswerOption> = selected
            .iter()
            .enumerate()
            .map(|(i, picked)| AnswerOption {
                id: OptionId::new(id * 10 + i as u64),
                text: LocalizedText::plain("o"),
                sort_order: None,
                is_correct: Some(i == 0),
                is_user_answer: *picked,
            })
            .collect();
        Question {
            id: QuestionId::new(id),
            text: LocalizedText::plain("q"),
            sort_order: None,
            answered: options.iter().any(|o| o.is_user_answer),
            options,
        }
    }

    fn evaluation(id: u64, rating: Option<f64>) -> Evaluation {
        Evaluation {
            id: EvaluationId::new(id),
            title: LocalizedText::plain("e"),
            sort_order: None,
            user_rating: rating,
        }
    }

    #[test]
    fn reading_requires_touch_marker() {
        assert!(!is_step_complete(&lesson(false, LessonContent::Reading)));
        assert!(is_step_complete(&lesson(true, LessonContent::Reading)));
    }

    #[test]
    fn question_set_needs_every_question_answered() {
        let two_of_three = LessonContent::Questions(vec![
            question(1, &[true, false]),
            question(2, &[false, true]),
            question(3, &[false, false]),
        ]);
        assert!(!is_step_complete(&lesson(true, two_of_three)));

        // A wrong option still counts as an answer.
        let all_answered = LessonContent::Questions(vec![
            question(1, &[true, false]),
            question(2, &[false, true]),
            question(3, &[false, true]),
        ]);
        assert!(is_step_complete(&lesson(false, all_answered)));
    }

    #[test]
    fn evaluation_set_needs_every_rating() {
        let partial =
            LessonContent::Evaluations(vec![evaluation(1, Some(3.0)), evaluation(2, None)]);
        assert!(!is_step_complete(&lesson(true, partial)));

        let rated =
            LessonContent::Evaluations(vec![evaluation(1, Some(3.0)), evaluation(2, Some(0.0))]);
        assert!(is_step_complete(&lesson(false, rated)));
    }

    #[test]
    fn empty_item_sets_never_complete() {
        assert!(!is_step_complete(&lesson(false, LessonContent::Questions(vec![]))));
        assert!(!is_step_complete(&lesson(true, LessonContent::Questions(vec![]))));
        assert!(!is_step_complete(&lesson(true, LessonContent::Evaluations(vec![]))));
    }

    #[test]
    fn assessment_needs_a_rated_item() {
        assert!(!is_step_complete(&lesson(true, LessonContent::Assessment(None))));

        let unrated = Assessment {
            id: AssessmentId::new(1),
            title: LocalizedText::plain("a"),
            user_rating: None,
        };
        assert!(!is_step_complete(&lesson(
            true,
            LessonContent::Assessment(Some(unrated.clone()))
        )));

        let rated = Assessment {
            user_rating: Some(2.0),
            ..unrated
        };
        assert!(is_step_complete(&lesson(false, LessonContent::Assessment(Some(rated)))));
    }

    #[test]
    fn unknown_type_fails_closed_even_when_touched() {
        let step = lesson(true, LessonContent::Unknown("video".to_string()));
        assert!(!is_step_complete(&step));
    }

    #[test]
    fn classifier_is_pure_and_order_independent() {
        let steps = vec![
            lesson(true, LessonContent::Reading),
            lesson(false, LessonContent::Reading),
            lesson(true, LessonContent::Unknown("x".into())),
            lesson(false, LessonContent::Questions(vec![question(1, &[true])])),
        ];
        let forward: Vec<bool> = steps.iter().map(is_step_complete).collect();
        let mut backward: Vec<bool> = steps.iter().rev().map(is_step_complete).collect();
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(forward, steps.iter().map(is_step_complete).collect::<Vec<_>>());
        assert_eq!(forward, vec![true, false, false, true]);
    }

    #[test]
    fn module_steps_use_the_same_dispatch() {
        let step = |content: ModuleStepContent| ModuleStep {
            id: ModuleStepId::new(1),
            title: LocalizedText::plain("s"),
            sort_order: None,
            body: None,
            touched: false,
            content,
            completed: false,
        };

        let unanswered = ModuleQuestion {
            id: ModuleQuestionId::new(1),
            text: LocalizedText::plain("why?"),
            sort_order: None,
            user_answer: None,
            answered: false,
        };
        assert!(!is_step_complete(&step(ModuleStepContent::Questions(vec![
            unanswered
        ]))));

        let rated = SkillEvaluation {
            id: SkillEvaluationId::new(1),
            skill_id: None,
            user_rating: Some(4.0),
        };
        assert!(is_step_complete(&step(ModuleStepContent::Assessment(Some(rated)))));
        assert!(!is_step_complete(&step(ModuleStepContent::Reading)));
    }
}
