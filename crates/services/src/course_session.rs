//! Optimistic progress edits on one course.
//!
//! Every edit is recorded in the local raw row, the course is projected again,
//! and only then is the matching persistence call dispatched.

use std::future::Future;
use std::sync::Arc;

use course_core::model::{
    AssessmentId, Course, EvaluationId, LessonId, OptionId, Rating, RawCourse, UserId,
};
use course_core::{project_course, Clock};
use storage::repository::{ProgressRepository, StorageError};
use tracing::debug;

use crate::dispatch::{Operation, PersistDispatcher};
use crate::error::SessionError;
use crate::optimistic::{Applied, Projected, ProjectedCell};

pub type CourseSnapshot = Projected<RawCourse, Course>;

pub struct CourseSession {
    user: UserId,
    clock: Clock,
    state: ProjectedCell<RawCourse, Course>,
    progress: Arc<dyn ProgressRepository>,
    dispatcher: PersistDispatcher,
}

impl CourseSession {
    #[must_use]
    pub fn new(
        user: UserId,
        raw: RawCourse,
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        dispatcher: PersistDispatcher,
    ) -> Self {
        Self {
            user,
            clock,
            state: ProjectedCell::new(raw, project_course),
            progress,
            dispatcher,
        }
    }

    #[must_use]
    pub fn user(&self) -> UserId {
        self.user
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<CourseSnapshot> {
        self.state.current()
    }

    /// Current projected course.
    #[must_use]
    pub fn course(&self) -> Course {
        self.state.current().view().clone()
    }

    /// Swap in a freshly fetched row; pending calls are unaffected.
    pub fn refresh(&self, raw: RawCourse) -> Arc<CourseSnapshot> {
        self.state.reset(raw)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Dispatch` if the persistence call cannot be spawned.
    pub fn enroll(&self) -> Result<Applied<CourseSnapshot>, SessionError> {
        let at = self.clock.now();
        let snapshot = self.state.record(|raw| -> Result<(), SessionError> {
            raw.record_enrollment(at);
            Ok(())
        })?;

        let course = snapshot.raw().id;
        let (progress, user) = (Arc::clone(&self.progress), self.user);
        self.finish(snapshot, Operation::EnrollCourse, async move {
            progress.enroll_course(user, course).await
        })
    }

    /// Mark a lesson as reached.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownLesson` if the lesson is not part of the course.
    pub fn complete_lesson(&self, lesson: LessonId) -> Result<Applied<CourseSnapshot>, SessionError> {
        let at = self.clock.now();
        let snapshot = self.state.record(|raw| {
            if raw.record_lesson_touch(lesson, at) {
                Ok(())
            } else {
                Err(SessionError::UnknownLesson(lesson))
            }
        })?;

        let (progress, user) = (Arc::clone(&self.progress), self.user);
        self.finish(snapshot, Operation::CompleteLesson, async move {
            progress.complete_lesson(user, lesson).await
        })
    }

    /// Select options; earlier answers of the same questions are replaced.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownOption` for the first option that is not
    /// part of the course; nothing is recorded then.
    pub fn answer(&self, options: &[OptionId]) -> Result<Applied<CourseSnapshot>, SessionError> {
        let at = self.clock.now();
        let snapshot = self.state.record(|raw| {
            if let Some(unknown) = options
                .iter()
                .find(|id| raw.lesson_of_option(**id).is_none())
            {
                return Err(SessionError::UnknownOption(*unknown));
            }
            raw.record_answers(options, at);
            Ok(())
        })?;

        let options = options.to_vec();
        let (progress, user) = (Arc::clone(&self.progress), self.user);
        self.finish(snapshot, Operation::SubmitAnswers, async move {
            progress.submit_answers(user, &options).await
        })
    }

    /// Rate evaluations, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rating` for an invalid value and
    /// `SessionError::UnknownEvaluation` for a foreign evaluation.
    pub fn rate_evaluations(
        &self,
        ratings: &[(EvaluationId, f64)],
    ) -> Result<Applied<CourseSnapshot>, SessionError> {
        let ratings = ratings
            .iter()
            .map(|&(id, value)| Rating::new(id, value))
            .collect::<Result<Vec<_>, _>>()?;
        let at = self.clock.now();
        let snapshot = self.state.record(|raw| {
            for rating in &ratings {
                if !raw.record_evaluation(rating.id(), rating.value(), at) {
                    return Err(SessionError::UnknownEvaluation(rating.id()));
                }
            }
            Ok(())
        })?;

        let (progress, user) = (Arc::clone(&self.progress), self.user);
        self.finish(snapshot, Operation::SubmitEvaluations, async move {
            progress.submit_evaluations(user, &ratings).await
        })
    }

    /// # Errors
    ///
    /// Returns `SessionError::Rating` for an invalid value and
    /// `SessionError::UnknownAssessment` for a foreign assessment.
    pub fn rate_assessment(
        &self,
        assessment: AssessmentId,
        value: f64,
    ) -> Result<Applied<CourseSnapshot>, SessionError> {
        let rating = Rating::new(assessment, value)?;
        let at = self.clock.now();
        let snapshot = self.state.record(|raw| {
            if raw.record_assessment(assessment, rating.value(), at) {
                Ok(())
            } else {
                Err(SessionError::UnknownAssessment(assessment))
            }
        })?;

        let (progress, user) = (Arc::clone(&self.progress), self.user);
        self.finish(snapshot, Operation::SubmitAssessment, async move {
            progress.submit_assessment(user, rating).await
        })
    }

    /// Rate the skill the course trains.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MissingSkill` if the course has no skill.
    pub fn rate_skill(&self, value: f64) -> Result<Applied<CourseSnapshot>, SessionError> {
        let skill = self
            .state
            .current()
            .raw()
            .skill
            .as_ref()
            .map(|s| s.id)
            .ok_or(SessionError::MissingSkill)?;
        let rating = Rating::new(skill, value)?;
        let at = self.clock.now();
        let snapshot = self.state.record(|raw| {
            if raw.record_skill_assessment(rating.value(), at) {
                Ok(())
            } else {
                Err(SessionError::MissingSkill)
            }
        })?;

        let (progress, user) = (Arc::clone(&self.progress), self.user);
        self.finish(snapshot, Operation::SubmitSkillAssessment, async move {
            progress.submit_skill_assessment(user, rating).await
        })
    }

    fn finish<F>(
        &self,
        snapshot: Arc<CourseSnapshot>,
        operation: Operation,
        call: F,
    ) -> Result<Applied<CourseSnapshot>, SessionError>
    where
        F: Future<Output = Result<(), StorageError>> + Send + 'static,
    {
        let view = snapshot.view();
        debug!(
            user = %self.user,
            course = %view.id,
            %operation,
            progress = view.progress,
            status = %view.status,
            "applied course edit locally"
        );
        let dispatched = self.dispatcher.dispatch(operation, call)?;
        Ok(Applied {
            snapshot,
            dispatched,
        })
    }
}
