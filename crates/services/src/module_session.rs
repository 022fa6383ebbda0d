//! Optimistic progress edits on one module.

use std::future::Future;
use std::sync::Arc;

use course_core::model::{
    Module, ModuleStepId, Rating, RawModule, SkillEvaluationId, SubskillEvaluationId, UserId,
};
use course_core::{project_module, Clock};
use storage::repository::{ModuleAnswer, ProgressRepository, StorageError};
use tracing::debug;

use crate::dispatch::{Operation, PersistDispatcher};
use crate::error::SessionError;
use crate::optimistic::{Applied, Projected, ProjectedCell};

pub type ModuleSnapshot = Projected<RawModule, Module>;

pub struct ModuleSession {
    user: UserId,
    clock: Clock,
    state: ProjectedCell<RawModule, Module>,
    progress: Arc<dyn ProgressRepository>,
    dispatcher: PersistDispatcher,
}

impl ModuleSession {
    #[must_use]
    pub fn new(
        user: UserId,
        raw: RawModule,
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        dispatcher: PersistDispatcher,
    ) -> Self {
        Self {
            user,
            clock,
            state: ProjectedCell::new(raw, project_module),
            progress,
            dispatcher,
        }
    }

    #[must_use]
    pub fn user(&self) -> UserId {
        self.user
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<ModuleSnapshot> {
        self.state.current()
    }

    #[must_use]
    pub fn module(&self) -> Module {
        self.state.current().view().clone()
    }

    pub fn refresh(&self, raw: RawModule) -> Arc<ModuleSnapshot> {
        self.state.reset(raw)
    }

    /// Enroll in the module. A module with unfinished steps moves to in progress.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Dispatch` if the persistence call cannot be spawned.
    pub fn start(&self) -> Result<Applied<ModuleSnapshot>, SessionError> {
        let at = self.clock.now();
        let snapshot = self.state.record(|raw| -> Result<(), SessionError> {
            raw.record_start(at);
            Ok(())
        })?;

        let module = snapshot.raw().id;
        let (progress, user) = (Arc::clone(&self.progress), self.user);
        self.finish(snapshot, Operation::StartModule, async move {
            progress.start_module(user, module).await
        })
    }

    /// # Errors
    ///
    /// Returns `SessionError::UnknownStep` if the step is not part of the module.
    pub fn complete_step(&self, step: ModuleStepId) -> Result<Applied<ModuleSnapshot>, SessionError> {
        let at = self.clock.now();
        let snapshot = self.state.record(|raw| {
            if raw.record_step_touch(step, at) {
                Ok(())
            } else {
                Err(SessionError::UnknownStep(step))
            }
        })?;

        let (progress, user) = (Arc::clone(&self.progress), self.user);
        self.finish(snapshot, Operation::CompleteModuleStep, async move {
            progress.complete_module_step(user, step).await
        })
    }

    /// Store free-text answers; a new answer replaces the previous one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownModuleQuestion` if any question is foreign;
    /// nothing is recorded then.
    pub fn answer(&self, answers: &[ModuleAnswer]) -> Result<Applied<ModuleSnapshot>, SessionError> {
        let at = self.clock.now();
        let snapshot = self.state.record(|raw| {
            for answer in answers {
                if !raw.record_answer(answer.question_id, &answer.answer, at) {
                    return Err(SessionError::UnknownModuleQuestion(answer.question_id));
                }
            }
            Ok(())
        })?;

        let answers = answers.to_vec();
        let (progress, user) = (Arc::clone(&self.progress), self.user);
        self.finish(snapshot, Operation::SubmitModuleAnswers, async move {
            progress.submit_module_answers(user, &answers).await
        })
    }

    /// # Errors
    ///
    /// Returns `SessionError::Rating` for an invalid value and
    /// `SessionError::UnknownSkillEvaluation` for a foreign evaluation.
    pub fn rate_skill_evaluation(
        &self,
        evaluation: SkillEvaluationId,
        value: f64,
    ) -> Result<Applied<ModuleSnapshot>, SessionError> {
        let rating = Rating::new(evaluation, value)?;
        let at = self.clock.now();
        let snapshot = self.state.record(|raw| {
            if raw.record_skill_evaluation(evaluation, rating.value(), at) {
                Ok(())
            } else {
                Err(SessionError::UnknownSkillEvaluation(evaluation))
            }
        })?;

        let (progress, user) = (Arc::clone(&self.progress), self.user);
        self.finish(snapshot, Operation::SubmitSkillEvaluation, async move {
            progress.submit_skill_evaluation(user, rating).await
        })
    }

    /// Rate subskills, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rating` for an invalid value and
    /// `SessionError::UnknownSubskillEvaluation` for a foreign evaluation.
    pub fn rate_subskill_evaluations(
        &self,
        ratings: &[(SubskillEvaluationId, f64)],
    ) -> Result<Applied<ModuleSnapshot>, SessionError> {
        let ratings = ratings
            .iter()
            .map(|&(id, value)| Rating::new(id, value))
            .collect::<Result<Vec<_>, _>>()?;
        let at = self.clock.now();
        let snapshot = self.state.record(|raw| {
            for rating in &ratings {
                if !raw.record_subskill_evaluation(rating.id(), rating.value(), at) {
                    return Err(SessionError::UnknownSubskillEvaluation(rating.id()));
                }
            }
            Ok(())
        })?;

        let (progress, user) = (Arc::clone(&self.progress), self.user);
        self.finish(snapshot, Operation::SubmitSubskillEvaluations, async move {
            progress.submit_subskill_evaluations(user, &ratings).await
        })
    }

    fn finish<F>(
        &self,
        snapshot: Arc<ModuleSnapshot>,
        operation: Operation,
        call: F,
    ) -> Result<Applied<ModuleSnapshot>, SessionError>
    where
        F: Future<Output = Result<(), StorageError>> + Send + 'static,
    {
        let view = snapshot.view();
        debug!(
            user = %self.user,
            module = %view.id,
            %operation,
            completed_steps = view.completed_steps,
            status = %view.status,
            "applied module edit locally"
        );
        let dispatched = self.dispatcher.dispatch(operation, call)?;
        Ok(Applied {
            snapshot,
            dispatched,
        })
    }
}
