//! Fire-and-forget persistence after an optimistic local edit.
//!
//! The local state is already updated when a call is dispatched. A failed call
//! is logged and reported as a [`Notification`]; nothing is rolled back and
//! nothing is retried.

use std::fmt;
use std::future::Future;

use serde::Serialize;
use storage::repository::StorageError;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DispatchError;

/// Which outbound call a request carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Operation {
    EnrollCourse,
    CompleteLesson,
    SubmitAnswers,
    SubmitEvaluations,
    SubmitAssessment,
    SubmitSkillAssessment,
    StartModule,
    CompleteModuleStep,
    SubmitModuleAnswers,
    SubmitSkillEvaluation,
    SubmitSubskillEvaluations,
    ReorderCourses,
    ReorderModules,
}

impl Operation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::EnrollCourse => "enroll_course",
            Operation::CompleteLesson => "complete_lesson",
            Operation::SubmitAnswers => "submit_answers",
            Operation::SubmitEvaluations => "submit_evaluations",
            Operation::SubmitAssessment => "submit_assessment",
            Operation::SubmitSkillAssessment => "submit_skill_assessment",
            Operation::StartModule => "start_module",
            Operation::CompleteModuleStep => "complete_module_step",
            Operation::SubmitModuleAnswers => "submit_module_answers",
            Operation::SubmitSkillEvaluation => "submit_skill_evaluation",
            Operation::SubmitSubskillEvaluations => "submit_subskill_evaluations",
            Operation::ReorderCourses => "reorder_courses",
            Operation::ReorderModules => "reorder_modules",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persistence call that failed after its edit was applied locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub request_id: Uuid,
    pub operation: Operation,
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed (request {}): {}",
            self.operation, self.request_id, self.message
        )
    }
}

impl std::error::Error for Notification {}

/// Handle to a spawned persistence call.
///
/// Dropping it does not cancel the call.
#[derive(Debug)]
pub struct Dispatched {
    request_id: Uuid,
    operation: Operation,
    task: JoinHandle<Result<(), Notification>>,
}

impl Dispatched {
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Wait for the call to settle.
    ///
    /// # Errors
    ///
    /// Returns the failure `Notification` if the backend rejected the call or
    /// the task did not run to completion.
    pub async fn outcome(self) -> Result<(), Notification> {
        match self.task.await {
            Ok(result) => result,
            Err(join) => Err(Notification {
                request_id: self.request_id,
                operation: self.operation,
                message: join.to_string(),
            }),
        }
    }
}

/// Spawns persistence calls on the current tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct PersistDispatcher {
    notifications: Option<mpsc::UnboundedSender<Notification>>,
}

impl PersistDispatcher {
    /// Dispatcher that reports failures on the returned receiver.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                notifications: Some(tx),
            },
            rx,
        )
    }

    /// Dispatcher whose failures are only logged.
    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    /// Spawn `call` without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::NoRuntime` when called outside a tokio runtime.
    pub fn dispatch<F>(&self, operation: Operation, call: F) -> Result<Dispatched, DispatchError>
    where
        F: Future<Output = Result<(), StorageError>> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        let request_id = Uuid::new_v4();
        let notifications = self.notifications.clone();
        debug!(%request_id, %operation, "dispatching persistence call");

        let task = runtime.spawn(async move {
            match call.await {
                Ok(()) => {
                    debug!(%request_id, %operation, "persistence call succeeded");
                    Ok(())
                }
                Err(err) => {
                    warn!(%request_id, %operation, error = %err, "persistence call failed, local state kept");
                    let notification = Notification {
                        request_id,
                        operation,
                        message: err.to_string(),
                    };
                    if let Some(tx) = notifications {
                        // Receiver gone means nobody is listening anymore.
                        let _ = tx.send(notification.clone());
                    }
                    Err(notification)
                }
            }
        });

        Ok(Dispatched {
            request_id,
            operation,
            task,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_sends_no_notification() {
        let (dispatcher, mut rx) = PersistDispatcher::new();
        let dispatched = dispatcher
            .dispatch(Operation::EnrollCourse, async { Ok(()) })
            .unwrap();

        assert_eq!(dispatched.operation(), Operation::EnrollCourse);
        dispatched.outcome().await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failure_is_reported_with_request_id() {
        let (dispatcher, mut rx) = PersistDispatcher::new();
        let dispatched = dispatcher
            .dispatch(Operation::ReorderCourses, async {
                Err(StorageError::Connection("offline".into()))
            })
            .unwrap();
        let request_id = dispatched.request_id();

        let failure = dispatched.outcome().await.unwrap_err();
        assert_eq!(failure.request_id, request_id);
        assert_eq!(failure.operation, Operation::ReorderCourses);
        assert!(failure.message.contains("offline"));

        let notified = rx.recv().await.unwrap();
        assert_eq!(notified, failure);
    }

    #[tokio::test]
    async fn silent_dispatcher_still_returns_failure() {
        let dispatcher = PersistDispatcher::silent();
        let dispatched = dispatcher
            .dispatch(Operation::StartModule, async { Err(StorageError::NotFound) })
            .unwrap();
        assert!(dispatched.outcome().await.is_err());
    }

    #[test]
    fn dispatch_outside_runtime_is_an_error() {
        let dispatcher = PersistDispatcher::silent();
        let result = dispatcher.dispatch(Operation::EnrollCourse, async { Ok(()) });
        assert!(matches!(result, Err(DispatchError::NoRuntime)));
    }

    #[test]
    fn operation_names_are_snake_case() {
        assert_eq!(Operation::SubmitSubskillEvaluations.to_string(), "submit_subskill_evaluations");
        assert_eq!(
            serde_json::to_string(&Operation::ReorderModules).unwrap(),
            "\"reorder_modules\""
        );
    }
}
