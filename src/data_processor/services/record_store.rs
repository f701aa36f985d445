//! Service recording the start and outcome of every task execution.

use crate::data_processor::{
    domain::{
        TaskExecution, TaskExecutionDomainError, TaskExecutionKey, TaskName, TaskType,
    },
    ports::{TaskExecutionRepository, TaskExecutionRepositoryError},
};
use mockable::Clock;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by the task record store.
#[derive(Debug, Clone, Error)]
pub enum TaskRecordError {
    /// An execution for the key was already recorded in this run.
    #[error("task execution already recorded: {0}")]
    DuplicateTask(TaskExecutionKey),

    /// No execution was recorded for the key.
    #[error("no task execution recorded for {0}")]
    NotFound(TaskExecutionKey),

    /// The recorded execution does not allow the requested transition.
    #[error(transparent)]
    InvalidState(#[from] TaskExecutionDomainError),

    /// The repository failed.
    #[error(transparent)]
    Repository(TaskExecutionRepositoryError),
}

impl From<TaskExecutionRepositoryError> for TaskRecordError {
    fn from(err: TaskExecutionRepositoryError) -> Self {
        match err {
            TaskExecutionRepositoryError::DuplicateExecution(key) => Self::DuplicateTask(key),
            TaskExecutionRepositoryError::NotFound(key) => Self::NotFound(key),
            other => Self::Repository(other),
        }
    }
}

/// Result type for task record store operations.
pub type TaskRecordResult<T> = Result<T, TaskRecordError>;

/// Durable record of task executions.
///
/// Every call commits before returning, so a crash mid-run leaves at worst
/// one `Started` row behind. Such rows never block later runs.
#[derive(Clone)]
pub struct TaskRecordStore<R, C>
where
    R: TaskExecutionRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> TaskRecordStore<R, C>
where
    R: TaskExecutionRepository,
    C: Clock + Send + Sync,
{
    /// Creates a record store over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Returns names of tasks of `task_type` that have succeeded in any run.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRecordError::Repository`] when the lookup fails.
    pub async fn succeeded_names(&self, task_type: TaskType) -> TaskRecordResult<HashSet<TaskName>> {
        Ok(self.repository.succeeded_names(task_type).await?)
    }

    /// Records that the task identified by `key` is starting.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRecordError::DuplicateTask`] when the key was already
    /// recorded, or [`TaskRecordError::Repository`] on storage failure.
    pub async fn record_start(&self, key: TaskExecutionKey) -> TaskRecordResult<TaskExecution> {
        let execution = TaskExecution::start(key, &*self.clock);
        self.repository.insert(&execution).await?;
        Ok(execution)
    }

    /// Records that the task identified by `key` succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRecordError::NotFound`] when no start was recorded and
    /// [`TaskRecordError::InvalidState`] when the execution already finished.
    pub async fn record_success(&self, key: &TaskExecutionKey) -> TaskRecordResult<TaskExecution> {
        let mut execution = self.load(key).await?;
        execution.mark_succeeded(&*self.clock)?;
        self.persist_completion(&execution).await?;
        Ok(execution)
    }

    /// Records that the task identified by `key` failed with `error`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRecordError::NotFound`] when no start was recorded and
    /// [`TaskRecordError::InvalidState`] when the execution already finished.
    pub async fn record_failure(
        &self,
        key: &TaskExecutionKey,
        error: impl Into<String> + Send,
    ) -> TaskRecordResult<TaskExecution> {
        let mut execution = self.load(key).await?;
        execution.mark_failed(error, &*self.clock)?;
        self.persist_completion(&execution).await?;
        Ok(execution)
    }

    /// Returns every recorded execution of one task, oldest run first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRecordError::Repository`] when the lookup fails.
    pub async fn history(
        &self,
        name: &TaskName,
        task_type: TaskType,
    ) -> TaskRecordResult<Vec<TaskExecution>> {
        Ok(self.repository.list_by_task(name, task_type).await?)
    }

    async fn load(&self, key: &TaskExecutionKey) -> TaskRecordResult<TaskExecution> {
        self.repository
            .find_by_key(key)
            .await?
            .ok_or_else(|| TaskRecordError::NotFound(key.clone()))
    }

    async fn persist_completion(&self, execution: &TaskExecution) -> TaskRecordResult<()> {
        match self.repository.complete(execution).await {
            Ok(()) => Ok(()),
            // Another writer finished the row between our read and update.
            Err(TaskExecutionRepositoryError::NotStarted(_)) => {
                let stored = self.load(execution.key()).await?;
                Err(TaskExecutionDomainError::InvalidStateTransition {
                    id: stored.id(),
                    from: stored.state(),
                    to: execution.state(),
                }
                .into())
            }
            Err(err) => Err(err.into()),
        }
    }
}
