//! Repository port for task execution records.

use crate::data_processor::domain::{TaskExecution, TaskExecutionKey, TaskName, TaskType};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task execution repository operations.
pub type TaskExecutionRepositoryResult<T> = Result<T, TaskExecutionRepositoryError>;

/// Task execution persistence contract.
///
/// Every call commits on its own; the store never holds a transaction open
/// across a task action.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskExecutionRepository: Send + Sync {
    /// Stores a new `Started` execution.
    ///
    /// # Errors
    ///
    /// Returns [`TaskExecutionRepositoryError::DuplicateExecution`] when an
    /// execution with the same key already exists.
    async fn insert(&self, execution: &TaskExecution) -> TaskExecutionRepositoryResult<()>;

    /// Persists a terminal transition of an execution that is still `Started`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskExecutionRepositoryError::NotFound`] when the execution
    /// does not exist, [`TaskExecutionRepositoryError::NotStarted`] when the
    /// stored row already left `Started`, and
    /// [`TaskExecutionRepositoryError::DuplicateSuccess`] when another
    /// execution of the same task already succeeded.
    async fn complete(&self, execution: &TaskExecution) -> TaskExecutionRepositoryResult<()>;

    /// Finds the execution recorded under `key`.
    ///
    /// Returns `None` when no execution matches.
    async fn find_by_key(
        &self,
        key: &TaskExecutionKey,
    ) -> TaskExecutionRepositoryResult<Option<TaskExecution>>;

    /// Returns names of tasks of `task_type` with a succeeded execution.
    async fn succeeded_names(
        &self,
        task_type: TaskType,
    ) -> TaskExecutionRepositoryResult<HashSet<TaskName>>;

    /// Returns every execution of one task, oldest run first.
    async fn list_by_task(
        &self,
        name: &TaskName,
        task_type: TaskType,
    ) -> TaskExecutionRepositoryResult<Vec<TaskExecution>>;
}

/// Errors returned by task execution repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskExecutionRepositoryError {
    /// An execution with the same run, name and type already exists.
    #[error("duplicate task execution: {0}")]
    DuplicateExecution(TaskExecutionKey),

    /// The task already has a succeeded execution.
    #[error("{task_type} '{name}' has already succeeded")]
    DuplicateSuccess {
        /// Task name.
        name: TaskName,
        /// Task type.
        task_type: TaskType,
    },

    /// No execution exists under the key.
    #[error("task execution not found: {0}")]
    NotFound(TaskExecutionKey),

    /// The stored execution is no longer `Started`.
    #[error("task execution is not in the started state: {0}")]
    NotStarted(TaskExecutionKey),

    /// A stored row could not be converted into a domain value.
    #[error("invalid persisted task execution: {0}")]
    InvalidPersistedData(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskExecutionRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
