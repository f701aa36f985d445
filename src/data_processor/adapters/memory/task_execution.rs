//! In-memory repository for task execution records.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::data_processor::{
    domain::{TaskExecution, TaskExecutionKey, TaskExecutionState, TaskName, TaskType},
    ports::{
        TaskExecutionRepository, TaskExecutionRepositoryError, TaskExecutionRepositoryResult,
    },
};

/// Thread-safe in-memory task execution repository.
///
/// Enforces the same uniqueness rules as the `PostgreSQL` schema: one row per
/// run key and at most one succeeded row per task.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskExecutionRepository {
    state: Arc<RwLock<InMemoryExecutionState>>,
}

#[derive(Debug, Default)]
struct InMemoryExecutionState {
    executions: HashMap<TaskExecutionKey, TaskExecution>,
}

impl InMemoryTaskExecutionRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every stored execution, ordered by run then
    /// start time.
    ///
    /// # Errors
    ///
    /// Returns [`TaskExecutionRepositoryError::Persistence`] when the lock is
    /// poisoned.
    pub fn snapshot(&self) -> TaskExecutionRepositoryResult<Vec<TaskExecution>> {
        let state = self.read()?;
        let mut executions: Vec<TaskExecution> = state.executions.values().cloned().collect();
        sort_chronologically(&mut executions);
        Ok(executions)
    }

    fn read(&self) -> TaskExecutionRepositoryResult<RwLockReadGuard<'_, InMemoryExecutionState>> {
        self.state.read().map_err(|err| {
            TaskExecutionRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(
        &self,
    ) -> TaskExecutionRepositoryResult<RwLockWriteGuard<'_, InMemoryExecutionState>> {
        self.state.write().map_err(|err| {
            TaskExecutionRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

fn sort_chronologically(executions: &mut [TaskExecution]) {
    executions.sort_by(|left, right| {
        left.run_start_time()
            .cmp(&right.run_start_time())
            .then_with(|| left.started_at().cmp(&right.started_at()))
            .then_with(|| left.name().cmp(right.name()))
    });
}

fn has_other_success(state: &InMemoryExecutionState, execution: &TaskExecution) -> bool {
    state.executions.values().any(|stored| {
        stored.id() != execution.id()
            && stored.name() == execution.name()
            && stored.task_type() == execution.task_type()
            && stored.state() == TaskExecutionState::Succeeded
    })
}

#[async_trait]
impl TaskExecutionRepository for InMemoryTaskExecutionRepository {
    async fn insert(&self, execution: &TaskExecution) -> TaskExecutionRepositoryResult<()> {
        let mut state = self.write()?;
        if state.executions.contains_key(execution.key()) {
            return Err(TaskExecutionRepositoryError::DuplicateExecution(
                execution.key().clone(),
            ));
        }
        if execution.state() == TaskExecutionState::Succeeded
            && has_other_success(&state, execution)
        {
            return Err(TaskExecutionRepositoryError::DuplicateSuccess {
                name: execution.name().clone(),
                task_type: execution.task_type(),
            });
        }
        state
            .executions
            .insert(execution.key().clone(), execution.clone());
        Ok(())
    }

    async fn complete(&self, execution: &TaskExecution) -> TaskExecutionRepositoryResult<()> {
        let mut state = self.write()?;
        let key = execution.key();
        let stored_state = state
            .executions
            .get(key)
            .ok_or_else(|| TaskExecutionRepositoryError::NotFound(key.clone()))?
            .state();
        if stored_state != TaskExecutionState::Started {
            return Err(TaskExecutionRepositoryError::NotStarted(key.clone()));
        }
        if execution.state() == TaskExecutionState::Succeeded
            && has_other_success(&state, execution)
        {
            return Err(TaskExecutionRepositoryError::DuplicateSuccess {
                name: execution.name().clone(),
                task_type: execution.task_type(),
            });
        }
        state.executions.insert(key.clone(), execution.clone());
        Ok(())
    }

    async fn find_by_key(
        &self,
        key: &TaskExecutionKey,
    ) -> TaskExecutionRepositoryResult<Option<TaskExecution>> {
        let state = self.read()?;
        Ok(state.executions.get(key).cloned())
    }

    async fn succeeded_names(
        &self,
        task_type: TaskType,
    ) -> TaskExecutionRepositoryResult<HashSet<TaskName>> {
        let state = self.read()?;
        Ok(state
            .executions
            .values()
            .filter(|execution| {
                execution.task_type() == task_type
                    && execution.state() == TaskExecutionState::Succeeded
            })
            .map(|execution| execution.name().clone())
            .collect())
    }

    async fn list_by_task(
        &self,
        name: &TaskName,
        task_type: TaskType,
    ) -> TaskExecutionRepositoryResult<Vec<TaskExecution>> {
        let state = self.read()?;
        let mut executions: Vec<TaskExecution> = state
            .executions
            .values()
            .filter(|execution| execution.name() == name && execution.task_type() == task_type)
            .cloned()
            .collect();
        sort_chronologically(&mut executions);
        Ok(executions)
    }
}
