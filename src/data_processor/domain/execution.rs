//! Task execution aggregate root and related lifecycle types.

use super::{
    ParseTaskExecutionStateError, ParseTaskTypeError, RunStartTime, TaskExecutionDomainError,
    TaskExecutionId, TaskName, ids::to_storage_precision,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of one-time work a descriptor performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Environment-scoped bootstrap action, usually a SQL script.
    Fixture,
    /// Environment-agnostic data seeding action.
    Seed,
}

impl TaskType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fixture => "fixture",
            Self::Seed => "seed",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskType {
    type Error = ParseTaskTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "fixture" => Ok(Self::Fixture),
            "seed" => Ok(Self::Seed),
            _ => Err(ParseTaskTypeError(value.to_owned())),
        }
    }
}

/// Lifecycle state of a task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskExecutionState {
    /// The action is about to run or is running.
    Started,
    /// The action completed without error.
    Succeeded,
    /// The action returned an error or panicked.
    Failed,
}

impl TaskExecutionState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Returns whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Started, Self::Succeeded | Self::Failed)
        )
    }
}

impl fmt::Display for TaskExecutionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskExecutionState {
    type Error = ParseTaskExecutionStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "started" => Ok(Self::Started),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseTaskExecutionStateError(value.to_owned())),
        }
    }
}

/// Composite key identifying one attempt of one task within one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskExecutionKey {
    name: TaskName,
    task_type: TaskType,
    run_start_time: RunStartTime,
}

impl TaskExecutionKey {
    /// Creates a key for the named task within the given run.
    #[must_use]
    pub const fn new(name: TaskName, task_type: TaskType, run_start_time: RunStartTime) -> Self {
        Self {
            name,
            task_type,
            run_start_time,
        }
    }

    /// Returns the task name.
    #[must_use]
    pub const fn name(&self) -> &TaskName {
        &self.name
    }

    /// Returns the task type.
    #[must_use]
    pub const fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// Returns the run the attempt belongs to.
    #[must_use]
    pub const fn run_start_time(&self) -> RunStartTime {
        self.run_start_time
    }
}

impl fmt::Display for TaskExecutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' in run {}",
            self.task_type, self.name, self.run_start_time
        )
    }
}

/// One recorded attempt at running a fixture or seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskExecution {
    id: TaskExecutionId,
    key: TaskExecutionKey,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    state: TaskExecutionState,
    error: Option<String>,
}

/// Parameter object for reconstructing a persisted task execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskExecutionData {
    /// Persisted execution identifier.
    pub id: TaskExecutionId,
    /// Persisted task name.
    pub name: TaskName,
    /// Persisted task type.
    pub task_type: TaskType,
    /// Persisted run start time.
    pub run_start_time: RunStartTime,
    /// Persisted start timestamp.
    pub started_at: DateTime<Utc>,
    /// Persisted end timestamp, if the execution reached a terminal state.
    pub ended_at: Option<DateTime<Utc>>,
    /// Persisted lifecycle state.
    pub state: TaskExecutionState,
    /// Persisted failure diagnostics.
    pub error: Option<String>,
}

impl TaskExecution {
    /// Creates a `Started` execution for the given key.
    #[must_use]
    pub fn start(key: TaskExecutionKey, clock: &impl Clock) -> Self {
        Self {
            id: TaskExecutionId::new(),
            key,
            started_at: to_storage_precision(clock.utc()),
            ended_at: None,
            state: TaskExecutionState::Started,
            error: None,
        }
    }

    /// Reconstructs an execution from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskExecutionData) -> Self {
        Self {
            id: data.id,
            key: TaskExecutionKey::new(data.name, data.task_type, data.run_start_time),
            started_at: data.started_at,
            ended_at: data.ended_at,
            state: data.state,
            error: data.error,
        }
    }

    /// Returns the execution identifier.
    #[must_use]
    pub const fn id(&self) -> TaskExecutionId {
        self.id
    }

    /// Returns the composite lookup key.
    #[must_use]
    pub const fn key(&self) -> &TaskExecutionKey {
        &self.key
    }

    /// Returns the task name.
    #[must_use]
    pub const fn name(&self) -> &TaskName {
        self.key.name()
    }

    /// Returns the task type.
    #[must_use]
    pub const fn task_type(&self) -> TaskType {
        self.key.task_type()
    }

    /// Returns the run this execution belongs to.
    #[must_use]
    pub const fn run_start_time(&self) -> RunStartTime {
        self.key.run_start_time()
    }

    /// Returns when the action started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns when the action finished, if it has.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TaskExecutionState {
        self.state
    }

    /// Returns failure diagnostics; only present for failed executions.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Marks the execution as succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`TaskExecutionDomainError::InvalidStateTransition`] when the
    /// execution has already reached a terminal state.
    pub fn mark_succeeded(&mut self, clock: &impl Clock) -> Result<(), TaskExecutionDomainError> {
        self.finish(TaskExecutionState::Succeeded, clock)
    }

    /// Marks the execution as failed with the given diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`TaskExecutionDomainError::InvalidStateTransition`] when the
    /// execution has already reached a terminal state.
    pub fn mark_failed(
        &mut self,
        error: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), TaskExecutionDomainError> {
        self.finish(TaskExecutionState::Failed, clock)?;
        self.error = Some(error.into());
        Ok(())
    }

    fn finish(
        &mut self,
        target: TaskExecutionState,
        clock: &impl Clock,
    ) -> Result<(), TaskExecutionDomainError> {
        if !self.state.can_transition_to(target) {
            return Err(TaskExecutionDomainError::InvalidStateTransition {
                id: self.id,
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        self.ended_at = Some(to_storage_precision(clock.utc()));
        Ok(())
    }
}
