//! Identifier and validated scalar types for the data processor domain.

use super::TaskExecutionDomainError;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a persisted task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskExecutionId(Uuid);

impl TaskExecutionId {
    /// Creates a new random execution identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an execution identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for TaskExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable, validated name of a fixture or seed.
///
/// Names are unique within a task type and double as the dependency
/// identifiers other descriptors refer to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskName(String);

impl TaskName {
    /// Maximum length accepted by the `task_executions.name` column.
    pub const MAX_LENGTH: usize = 256;

    /// Creates a validated task name.
    ///
    /// # Errors
    ///
    /// Returns [`TaskExecutionDomainError::EmptyTaskName`] when the value is
    /// blank, or [`TaskExecutionDomainError::TaskNameTooLong`] when it does
    /// not fit the storage column.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskExecutionDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TaskExecutionDomainError::EmptyTaskName);
        }
        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(TaskExecutionDomainError::TaskNameTooLong(raw));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TaskName {
    type Error = TaskExecutionDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskName> for String {
    fn from(value: TaskName) -> Self {
        value.0
    }
}

/// Start timestamp of one data processor job run.
///
/// Every execution recorded during the run carries the same value, which is
/// what makes `(run_start_time, name, task_type)` a usable lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunStartTime(DateTime<Utc>);

impl RunStartTime {
    /// Creates a run start time, truncated to storage precision.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self(to_storage_precision(timestamp))
    }

    /// Returns the wrapped timestamp.
    #[must_use]
    pub const fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for RunStartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Name of the deployment environment the process is running in.
///
/// Fixture environment lists are compared against this value exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentEnvironment(String);

impl DeploymentEnvironment {
    const DEVELOPMENT: &'static str = "Development";
    const TESTING: &'static str = "Testing";
    const STAGING: &'static str = "Staging";
    const PRODUCTION: &'static str = "Production";

    /// Creates an environment name, trimming surrounding whitespace.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        let raw = value.into();
        Self(raw.trim().to_owned())
    }

    /// The `Development` environment.
    #[must_use]
    pub fn development() -> Self {
        Self(Self::DEVELOPMENT.to_owned())
    }

    /// The `Testing` environment.
    #[must_use]
    pub fn testing() -> Self {
        Self(Self::TESTING.to_owned())
    }

    /// The `Staging` environment.
    #[must_use]
    pub fn staging() -> Self {
        Self(Self::STAGING.to_owned())
    }

    /// The `Production` environment.
    #[must_use]
    pub fn production() -> Self {
        Self(Self::PRODUCTION.to_owned())
    }

    /// Every non-production environment, the usual target of SQL fixtures.
    #[must_use]
    pub fn non_production() -> Vec<Self> {
        vec![Self::development(), Self::testing(), Self::staging()]
    }

    /// Returns the environment name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Truncates a timestamp to the microsecond precision of `timestamptz`.
#[must_use]
pub(crate) fn to_storage_precision(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(6)
}
