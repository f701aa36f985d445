//! Dependency-ordered, run-once execution of fixtures and seeds.

use super::record_store::{TaskRecordError, TaskRecordStore};
use crate::data_processor::{
    domain::{
        DependencyResolutionError, DeploymentEnvironment, RunStartTime, TaskActionError,
        TaskDescriptor, TaskExecutionKey, TaskName, TaskRegistry, TaskType,
        order_by_dependencies,
    },
    ports::TaskExecutionRepository,
};
use mockable::Clock;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

/// Run-scoped inputs shared by every descriptor in one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    run_start_time: RunStartTime,
    environment: DeploymentEnvironment,
}

impl RunContext {
    /// Creates a context for the run that started at `run_start_time`.
    #[must_use]
    pub const fn new(run_start_time: RunStartTime, environment: DeploymentEnvironment) -> Self {
        Self {
            run_start_time,
            environment,
        }
    }

    /// Returns the run start time.
    #[must_use]
    pub const fn run_start_time(&self) -> RunStartTime {
        self.run_start_time
    }

    /// Returns the current deployment environment.
    #[must_use]
    pub const fn environment(&self) -> &DeploymentEnvironment {
        &self.environment
    }
}

/// Outcome of one runner invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Task type the runner processed.
    pub task_type: TaskType,
    /// Descriptors whose action succeeded in this run, in execution order.
    pub succeeded: Vec<TaskName>,
    /// Descriptors whose action failed in this run, in execution order.
    pub failed: Vec<TaskName>,
    /// Descriptors skipped because an earlier run already succeeded.
    pub already_completed: Vec<TaskName>,
    /// Fixtures skipped because they do not target the current environment.
    pub skipped_for_environment: Vec<TaskName>,
}

impl RunReport {
    const fn empty(task_type: TaskType) -> Self {
        Self {
            task_type,
            succeeded: Vec::new(),
            failed: Vec::new(),
            already_completed: Vec::new(),
            skipped_for_environment: Vec::new(),
        }
    }

    /// Returns how many actions were executed.
    #[must_use]
    pub fn executed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Errors that abort a whole runner invocation.
#[derive(Debug, Clone, Error)]
pub enum TaskRunnerError {
    /// The descriptors could not be ordered.
    #[error(transparent)]
    Resolution(#[from] DependencyResolutionError),

    /// The record store rejected an operation.
    #[error(transparent)]
    Record(#[from] TaskRecordError),
}

/// Result type for runner invocations.
pub type TaskRunnerResult<T> = Result<T, TaskRunnerError>;

/// Runs descriptors of one task type in dependency order, at most once
/// successfully across runs.
#[derive(Clone)]
pub struct TaskRunner<R, C>
where
    R: TaskExecutionRepository,
    C: Clock + Send + Sync,
{
    store: TaskRecordStore<R, C>,
}

impl<R, C> TaskRunner<R, C>
where
    R: TaskExecutionRepository,
    C: Clock + Send + Sync,
{
    /// Creates a runner that records executions in `store`.
    #[must_use]
    pub const fn new(store: TaskRecordStore<R, C>) -> Self {
        Self { store }
    }

    /// Returns the underlying record store.
    #[must_use]
    pub const fn store(&self) -> &TaskRecordStore<R, C> {
        &self.store
    }

    /// Runs every registered fixture that targets the current environment.
    ///
    /// # Errors
    ///
    /// See [`TaskRunner::run`].
    pub async fn run_fixtures(
        &self,
        registry: &TaskRegistry,
        context: &RunContext,
    ) -> TaskRunnerResult<RunReport> {
        self.run(
            TaskType::Fixture,
            registry.descriptors(TaskType::Fixture),
            context,
        )
        .await
    }

    /// Runs every registered seed.
    ///
    /// # Errors
    ///
    /// See [`TaskRunner::run`].
    pub async fn run_seeds(
        &self,
        registry: &TaskRegistry,
        context: &RunContext,
    ) -> TaskRunnerResult<RunReport> {
        self.run(TaskType::Seed, registry.descriptors(TaskType::Seed), context)
            .await
    }

    /// Runs `descriptors` of `task_type` in dependency order.
    ///
    /// The full registered set must be passed: ordering happens before the
    /// environment filter, and a dependency on an absent name is reported
    /// like a cycle. Descriptors of another task type are ignored.
    /// A failing action is recorded and the next descriptor runs anyway.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRunnerError::Resolution`] when the descriptors cannot be
    /// ordered, before any row is written, and [`TaskRunnerError::Record`]
    /// when the record store rejects an operation.
    pub async fn run(
        &self,
        task_type: TaskType,
        descriptors: &[TaskDescriptor],
        context: &RunContext,
    ) -> TaskRunnerResult<RunReport> {
        let candidates: Vec<TaskDescriptor> = descriptors
            .iter()
            .filter(|descriptor| descriptor.task_type() == task_type)
            .cloned()
            .collect();
        let ordered = order_by_dependencies(&candidates)?;
        let succeeded = self.store.succeeded_names(task_type).await?;

        let mut report = RunReport::empty(task_type);
        for descriptor in ordered {
            let name = descriptor.name();
            if !descriptor.applies_to(context.environment()) {
                debug!(%task_type, task = %name, environment = %context.environment(), "skipping task not targeted at this environment");
                report.skipped_for_environment.push(name.clone());
                continue;
            }
            if succeeded.contains(name) {
                debug!(%task_type, task = %name, "skipping task that already succeeded");
                report.already_completed.push(name.clone());
                continue;
            }

            let key = TaskExecutionKey::new(name.clone(), task_type, context.run_start_time());
            self.store.record_start(key.clone()).await?;
            match execute_contained(descriptor).await {
                Ok(()) => {
                    self.store.record_success(&key).await?;
                    info!(%task_type, task = %name, "task succeeded");
                    report.succeeded.push(name.clone());
                }
                Err(err) => {
                    let diagnostic = err.diagnostic();
                    error!(%task_type, task = %name, error = %diagnostic, "task failed");
                    self.store.record_failure(&key, diagnostic).await?;
                    report.failed.push(name.clone());
                }
            }
        }

        info!(
            %task_type,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            already_completed = report.already_completed.len(),
            skipped_for_environment = report.skipped_for_environment.len(),
            "task runner finished"
        );
        Ok(report)
    }
}

/// Runs the action on its own Tokio task so a panic becomes a failure.
async fn execute_contained(descriptor: &TaskDescriptor) -> Result<(), TaskActionError> {
    let owned = descriptor.clone();
    match tokio::spawn(async move { owned.execute().await }).await {
        Ok(result) => result,
        Err(join_error) if join_error.is_panic() => {
            Err(TaskActionError::Panicked(panic_message(join_error.into_panic())))
        }
        Err(_) => Err(TaskActionError::Aborted),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(other) => other.downcast_ref::<&str>().map_or_else(
            || "non-string panic payload".to_owned(),
            |message| (*message).to_owned(),
        ),
    }
}
