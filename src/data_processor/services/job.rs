//! Once-per-process orchestration of the fixture and seed runners.

use super::{
    record_store::TaskRecordStore,
    runner::{RunContext, RunReport, TaskRunner, TaskRunnerResult},
};
use crate::data_processor::{
    domain::{DeploymentEnvironment, RunStartTime, TaskRegistry},
    ports::TaskExecutionRepository,
};
use mockable::Clock;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Progress of a [`DataProcessorJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// `start` has not been called.
    NotStarted,
    /// The fixture runner is executing.
    RunningFixtures,
    /// The seed runner is executing.
    RunningSeeds,
    /// Both runners have finished.
    Done,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "not_started",
            Self::RunningFixtures => "running_fixtures",
            Self::RunningSeeds => "running_seeds",
            Self::Done => "done",
        };
        f.write_str(label)
    }
}

/// How a single runner invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunnerOutcome {
    /// The runner processed every descriptor.
    Completed(RunReport),
    /// The runner aborted; the message was logged.
    Failed {
        /// Rendered runner error.
        error: String,
    },
}

impl RunnerOutcome {
    /// Returns the report when the runner completed.
    #[must_use]
    pub const fn report(&self) -> Option<&RunReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Failed { .. } => None,
        }
    }
}

/// Summary of one job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    /// Run start time shared by every execution recorded in the run.
    pub run_start_time: RunStartTime,
    /// Fixture runner outcome.
    pub fixtures: RunnerOutcome,
    /// Seed runner outcome.
    pub seeds: RunnerOutcome,
}

/// Errors returned by [`DataProcessorJob`].
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum JobError {
    /// `start` was already called on this job.
    #[error("data processor job already started (phase: {0})")]
    AlreadyStarted(JobPhase),
}

/// Applies fixtures then seeds, once per process start.
///
/// Runner-level failures are logged and swallowed, so the host process never
/// waits on task success.
pub struct DataProcessorJob<R, C>
where
    R: TaskExecutionRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    registry: Arc<TaskRegistry>,
    environment: DeploymentEnvironment,
    phase: Mutex<JobPhase>,
}

impl<R, C> DataProcessorJob<R, C>
where
    R: TaskExecutionRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a job over the given registry and environment.
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        clock: Arc<C>,
        registry: Arc<TaskRegistry>,
        environment: DeploymentEnvironment,
    ) -> Self {
        Self {
            repository,
            clock,
            registry,
            environment,
            phase: Mutex::new(JobPhase::NotStarted),
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> JobPhase {
        *self
            .phase
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Runs fixtures and then seeds within one fresh run.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::AlreadyStarted`] when called more than once.
    /// Runner failures are reported in the returned [`JobReport`] instead.
    pub async fn start(&self) -> Result<JobReport, JobError> {
        self.claim_start()?;

        let run_start_time = RunStartTime::new(self.clock.utc());
        let context = RunContext::new(run_start_time, self.environment.clone());
        let store = TaskRecordStore::new(Arc::clone(&self.repository), Arc::clone(&self.clock));
        let runner = TaskRunner::new(store);
        info!(%run_start_time, environment = %self.environment, "data processor job started");
        if self.registry.is_empty() {
            warn!("no fixtures or seeds are registered");
        }

        let fixtures = settle(
            "fixture",
            runner.run_fixtures(&self.registry, &context).await,
        );
        self.set_phase(JobPhase::RunningSeeds);
        let seeds = settle("seed", runner.run_seeds(&self.registry, &context).await);
        self.set_phase(JobPhase::Done);

        info!(%run_start_time, "data processor job finished");
        Ok(JobReport {
            run_start_time,
            fixtures,
            seeds,
        })
    }

    /// Starts the job on a background Tokio task.
    #[must_use]
    pub fn spawn(self: Arc<Self>) -> JoinHandle<Result<JobReport, JobError>> {
        tokio::spawn(async move { self.start().await })
    }

    fn claim_start(&self) -> Result<(), JobError> {
        let mut phase = self
            .phase
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if *phase != JobPhase::NotStarted {
            return Err(JobError::AlreadyStarted(*phase));
        }
        *phase = JobPhase::RunningFixtures;
        Ok(())
    }

    fn set_phase(&self, next: JobPhase) {
        *self
            .phase
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = next;
    }
}

fn settle(runner: &str, result: TaskRunnerResult<RunReport>) -> RunnerOutcome {
    match result {
        Ok(report) => RunnerOutcome::Completed(report),
        Err(err) => {
            error!(runner, error = %err, "task runner aborted");
            RunnerOutcome::Failed {
                error: err.to_string(),
            }
        }
    }
}
