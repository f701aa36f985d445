//! Applies the registered fixtures and seeds to a `PostgreSQL` database once.
//!
//! Usage:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/app GROUNDWORK_ENVIRONMENT=Development groundwork
//! ```
//!
//! Optional variables: `GROUNDWORK_FIXTURE_ROOT` (directory searched for SQL
//! fixture scripts), `GROUNDWORK_LOG_FORMAT` (`pretty` or `json`) and
//! `RUST_LOG`.

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use groundwork::data_processor::{
    adapters::postgres::{DataProcessorPgPool, PostgresSqlExecutor, PostgresTaskExecutionRepository},
    domain::{DeploymentEnvironment, Seed, TaskActionResult, TaskMetadata, TaskRegistry, TaskRegistryError},
    fixtures::SqlFixture,
    ports::TaskExecutionRepositoryError,
    services::{DataProcessorJob, JobError, RunnerOutcome},
    settings::{DataProcessorSettings, SettingsError},
};
use groundwork::telemetry::init_logging;
use mockable::DefaultClock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
enum HostError {
    #[error("configuration error: {0}")]
    Settings(#[from] SettingsError),
    #[error("failed to build connection pool: {0}")]
    Pool(#[source] diesel::r2d2::PoolError),
    #[error("failed to prepare task execution schema: {0}")]
    Schema(#[from] TaskExecutionRepositoryError),
    #[error("failed to register tasks: {0}")]
    Registry(#[from] TaskRegistryError),
    #[error("data processor job did not run: {0}")]
    Job(#[from] JobError),
    #[error("data processor job panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Seed that only reports that it ran.
struct ExampleSeed;

#[async_trait]
impl Seed for ExampleSeed {
    fn metadata(&self) -> TaskMetadata {
        TaskMetadata::new("ExampleSeed")
    }

    async fn seed(&self) -> TaskActionResult {
        info!("example seed applied");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    run().await.map_err(Into::into)
}

async fn run() -> Result<(), HostError> {
    let settings = DataProcessorSettings::from_env()?;
    if !init_logging(settings.log_format) {
        warn!("tracing subscriber already installed");
    }

    let pool = build_pool(settings.database_url.clone()).await?;
    let repository = Arc::new(PostgresTaskExecutionRepository::new(pool.clone()));
    repository.ensure_schema().await?;

    let executor = Arc::new(PostgresSqlExecutor::new(pool));
    let mut registry = TaskRegistry::new();
    registry
        .register_fixture(
            SqlFixture::new("ExampleSqlFixture", executor, settings.fixture_root.clone())
                .for_environments([DeploymentEnvironment::development()]),
        )?
        .register_seed(ExampleSeed)?;

    let job = Arc::new(DataProcessorJob::new(
        repository,
        Arc::new(DefaultClock),
        Arc::new(registry),
        settings.environment.clone(),
    ));
    let report = job.spawn().await??;

    for (runner, outcome) in [("fixtures", &report.fixtures), ("seeds", &report.seeds)] {
        match outcome {
            RunnerOutcome::Completed(summary) => info!(
                runner,
                succeeded = summary.succeeded.len(),
                failed = summary.failed.len(),
                already_completed = summary.already_completed.len(),
                skipped_for_environment = summary.skipped_for_environment.len(),
                "runner summary"
            ),
            RunnerOutcome::Failed { error } => warn!(runner, %error, "runner aborted"),
        }
    }
    Ok(())
}

async fn build_pool(database_url: String) -> Result<DataProcessorPgPool, HostError> {
    tokio::task::spawn_blocking(move || {
        Pool::builder()
            .max_size(4)
            .build(ConnectionManager::<PgConnection>::new(database_url))
            .map_err(HostError::Pool)
    })
    .await?
}
