//! Shared test helpers for `PostgreSQL` integration tests.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use groundwork::data_processor::{
    adapters::postgres::{DataProcessorPgPool, PostgresSqlExecutor, PostgresTaskExecutionRepository},
    domain::RunStartTime,
};
pub use pg_embedded_setup_unpriv::test_support::shared_test_cluster;
use pg_embedded_setup_unpriv::{BootstrapError, TemporaryDatabase, TestCluster};
use rstest::fixture;
use std::io;
use std::sync::Arc;
use tokio::runtime::Runtime;
use uuid::Uuid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// SQL creating the task execution schema.
pub const CREATE_TASK_EXECUTIONS_SQL: &str =
    include_str!("../../migrations/2026-10-19-000000_create_task_executions/up.sql");

/// Template database name for pre-migrated schema.
pub const TEMPLATE_DB: &str = "groundwork_test_template";

/// Builds a Tokio runtime for driving async adapters from synchronous tests.
///
/// Tests stay synchronous because the shared cluster manages its own runtime.
#[fixture]
pub fn runtime() -> io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
}

/// Returns a run start time `offset` seconds after a fixed base.
#[must_use]
pub fn run_start(offset: i64) -> RunStartTime {
    let timestamp = chrono::DateTime::from_timestamp(1_767_225_600 + offset, 0)
        .expect("valid timestamp");
    RunStartTime::new(timestamp)
}

/// Ensures the template database exists with the schema applied.
///
/// # Errors
///
/// Returns an error if template creation or migration fails.
pub fn ensure_template(cluster: &TestCluster) -> Result<(), BoxError> {
    let connection = cluster.connection();
    cluster
        .ensure_template_exists(TEMPLATE_DB, move |db_name| {
            apply_migrations(&connection.database_url(db_name))
                .map_err(|err| BootstrapError::from(eyre::eyre!("{err}")))
        })
        .map_err(|err| Box::new(err) as BoxError)
}

fn apply_migrations(url: &str) -> Result<(), BoxError> {
    let mut conn = PgConnection::establish(url).map_err(|err| Box::new(err) as BoxError)?;
    conn.batch_execute(CREATE_TASK_EXECUTIONS_SQL)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(())
}

/// A migrated temporary database with adapters bound to it.
///
/// The pool is declared first so its connections close before the database
/// is dropped.
pub struct PreparedDatabase {
    /// Pool connected to the temporary database.
    pub pool: DataProcessorPgPool,
    /// Task execution repository.
    pub repository: Arc<PostgresTaskExecutionRepository>,
    /// SQL executor for fixture scripts.
    pub executor: Arc<PostgresSqlExecutor>,
    /// Temporary database created from the template.
    pub temp_db: TemporaryDatabase,
}

/// Creates a fresh database from the migrated template.
///
/// # Errors
///
/// Returns an error if template creation, database setup, or pool
/// construction fails.
#[fixture]
pub fn prepared_database(
    shared_test_cluster: &'static TestCluster,
) -> Result<PreparedDatabase, BoxError> {
    ensure_template(shared_test_cluster)?;
    let temp_db = shared_test_cluster
        .temporary_database_from_template(format!("groundwork_{}", Uuid::new_v4().simple()), TEMPLATE_DB)
        .map_err(|err| Box::new(err) as BoxError)?;

    let manager = ConnectionManager::<PgConnection>::new(temp_db.url());
    let pool = Pool::builder()
        .max_size(2)
        .build(manager)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(PreparedDatabase {
        repository: Arc::new(PostgresTaskExecutionRepository::new(pool.clone())),
        executor: Arc::new(PostgresSqlExecutor::new(pool.clone())),
        pool,
        temp_db,
    })
}
