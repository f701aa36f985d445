//! `PostgreSQL` repository implementation for task execution records.

use super::{
    models::{NewTaskExecutionRow, TaskExecutionCompletion, TaskExecutionRow},
    schema::task_executions,
};
use crate::data_processor::{
    domain::{
        PersistedTaskExecutionData, RunStartTime, TaskExecution, TaskExecutionId,
        TaskExecutionKey, TaskExecutionState, TaskName, TaskType,
    },
    ports::{
        TaskExecutionRepository, TaskExecutionRepositoryError, TaskExecutionRepositoryResult,
    },
};
use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use std::collections::HashSet;

/// `PostgreSQL` connection pool type used by data processor adapters.
pub type DataProcessorPgPool = Pool<ConnectionManager<PgConnection>>;

/// Schema migration applied by [`PostgresTaskExecutionRepository::ensure_schema`].
const CREATE_TASK_EXECUTIONS_SQL: &str =
    include_str!("../../../../migrations/2026-10-19-000000_create_task_executions/up.sql");

const RUN_KEY_UNIQUE_INDEX: &str = "idx_task_executions_run_key_unique";
const SUCCEEDED_UNIQUE_INDEX: &str = "idx_task_executions_succeeded_unique";

/// `PostgreSQL`-backed task execution repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskExecutionRepository {
    pool: DataProcessorPgPool,
}

impl PostgresTaskExecutionRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: DataProcessorPgPool) -> Self {
        Self { pool }
    }

    /// Creates the `data_processor` schema, table and indexes when missing.
    ///
    /// # Errors
    ///
    /// Returns [`TaskExecutionRepositoryError::Persistence`] when the DDL
    /// cannot be applied.
    pub async fn ensure_schema(&self) -> TaskExecutionRepositoryResult<()> {
        self.run_blocking(|connection| {
            connection
                .batch_execute(CREATE_TASK_EXECUTIONS_SQL)
                .map_err(TaskExecutionRepositoryError::persistence)
        })
        .await
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskExecutionRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskExecutionRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool
                .get()
                .map_err(TaskExecutionRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskExecutionRepositoryError::persistence)?
    }
}

#[async_trait]
impl TaskExecutionRepository for PostgresTaskExecutionRepository {
    async fn insert(&self, execution: &TaskExecution) -> TaskExecutionRepositoryResult<()> {
        let key = execution.key().clone();
        let new_row = to_new_row(execution);

        self.run_blocking(move |connection| {
            diesel::insert_into(task_executions::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| map_unique_violation(err, &key))?;
            Ok(())
        })
        .await
    }

    async fn complete(&self, execution: &TaskExecution) -> TaskExecutionRepositoryResult<()> {
        let key = execution.key().clone();
        let completion = TaskExecutionCompletion {
            state: execution.state().as_str().to_owned(),
            ended_at: execution.ended_at(),
            error: execution.error().map(str::to_owned),
        };

        self.run_blocking(move |connection| {
            let updated = diesel::update(
                task_executions::table
                    .filter(key_filter(&key))
                    .filter(task_executions::state.eq(TaskExecutionState::Started.as_str())),
            )
            .set(&completion)
            .execute(connection)
            .map_err(|err| map_unique_violation(err, &key))?;

            if updated > 0 {
                return Ok(());
            }

            let exists = diesel::select(diesel::dsl::exists(
                task_executions::table.filter(key_filter(&key)),
            ))
            .get_result::<bool>(connection)
            .map_err(TaskExecutionRepositoryError::persistence)?;

            if exists {
                Err(TaskExecutionRepositoryError::NotStarted(key))
            } else {
                Err(TaskExecutionRepositoryError::NotFound(key))
            }
        })
        .await
    }

    async fn find_by_key(
        &self,
        key: &TaskExecutionKey,
    ) -> TaskExecutionRepositoryResult<Option<TaskExecution>> {
        let lookup_key = key.clone();
        self.run_blocking(move |connection| {
            let row = task_executions::table
                .filter(key_filter(&lookup_key))
                .select(TaskExecutionRow::as_select())
                .first::<TaskExecutionRow>(connection)
                .optional()
                .map_err(TaskExecutionRepositoryError::persistence)?;
            row.map(row_to_execution).transpose()
        })
        .await
    }

    async fn succeeded_names(
        &self,
        task_type: TaskType,
    ) -> TaskExecutionRepositoryResult<HashSet<TaskName>> {
        self.run_blocking(move |connection| {
            let names = task_executions::table
                .filter(task_executions::task_type.eq(task_type.as_str()))
                .filter(task_executions::state.eq(TaskExecutionState::Succeeded.as_str()))
                .select(task_executions::name)
                .load::<String>(connection)
                .map_err(TaskExecutionRepositoryError::persistence)?;
            names
                .into_iter()
                .map(|name| TaskName::new(name).map_err(invalid_data))
                .collect()
        })
        .await
    }

    async fn list_by_task(
        &self,
        name: &TaskName,
        task_type: TaskType,
    ) -> TaskExecutionRepositoryResult<Vec<TaskExecution>> {
        let lookup_name = name.as_str().to_owned();
        self.run_blocking(move |connection| {
            let rows = task_executions::table
                .filter(task_executions::name.eq(lookup_name))
                .filter(task_executions::task_type.eq(task_type.as_str()))
                .order((
                    task_executions::run_start_time.asc(),
                    task_executions::started_at.asc(),
                ))
                .select(TaskExecutionRow::as_select())
                .load::<TaskExecutionRow>(connection)
                .map_err(TaskExecutionRepositoryError::persistence)?;
            rows.into_iter().map(row_to_execution).collect()
        })
        .await
    }
}

type KeyFilter<'a> = diesel::dsl::And<
    diesel::dsl::And<
        diesel::dsl::Eq<task_executions::run_start_time, chrono::DateTime<chrono::Utc>>,
        diesel::dsl::Eq<task_executions::name, &'a str>,
    >,
    diesel::dsl::Eq<task_executions::task_type, &'static str>,
>;

fn key_filter(key: &TaskExecutionKey) -> KeyFilter<'_> {
    task_executions::run_start_time
        .eq(key.run_start_time().as_datetime())
        .and(task_executions::name.eq(key.name().as_str()))
        .and(task_executions::task_type.eq(key.task_type().as_str()))
}

fn map_unique_violation(err: DieselError, key: &TaskExecutionKey) -> TaskExecutionRepositoryError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
            if violates(info.as_ref(), SUCCEEDED_UNIQUE_INDEX) =>
        {
            TaskExecutionRepositoryError::DuplicateSuccess {
                name: key.name().clone(),
                task_type: key.task_type(),
            }
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
            if violates(info.as_ref(), RUN_KEY_UNIQUE_INDEX) =>
        {
            TaskExecutionRepositoryError::DuplicateExecution(key.clone())
        }
        _ => TaskExecutionRepositoryError::persistence(err),
    }
}

fn violates(info: &dyn DatabaseErrorInformation, constraint: &str) -> bool {
    info.constraint_name().is_some_and(|name| name == constraint)
}

fn to_new_row(execution: &TaskExecution) -> NewTaskExecutionRow {
    NewTaskExecutionRow {
        id: execution.id().into_inner(),
        task_type: execution.task_type().as_str().to_owned(),
        name: execution.name().as_str().to_owned(),
        run_start_time: execution.run_start_time().as_datetime(),
        started_at: execution.started_at(),
        ended_at: execution.ended_at(),
        state: execution.state().as_str().to_owned(),
        error: execution.error().map(str::to_owned),
    }
}

fn row_to_execution(row: TaskExecutionRow) -> TaskExecutionRepositoryResult<TaskExecution> {
    let TaskExecutionRow {
        id,
        task_type: persisted_task_type,
        name: persisted_name,
        run_start_time,
        started_at,
        ended_at,
        state: persisted_state,
        error,
    } = row;

    let task_type = TaskType::try_from(persisted_task_type.as_str()).map_err(invalid_data)?;
    let state = TaskExecutionState::try_from(persisted_state.as_str()).map_err(invalid_data)?;
    let name = TaskName::new(persisted_name).map_err(invalid_data)?;

    Ok(TaskExecution::from_persisted(PersistedTaskExecutionData {
        id: TaskExecutionId::from_uuid(id),
        name,
        task_type,
        run_start_time: RunStartTime::new(run_start_time),
        started_at,
        ended_at,
        state,
        error,
    }))
}

fn invalid_data(err: impl std::fmt::Display) -> TaskExecutionRepositoryError {
    TaskExecutionRepositoryError::InvalidPersistedData(err.to_string())
}
