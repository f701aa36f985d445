//! `PostgreSQL` executor for SQL fixture scripts.

use super::{models::FlagRow, task_execution::DataProcessorPgPool};
use crate::data_processor::ports::{SqlExecutor, SqlExecutorError, SqlExecutorResult};
use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::Error as DieselError;

/// Runs fixture scripts on a pooled `PostgreSQL` connection.
#[derive(Debug, Clone)]
pub struct PostgresSqlExecutor {
    pool: DataProcessorPgPool,
}

impl PostgresSqlExecutor {
    /// Creates an executor from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: DataProcessorPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> SqlExecutorResult<T>
    where
        F: FnOnce(&mut PgConnection) -> SqlExecutorResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(SqlExecutorError::connection)?;
            f(&mut connection)
        })
        .await
        .map_err(SqlExecutorError::connection)?
    }
}

#[async_trait]
impl SqlExecutor for PostgresSqlExecutor {
    async fn execute_script(&self, script: &str) -> SqlExecutorResult<()> {
        let owned_script = script.to_owned();
        self.run_blocking(move |connection| {
            connection
                .transaction::<(), DieselError, _>(|tx| tx.batch_execute(&owned_script))
                .map_err(SqlExecutorError::statement)
        })
        .await
    }

    async fn query_flag(&self, probe: &str) -> SqlExecutorResult<bool> {
        let query = format!("SELECT ({probe}) AS flag");
        self.run_blocking(move |connection| {
            let row = diesel::sql_query(query)
                .get_result::<FlagRow>(connection)
                .optional()
                .map_err(SqlExecutorError::statement)?;
            Ok(row.and_then(|found| found.flag).unwrap_or(false))
        })
        .await
    }
}
