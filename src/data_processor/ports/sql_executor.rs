//! Port for running raw SQL on behalf of SQL fixtures.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for SQL executor operations.
pub type SqlExecutorResult<T> = Result<T, SqlExecutorError>;

/// Executes fixture scripts against the application database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Executes a script that may contain several statements.
    ///
    /// The script either applies completely or not at all.
    ///
    /// # Errors
    ///
    /// Returns [`SqlExecutorError`] when the script fails.
    async fn execute_script(&self, script: &str) -> SqlExecutorResult<()>;

    /// Evaluates a boolean probe query.
    ///
    /// A `NULL` result counts as `false`.
    ///
    /// # Errors
    ///
    /// Returns [`SqlExecutorError`] when the probe fails.
    async fn query_flag(&self, probe: &str) -> SqlExecutorResult<bool>;
}

/// Errors returned by SQL executors.
#[derive(Debug, Clone, Error)]
pub enum SqlExecutorError {
    /// The database rejected the statement.
    #[error("statement failed: {0}")]
    Statement(Arc<dyn std::error::Error + Send + Sync>),

    /// No connection could be obtained.
    #[error("connection error: {0}")]
    Connection(Arc<dyn std::error::Error + Send + Sync>),
}

impl SqlExecutorError {
    /// Wraps a statement failure.
    pub fn statement(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Statement(Arc::new(err))
    }

    /// Wraps a connection failure.
    pub fn connection(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connection(Arc::new(err))
    }
}
