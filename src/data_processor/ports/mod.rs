//! Port contracts for the data processor.
//!
//! Ports define infrastructure-agnostic interfaces used by the record store
//! and by SQL fixtures.

pub mod repository;
pub mod sql_executor;

pub use repository::{
    TaskExecutionRepository, TaskExecutionRepositoryError, TaskExecutionRepositoryResult,
};
pub use sql_executor::{SqlExecutor, SqlExecutorError, SqlExecutorResult};

#[cfg(test)]
pub use repository::MockTaskExecutionRepository;
#[cfg(test)]
pub use sql_executor::MockSqlExecutor;
