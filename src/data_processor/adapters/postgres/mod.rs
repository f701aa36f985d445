//! `PostgreSQL` adapters for the data processor.

mod models;
mod schema;
mod sql_executor;
mod task_execution;

pub use sql_executor::PostgresSqlExecutor;
pub use task_execution::{DataProcessorPgPool, PostgresTaskExecutionRepository};
