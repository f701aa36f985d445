//! In-memory adapters for the data processor.

mod sql_executor;
mod task_execution;

pub use sql_executor::InMemorySqlExecutor;
pub use task_execution::InMemoryTaskExecutionRepository;
