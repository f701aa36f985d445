//! Error types for data processor domain validation and parsing.

use super::{TaskExecutionId, TaskExecutionState};
use std::error::Error as StdError;
use thiserror::Error;

/// Errors returned while constructing or mutating task execution values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskExecutionDomainError {
    /// The task name is empty after trimming.
    #[error("task name must not be empty")]
    EmptyTaskName,

    /// The task name exceeds the 256-character storage limit.
    #[error("task name exceeds 256 character limit: {0}")]
    TaskNameTooLong(String),

    /// The execution is not in a state that allows the requested transition.
    #[error("invalid task execution transition for {id}: {from} -> {to}")]
    InvalidStateTransition {
        /// Execution identifier.
        id: TaskExecutionId,
        /// Current execution state.
        from: TaskExecutionState,
        /// Requested target state.
        to: TaskExecutionState,
    },
}

/// Error returned while parsing task types from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task type: {0}")]
pub struct ParseTaskTypeError(pub String);

/// Error returned while parsing execution states from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task execution state: {0}")]
pub struct ParseTaskExecutionStateError(pub String);

/// Renders an error and every error in its `source()` chain.
///
/// The output is what gets stored in a failed execution's `error` column, so
/// it keeps the whole chain rather than only the outermost message.
#[must_use]
pub fn render_error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        rendered.push_str("\ncaused by: ");
        rendered.push_str(&cause.to_string());
        current = cause.source();
    }
    rendered
}
