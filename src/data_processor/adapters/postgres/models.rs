//! Diesel row models for task execution persistence.

use super::schema::task_executions;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for task executions.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_executions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskExecutionRow {
    /// Execution identifier.
    pub id: uuid::Uuid,
    /// Task type.
    pub task_type: String,
    /// Descriptor name.
    pub name: String,
    /// Run start time.
    pub run_start_time: DateTime<Utc>,
    /// Start timestamp.
    pub started_at: DateTime<Utc>,
    /// End timestamp.
    pub ended_at: Option<DateTime<Utc>>,
    /// Lifecycle state.
    pub state: String,
    /// Failure diagnostics.
    pub error: Option<String>,
}

/// Insert model for task executions.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_executions)]
pub struct NewTaskExecutionRow {
    /// Execution identifier.
    pub id: uuid::Uuid,
    /// Task type.
    pub task_type: String,
    /// Descriptor name.
    pub name: String,
    /// Run start time.
    pub run_start_time: DateTime<Utc>,
    /// Start timestamp.
    pub started_at: DateTime<Utc>,
    /// End timestamp.
    pub ended_at: Option<DateTime<Utc>>,
    /// Lifecycle state.
    pub state: String,
    /// Failure diagnostics.
    pub error: Option<String>,
}

/// Changeset applied when an execution reaches a terminal state.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = task_executions)]
#[diesel(treat_none_as_null = true)]
pub struct TaskExecutionCompletion {
    /// Terminal state.
    pub state: String,
    /// End timestamp.
    pub ended_at: Option<DateTime<Utc>>,
    /// Failure diagnostics.
    pub error: Option<String>,
}

/// Single boolean column returned by fixture probe queries.
#[derive(Debug, Clone, QueryableByName)]
pub struct FlagRow {
    /// Probe result.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Bool>)]
    pub flag: Option<bool>,
}
