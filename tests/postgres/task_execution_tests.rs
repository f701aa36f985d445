//! Repository tests for [`PostgresTaskExecutionRepository`].

use crate::postgres::helpers::{BoxError, PreparedDatabase, prepared_database, run_start, runtime};
use chrono::{DateTime, Utc};
use groundwork::data_processor::{
    domain::{TaskExecution, TaskExecutionKey, TaskExecutionState, TaskName, TaskType},
    ports::{TaskExecutionRepository, TaskExecutionRepositoryError},
};
use mockable::DefaultClock;
use rstest::rstest;
use std::io;
use tokio::runtime::Runtime;

fn key(name: &str, task_type: TaskType, offset: i64) -> TaskExecutionKey {
    TaskExecutionKey::new(TaskName::new(name).expect("valid name"), task_type, run_start(offset))
}

fn succeeded(key: TaskExecutionKey) -> TaskExecution {
    let mut execution = TaskExecution::start(key, &DefaultClock);
    execution
        .mark_succeeded(&DefaultClock)
        .expect("started execution can succeed");
    execution
}

#[rstest]
fn insert_then_find_round_trips_every_column(
    runtime: io::Result<Runtime>,
    prepared_database: Result<PreparedDatabase, BoxError>,
) {
    let rt = runtime.expect("runtime");
    let db = prepared_database.expect("database");
    let execution_key = key("CreateLookupTables", TaskType::Fixture, 0);
    let mut execution = TaskExecution::start(execution_key.clone(), &DefaultClock);

    rt.block_on(db.repository.insert(&execution)).expect("insert");
    execution
        .mark_failed("relation \"lookup\" does not exist", &DefaultClock)
        .expect("fail");
    rt.block_on(db.repository.complete(&execution)).expect("complete");

    let found = rt
        .block_on(db.repository.find_by_key(&execution_key))
        .expect("lookup")
        .expect("row should exist");
    assert_eq!(found, execution);
    assert_eq!(found.error(), Some("relation \"lookup\" does not exist"));
}

#[rstest]
fn sub_microsecond_run_start_is_found_by_its_own_key(
    runtime: io::Result<Runtime>,
    prepared_database: Result<PreparedDatabase, BoxError>,
) {
    let rt = runtime.expect("runtime");
    let db = prepared_database.expect("database");
    let precise: DateTime<Utc> =
        DateTime::from_timestamp(1_767_225_600, 123_456_789).expect("valid timestamp");
    let execution_key = TaskExecutionKey::new(
        TaskName::new("PreciseSeed").expect("valid name"),
        TaskType::Seed,
        groundwork::data_processor::domain::RunStartTime::new(precise),
    );

    rt.block_on(db.repository.insert(&TaskExecution::start(execution_key.clone(), &DefaultClock)))
        .expect("insert");

    let found = rt
        .block_on(db.repository.find_by_key(&execution_key))
        .expect("lookup");
    assert!(found.is_some(), "truncated key should match the stored row");
}

#[rstest]
fn duplicate_run_key_is_rejected(
    runtime: io::Result<Runtime>,
    prepared_database: Result<PreparedDatabase, BoxError>,
) {
    let rt = runtime.expect("runtime");
    let db = prepared_database.expect("database");
    let execution_key = key("UsersSeed", TaskType::Seed, 0);

    rt.block_on(db.repository.insert(&TaskExecution::start(execution_key.clone(), &DefaultClock)))
        .expect("first insert");
    let result = rt.block_on(
        db.repository
            .insert(&TaskExecution::start(execution_key.clone(), &DefaultClock)),
    );

    assert!(
        matches!(result, Err(TaskExecutionRepositoryError::DuplicateExecution(ref dup)) if *dup == execution_key),
        "expected duplicate execution, got {result:?}"
    );
}

#[rstest]
fn same_name_may_be_used_by_fixture_and_seed(
    runtime: io::Result<Runtime>,
    prepared_database: Result<PreparedDatabase, BoxError>,
) {
    let rt = runtime.expect("runtime");
    let db = prepared_database.expect("database");

    rt.block_on(db.repository.insert(&succeeded(key("Shared", TaskType::Fixture, 0))))
        .expect("fixture insert");
    rt.block_on(db.repository.insert(&succeeded(key("Shared", TaskType::Seed, 0))))
        .expect("seed insert");

    let fixtures = rt
        .block_on(db.repository.succeeded_names(TaskType::Fixture))
        .expect("fixture names");
    let seeds = rt
        .block_on(db.repository.succeeded_names(TaskType::Seed))
        .expect("seed names");
    assert_eq!(fixtures.len(), 1);
    assert_eq!(seeds.len(), 1);
}

#[rstest]
fn second_success_for_a_task_is_rejected(
    runtime: io::Result<Runtime>,
    prepared_database: Result<PreparedDatabase, BoxError>,
) {
    let rt = runtime.expect("runtime");
    let db = prepared_database.expect("database");
    rt.block_on(db.repository.insert(&succeeded(key("UsersSeed", TaskType::Seed, 0))))
        .expect("first success");

    let later = TaskExecution::start(key("UsersSeed", TaskType::Seed, 60), &DefaultClock);
    rt.block_on(db.repository.insert(&later)).expect("later start");
    let mut later_done = later;
    later_done.mark_succeeded(&DefaultClock).expect("succeed");
    let result = rt.block_on(db.repository.complete(&later_done));

    assert!(
        matches!(
            result,
            Err(TaskExecutionRepositoryError::DuplicateSuccess { ref name, task_type: TaskType::Seed })
                if name.as_str() == "UsersSeed"
        ),
        "expected duplicate success, got {result:?}"
    );
}

#[rstest]
fn completing_a_missing_row_reports_not_found(
    runtime: io::Result<Runtime>,
    prepared_database: Result<PreparedDatabase, BoxError>,
) {
    let rt = runtime.expect("runtime");
    let db = prepared_database.expect("database");
    let execution = succeeded(key("Ghost", TaskType::Fixture, 0));

    let result = rt.block_on(db.repository.complete(&execution));

    assert!(matches!(result, Err(TaskExecutionRepositoryError::NotFound(_))));
}

#[rstest]
fn completing_a_finished_row_reports_not_started(
    runtime: io::Result<Runtime>,
    prepared_database: Result<PreparedDatabase, BoxError>,
) {
    let rt = runtime.expect("runtime");
    let db = prepared_database.expect("database");
    let execution = succeeded(key("AlreadyDone", TaskType::Fixture, 0));
    rt.block_on(db.repository.insert(&execution)).expect("insert");

    let result = rt.block_on(db.repository.complete(&execution));

    assert!(matches!(result, Err(TaskExecutionRepositoryError::NotStarted(_))));
}

#[rstest]
fn history_lists_runs_oldest_first(
    runtime: io::Result<Runtime>,
    prepared_database: Result<PreparedDatabase, BoxError>,
) {
    let rt = runtime.expect("runtime");
    let db = prepared_database.expect("database");
    for offset in [120, 0, 60] {
        let execution = TaskExecution::start(key("Flaky", TaskType::Seed, offset), &DefaultClock);
        rt.block_on(db.repository.insert(&execution)).expect("insert");
    }
    rt.block_on(db.repository.insert(&succeeded(key("Other", TaskType::Seed, 0))))
        .expect("unrelated insert");

    let history = rt
        .block_on(
            db.repository
                .list_by_task(&TaskName::new("Flaky").expect("valid name"), TaskType::Seed),
        )
        .expect("history");

    let runs: Vec<_> = history.iter().map(TaskExecution::run_start_time).collect();
    assert_eq!(runs, vec![run_start(0), run_start(60), run_start(120)]);
    assert!(
        history
            .iter()
            .all(|execution| execution.state() == TaskExecutionState::Started)
    );
}

#[rstest]
fn ensure_schema_is_idempotent(
    runtime: io::Result<Runtime>,
    prepared_database: Result<PreparedDatabase, BoxError>,
) {
    let rt = runtime.expect("runtime");
    let db = prepared_database.expect("database");

    rt.block_on(db.repository.ensure_schema()).expect("first ensure");
    rt.block_on(db.repository.ensure_schema()).expect("second ensure");
}
