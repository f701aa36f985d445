//! Runner behaviour across simulated process restarts.

use std::sync::Arc;

use crate::in_memory::helpers::{
    Invocations, RecordingFixture, RecordingSeed, context, name, repository, runner,
};
use groundwork::data_processor::{
    adapters::memory::InMemoryTaskExecutionRepository,
    domain::{DependencyResolutionError, DeploymentEnvironment, TaskExecutionState, TaskRegistry, TaskType},
    services::TaskRunnerError,
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dependent_seeds_run_once_across_runs(repository: Arc<InMemoryTaskExecutionRepository>) {
    let invocations = Invocations::default();
    let mut registry = TaskRegistry::new();
    registry
        .register_seed(RecordingSeed::new("B", &invocations).after("A"))
        .expect("register B")
        .register_seed(RecordingSeed::new("A", &invocations))
        .expect("register A");
    let seed_runner = runner(&repository);

    let first = seed_runner
        .run_seeds(&registry, &context(0, DeploymentEnvironment::development()))
        .await
        .expect("first run");
    assert_eq!(first.succeeded, vec![name("A"), name("B")]);
    assert_eq!(invocations.names(), vec!["A", "B"]);

    invocations.clear();
    let second = seed_runner
        .run_seeds(&registry, &context(1, DeploymentEnvironment::development()))
        .await
        .expect("second run");

    assert!(invocations.names().is_empty());
    assert_eq!(second.already_completed, vec![name("A"), name("B")]);
    let rows = repository.snapshot().expect("snapshot");
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.state() == TaskExecutionState::Succeeded));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cycle_aborts_before_any_row_is_written(repository: Arc<InMemoryTaskExecutionRepository>) {
    let invocations = Invocations::default();
    let mut registry = TaskRegistry::new();
    registry
        .register_seed(RecordingSeed::new("X", &invocations).after("Y"))
        .expect("register X")
        .register_seed(RecordingSeed::new("Y", &invocations).after("X"))
        .expect("register Y");

    let result = runner(&repository)
        .run_seeds(&registry, &context(0, DeploymentEnvironment::development()))
        .await;

    assert!(matches!(
        result,
        Err(TaskRunnerError::Resolution(DependencyResolutionError::Unresolvable { .. }))
    ));
    assert!(invocations.names().is_empty());
    assert!(repository.snapshot().expect("snapshot").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn production_only_fixture_is_skipped_in_development(
    repository: Arc<InMemoryTaskExecutionRepository>,
) {
    let invocations = Invocations::default();
    let mut registry = TaskRegistry::new();
    registry
        .register_fixture(RecordingFixture::new(
            "F",
            vec![DeploymentEnvironment::production()],
            &invocations,
        ))
        .expect("register F");

    let report = runner(&repository)
        .run_fixtures(&registry, &context(0, DeploymentEnvironment::development()))
        .await
        .expect("run succeeds");

    assert_eq!(report.skipped_for_environment, vec![name("F")]);
    assert_eq!(report.executed(), 0);
    assert!(repository.snapshot().expect("snapshot").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_seed_is_attempted_again_next_run(repository: Arc<InMemoryTaskExecutionRepository>) {
    let invocations = Invocations::default();
    let mut registry = TaskRegistry::new();
    registry
        .register_seed(RecordingSeed::new("S", &invocations).failing(1))
        .expect("register S");
    let seed_runner = runner(&repository);

    let first = seed_runner
        .run_seeds(&registry, &context(0, DeploymentEnvironment::development()))
        .await
        .expect("first run");
    let second = seed_runner
        .run_seeds(&registry, &context(1, DeploymentEnvironment::development()))
        .await
        .expect("second run");

    assert_eq!(first.failed, vec![name("S")]);
    assert_eq!(second.succeeded, vec![name("S")]);
    let history = seed_runner
        .store()
        .history(&name("S"), TaskType::Seed)
        .await
        .expect("history");
    let [failed, retried] = history.as_slice() else {
        panic!("expected two executions, found {history:?}");
    };
    assert_eq!(failed.state(), TaskExecutionState::Failed);
    assert_eq!(failed.error(), Some("S hit a constraint violation"));
    assert_eq!(retried.state(), TaskExecutionState::Succeeded);
    assert_eq!(retried.error(), None);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn independent_seeds_keep_registration_order(
    repository: Arc<InMemoryTaskExecutionRepository>,
) {
    let invocations = Invocations::default();
    let mut registry = TaskRegistry::new();
    for seed in ["R", "Q", "P"] {
        registry
            .register_seed(RecordingSeed::new(seed, &invocations))
            .expect("register seed");
    }

    runner(&repository)
        .run_seeds(&registry, &context(0, DeploymentEnvironment::development()))
        .await
        .expect("run succeeds");

    assert_eq!(invocations.names(), vec!["R", "Q", "P"]);
}
