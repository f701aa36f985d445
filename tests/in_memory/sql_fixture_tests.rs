//! SQL fixtures driven through the runner with a recording executor.

use std::sync::Arc;

use crate::in_memory::helpers::{context, name, repository, runner};
use camino::Utf8PathBuf;
use groundwork::data_processor::{
    adapters::memory::{InMemorySqlExecutor, InMemoryTaskExecutionRepository},
    domain::{DeploymentEnvironment, TaskExecutionState, TaskRegistry, TaskType},
    fixtures::SqlFixture,
};
use rstest::rstest;

fn fixture_root(files: &[(&str, &str)]) -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    for (relative, contents) in files {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, contents).expect("write script");
    }
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 path");
    (dir, root)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sql_fixtures_apply_in_dependency_order(repository: Arc<InMemoryTaskExecutionRepository>) {
    let (_dir, root) = fixture_root(&[
        ("schema/CreateTables.sql", "CREATE TABLE lookup (id int);"),
        ("data/FillLookup.sql", "INSERT INTO lookup VALUES (1);"),
    ]);
    let executor = Arc::new(InMemorySqlExecutor::new());
    let mut registry = TaskRegistry::new();
    registry
        .register_fixture(
            SqlFixture::new("FillLookup", Arc::clone(&executor), Some(root.clone()))
                .depends_on("CreateTables"),
        )
        .expect("register FillLookup")
        .register_fixture(SqlFixture::new("CreateTables", Arc::clone(&executor), Some(root)))
        .expect("register CreateTables");

    let report = runner(&repository)
        .run_fixtures(&registry, &context(0, DeploymentEnvironment::testing()))
        .await
        .expect("run succeeds");

    assert_eq!(report.succeeded, vec![name("CreateTables"), name("FillLookup")]);
    assert_eq!(
        executor.executed_scripts().expect("scripts"),
        vec![
            "CREATE TABLE lookup (id int);".to_owned(),
            "INSERT INTO lookup VALUES (1);".to_owned(),
        ]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sql_fixtures_are_skipped_in_production_by_default(
    repository: Arc<InMemoryTaskExecutionRepository>,
) {
    let (_dir, root) = fixture_root(&[("CreateTables.sql", "CREATE TABLE lookup (id int);")]);
    let executor = Arc::new(InMemorySqlExecutor::new());
    let mut registry = TaskRegistry::new();
    registry
        .register_fixture(SqlFixture::new("CreateTables", Arc::clone(&executor), Some(root)))
        .expect("register");

    let report = runner(&repository)
        .run_fixtures(&registry, &context(0, DeploymentEnvironment::production()))
        .await
        .expect("run succeeds");

    assert_eq!(report.skipped_for_environment, vec![name("CreateTables")]);
    assert!(executor.executed_scripts().expect("scripts").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_script_is_recorded_as_failure(repository: Arc<InMemoryTaskExecutionRepository>) {
    let (_dir, root) = fixture_root(&[]);
    let executor = Arc::new(InMemorySqlExecutor::new());
    let mut registry = TaskRegistry::new();
    registry
        .register_fixture(SqlFixture::new("Absent", executor, Some(root)))
        .expect("register");
    let fixture_runner = runner(&repository);

    let report = fixture_runner
        .run_fixtures(&registry, &context(0, DeploymentEnvironment::development()))
        .await
        .expect("run succeeds");

    assert_eq!(report.failed, vec![name("Absent")]);
    let history = fixture_runner
        .store()
        .history(&name("Absent"), TaskType::Fixture)
        .await
        .expect("history");
    let [execution] = history.as_slice() else {
        panic!("expected one execution, found {history:?}");
    };
    assert_eq!(execution.state(), TaskExecutionState::Failed);
    assert!(
        execution
            .error()
            .is_some_and(|error| error.contains("no script named 'Absent.sql'"))
    );
}
