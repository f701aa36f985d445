//! Then steps for data processor BDD scenarios.

use super::world::{DataProcessorWorld, run_async, split_list};
use eyre::WrapErr;
use groundwork::data_processor::{
    domain::{TaskExecutionState, TaskName, TaskType},
    ports::TaskExecutionRepository,
    services::RunnerOutcome,
};
use rstest_bdd_macros::then;

#[then(r#"the seeds ran in the order "{order}""#)]
fn seeds_ran_in_order(world: &DataProcessorWorld, order: String) -> Result<(), eyre::Report> {
    let expected = split_list(&order);
    let invoked = world.invoked();
    if invoked != expected {
        return Err(eyre::eyre!("expected order {expected:?}, found {invoked:?}"));
    }
    Ok(())
}

#[then(r#"seed "{name}" has run {times:usize} times"#)]
fn seed_ran_times(world: &DataProcessorWorld, name: String, times: usize) -> Result<(), eyre::Report> {
    expect_invocations(world, &name, times)
}

#[then(r#"fixture "{name}" has run {times:usize} times"#)]
fn fixture_ran_times(
    world: &DataProcessorWorld,
    name: String,
    times: usize,
) -> Result<(), eyre::Report> {
    expect_invocations(world, &name, times)
}

fn expect_invocations(world: &DataProcessorWorld, name: &str, times: usize) -> Result<(), eyre::Report> {
    let actual = world.invocation_count(name);
    if actual != times {
        return Err(eyre::eyre!("expected {name} to run {times} times, ran {actual}"));
    }
    Ok(())
}

#[then(r#"fixture "{name}" was skipped for the environment"#)]
fn fixture_skipped(world: &DataProcessorWorld, name: String) -> Result<(), eyre::Report> {
    let report = world
        .reports
        .last()
        .ok_or_else(|| eyre::eyre!("no job has run"))?;
    let fixtures = report
        .fixtures
        .report()
        .ok_or_else(|| eyre::eyre!("fixture runner aborted"))?;
    let task = TaskName::new(name).wrap_err("parse fixture name")?;
    if !fixtures.skipped_for_environment.contains(&task) {
        return Err(eyre::eyre!(
            "expected {task} to be skipped, report was {fixtures:?}"
        ));
    }
    Ok(())
}

#[then(r#"seed "{name}" has the history "{states}""#)]
fn seed_history(
    world: &DataProcessorWorld,
    name: String,
    states: String,
) -> Result<(), eyre::Report> {
    let expected = split_list(&states)
        .iter()
        .map(|state| TaskExecutionState::try_from(state.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .wrap_err("parse expected states")?;
    let task = TaskName::new(name).wrap_err("parse seed name")?;
    let history = run_async(world.repository.list_by_task(&task, TaskType::Seed))
        .wrap_err("load seed history")?;
    let actual: Vec<_> = history.iter().map(|execution| execution.state()).collect();
    if actual != expected {
        return Err(eyre::eyre!("expected history {expected:?}, found {actual:?}"));
    }
    Ok(())
}

#[then("the seed runner aborted")]
fn seed_runner_aborted(world: &DataProcessorWorld) -> Result<(), eyre::Report> {
    let report = world
        .reports
        .last()
        .ok_or_else(|| eyre::eyre!("no job has run"))?;
    if !matches!(report.seeds, RunnerOutcome::Failed { .. }) {
        return Err(eyre::eyre!("expected seed runner to abort, got {:?}", report.seeds));
    }
    Ok(())
}

#[then("no seed has run")]
fn no_seed_ran(world: &DataProcessorWorld) -> Result<(), eyre::Report> {
    let invoked = world.invoked();
    if !invoked.is_empty() {
        return Err(eyre::eyre!("expected no invocations, found {invoked:?}"));
    }
    let rows = world.repository.snapshot().wrap_err("snapshot store")?;
    if !rows.is_empty() {
        return Err(eyre::eyre!("expected no execution rows, found {}", rows.len()));
    }
    Ok(())
}
