//! Given steps for data processor BDD scenarios.

use super::world::{DataProcessorWorld, ScenarioAction};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given(r#"a standalone seed "{name}""#)]
fn a_seed(world: &mut DataProcessorWorld, name: String) -> Result<(), eyre::Report> {
    let seed = ScenarioAction::new(&name, &world.invocations);
    world
        .registry
        .register_seed(seed)
        .wrap_err("register seed")?;
    Ok(())
}

#[given(r#"a seed "{name}" that depends on "{dependency}""#)]
fn a_dependent_seed(
    world: &mut DataProcessorWorld,
    name: String,
    dependency: String,
) -> Result<(), eyre::Report> {
    let seed = ScenarioAction::new(&name, &world.invocations).depends_on(&dependency);
    world
        .registry
        .register_seed(seed)
        .wrap_err("register dependent seed")?;
    Ok(())
}

#[given(r#"a seed "{name}" that fails once"#)]
fn a_flaky_seed(world: &mut DataProcessorWorld, name: String) -> Result<(), eyre::Report> {
    let seed = ScenarioAction::new(&name, &world.invocations).failing(1);
    world
        .registry
        .register_seed(seed)
        .wrap_err("register failing seed")?;
    Ok(())
}

#[given(r#"a fixture "{name}" for environment "{environment}""#)]
fn a_fixture(
    world: &mut DataProcessorWorld,
    name: String,
    environment: String,
) -> Result<(), eyre::Report> {
    let fixture = ScenarioAction::new(&name, &world.invocations).for_environment(&environment);
    world
        .registry
        .register_fixture(fixture)
        .wrap_err("register fixture")?;
    Ok(())
}
