//! When steps for job dispatch BDD scenarios.

use super::world::{DispatchWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when(r#"the worker pops "{job_type}""#)]
fn worker_pops(world: &mut DispatchWorld, job_type: String) -> Result<(), eyre::Report> {
    let popped = run_async(world.queue.pop(&[job_type])).wrap_err("pop job")?;
    world.last_popped = Some(popped);
    Ok(())
}
