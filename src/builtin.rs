pub(crate) mod args;
mod core_actions;
mod fps;
mod iterate;
mod loop_stage;
mod queue;
mod time;

use crate::{foundation::error::EngineResult, registry::Registry};

/// Register the core actions, time getters and the standard renderers and actions.
pub(crate) fn install(registry: &mut Registry) -> EngineResult<()> {
    core_actions::install(registry)?;
    time::install(registry);
    loop_stage::install(registry)?;
    iterate::install(registry)?;
    queue::install(registry)?;
    fps::install(registry)?;
    Ok(())
}

#[cfg(test)]
#[path = "../tests/unit/builtin/builtin.rs"]
mod tests;
