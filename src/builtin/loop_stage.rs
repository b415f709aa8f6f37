use crate::{
    engine::Engine,
    foundation::error::EngineResult,
    registry::{Registry, RenderCall, RendererDef},
    settings::{path::Path, value::Value},
    stage::{model::StageDescriptor, outcome::Outcome},
};

/// Renderer `loop`: repeat the stage's nested `stages`.
///
/// With a positive `count` the body runs that many times, writing the iteration index to
/// `countPath` when given. Otherwise it runs while the stage's condition (or, without one,
/// the `condition` in the renderer settings) holds, at most `maxLoop` times. An abort in
/// the body aborts the loop and the enclosing list.
pub(super) fn install(registry: &mut Registry) -> EngineResult<()> {
    registry.add_renderer(RendererDef::new("loop", render_loop).version(2))?;
    Ok(())
}

fn render_loop(engine: &mut Engine, call: RenderCall<'_>) -> anyhow::Result<Outcome> {
    let stage = &call.stage;
    let Some(body) = &stage.stages else {
        tracing::warn!("loop stage has no stages");
        return Ok(Outcome::Done);
    };
    let run_body = |engine: &mut Engine| {
        engine.process_stages(body, call.pipeline, call.source.clone(), call.destination.clone())
    };

    if let Some(count) = stage.extra("count").and_then(Value::coerce_f64).filter(|c| *c > 0.0) {
        let count_path = stage.extra("countPath").and_then(Path::from_value);
        for i in 0..count as u64 {
            if let Some(p) = &count_path {
                engine.adjust_settings(p, Value::Number(i as f64), false);
            }
            if run_body(engine)?.is_abort() {
                return Ok(Outcome::Abort);
            }
        }
        return Ok(Outcome::Done);
    }

    let mut remaining = stage
        .extra("maxLoop")
        .or_else(|| call.settings.field("maxLoop"))
        .and_then(Value::coerce_f64)
        .filter(|m| *m > 0.0)
        .map(|m| m as u64)
        .unwrap_or(u64::from(engine.config().default_max_loop));

    let guard = if stage.condition.is_some() {
        None
    } else {
        match call.settings.field("condition") {
            Some(_) => Some(StageDescriptor::from_value(&call.settings)?),
            None => {
                tracing::warn!("loop stage has neither count nor condition");
                return Ok(Outcome::Done);
            }
        }
    };
    let guard = guard.as_ref().unwrap_or(stage.as_ref());

    while remaining > 0 {
        let holds = engine
            .check_condition(guard, call.pipeline, call.source.clone(), call.destination.clone())?
            .is_true();
        if !holds {
            break;
        }
        if run_body(engine)?.is_abort() {
            return Ok(Outcome::Abort);
        }
        remaining -= 1;
    }
    if remaining == 0 {
        tracing::debug!("loop stopped at its iteration cap");
    }
    Ok(Outcome::Done)
}
