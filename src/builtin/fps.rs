use crate::{
    builtin::args::{number_arg, path_arg},
    foundation::error::EngineResult,
    registry::{ActionDef, Registry},
    settings::value::Value,
};

const FALLBACK_FPS: f64 = 30.0;

/// Action `setFPS(pipeSettings, animSettings, bpm, fpb)`: tie a pipeline's frame rate to a
/// tempo, `fpb` frames per beat at `bpm` beats per minute.
pub(super) fn install(registry: &mut Registry) -> EngineResult<()> {
    registry.add_action(ActionDef::method("setFPS", |engine, args| {
        let pipe_settings = path_arg(args, 0, "pipeline settings")?;
        let anim_settings = path_arg(args, 1, "animation settings")?;
        let steps = engine
            .get_settings(&anim_settings, true)
            .and_then(|s| s.field("steps"))
            .and_then(Value::coerce_f64)
            .filter(|s| *s != 0.0);
        let fps = match steps {
            None => {
                tracing::warn!(path = %anim_settings, "animation settings have no steps");
                FALLBACK_FPS
            }
            Some(steps) => {
                let bpm = number_arg(args, 2, "bpm")?;
                let fpb = number_arg(args, 3, "fpb")?;
                if fpb != 0.0 && steps % fpb != 0.0 {
                    tracing::warn!(steps, fpb, "steps are not a whole number of beats");
                }
                fpb * bpm / 60.0
            }
        };
        engine.adjust_settings(&pipe_settings.child("fps"), Value::Number(fps), false);
        Ok(Value::Number(fps))
    }))
}
