use crate::{
    builtin::args::{arg, lookup_or_inline, path_arg},
    foundation::error::EngineResult,
    registry::{ActionDef, Registry},
    settings::value::Value,
    stage::model::StageList,
};

/// Action `iterate(path, params)`: add `by` (default 1) to the number at `path`, wrapping
/// between `min` and `max`. `callbacks` run when the value wraps.
pub(super) fn install(registry: &mut Registry) -> EngineResult<()> {
    registry.add_action(ActionDef::method("iterate", |engine, args| {
        let path = path_arg(args, 0, "path")?;
        let Some(current) = engine.get_settings(&path, true).and_then(Value::as_f64) else {
            tracing::warn!(%path, "iterate needs a number");
            return Ok(Value::Null);
        };
        let params = lookup_or_inline(engine, arg(args, 1), true).unwrap_or_else(Value::mapping);
        let by = params
            .field("by")
            .and_then(Value::coerce_f64)
            .filter(|b| *b != 0.0)
            .unwrap_or(1.0);
        let min = params.field("min").and_then(Value::as_f64);
        let max = params.field("max").and_then(Value::as_f64);
        let callbacks = match params.field("callbacks") {
            Some(v) => Some(StageList::from_value(v)?),
            None => None,
        };

        let next = current + by;
        let (value, wrapped) = match (min, max) {
            (_, Some(max)) if next > max => (min.unwrap_or(0.0), true),
            (Some(min), _) if next < min && by < 0.0 => (max.unwrap_or(min), true),
            (Some(min), _) if next < min => (min, false),
            _ => (next, false),
        };
        engine.adjust_settings(&path, Value::Number(value), false);
        if wrapped {
            if let Some(stages) = callbacks {
                engine.process_stages(&stages, None, None, None)?;
            }
        }
        Ok(Value::Number(value))
    }))
}
