use crate::{
    builtin::args::{arg, flag, path_arg},
    foundation::error::EngineResult,
    registry::{ActionDef, Registry},
    settings::{path::Path, value::Value},
};

/// Engine operations reachable by name from stages. Their names are reserved.
pub(super) fn install(registry: &mut Registry) -> EngineResult<()> {
    let defs = [
        ActionDef::method("adjustSettings", |engine, args| {
            let path = path_arg(args, 0, "path")?;
            engine.adjust_settings(&path, arg(args, 1).clone(), flag(args, 2));
            Ok(Value::Null)
        }),
        ActionDef::method("copySettings", |engine, args| {
            let path = path_arg(args, 0, "path")?;
            let source = path_arg(args, 1, "source")?;
            engine.copy_settings(&path, &source, flag(args, 2));
            Ok(Value::Null)
        }),
        ActionDef::method("clearSettings", |engine, args| {
            let path = match arg(args, 0) {
                Value::Null => None,
                _ => Some(path_arg(args, 0, "path")?),
            };
            engine.clear_settings(path.as_ref());
            Ok(Value::Null)
        }),
        ActionDef::method("getSettings", |engine, args| {
            let path = match arg(args, 0) {
                Value::Null => Path::root(),
                _ => path_arg(args, 0, "path")?,
            };
            Ok(engine.get_settings(&path, flag(args, 1)).cloned().unwrap_or_default())
        }),
        ActionDef::method("startPipeline", |engine, args| {
            let name = pipeline_name(args)?;
            engine.start_pipeline(&name)?;
            Ok(Value::Null)
        }),
        ActionDef::method("stopPipeline", |engine, args| {
            let name = pipeline_name(args)?;
            engine.stop_pipeline(&name, flag(args, 1))?;
            Ok(Value::Null)
        }),
        ActionDef::method("initPipeline", |engine, args| {
            let name = pipeline_name(args)?;
            engine.init_pipeline(&name, flag(args, 1))?;
            Ok(Value::Null)
        }),
        ActionDef::method("reset", |engine, args| {
            engine.reset(flag(args, 0));
            Ok(Value::Null)
        }),
        ActionDef::method("callResetter", |engine, args| {
            let Some(name) = arg(args, 0).as_str().map(str::to_owned) else {
                anyhow::bail!("callResetter needs a resetter name");
            };
            Ok(Value::Bool(engine.call_resetter(&name, flag(args, 1))))
        }),
        ActionDef::method("setCurrentTime", |engine, args| {
            engine.set_current_time(arg(args, 0).coerce_f64());
            Ok(Value::Null)
        }),
    ];
    for def in defs {
        registry.add_core_action(def)?;
    }
    Ok(())
}

fn pipeline_name(args: &[Value]) -> anyhow::Result<String> {
    arg(args, 0)
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| anyhow::anyhow!("a pipeline name is required"))
}
