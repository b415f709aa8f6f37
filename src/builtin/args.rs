use crate::{
    engine::Engine,
    settings::{path::Path, value::Value},
};

static NULL: Value = Value::Null;

/// Argument `i`, null when absent.
pub(crate) fn arg(args: &[Value], i: usize) -> &Value {
    args.get(i).unwrap_or(&NULL)
}

/// Argument `i` as a settings path.
pub(crate) fn path_arg(args: &[Value], i: usize, what: &str) -> anyhow::Result<Path> {
    let v = arg(args, i);
    Path::from_value(v)
        .ok_or_else(|| anyhow::anyhow!("{what} must be a settings path, got {}", v.kind_name()))
}

/// Argument `i` judged by truthiness.
pub(crate) fn flag(args: &[Value], i: usize) -> bool {
    arg(args, i).is_truthy()
}

/// Argument `i` as a number.
pub(crate) fn number_arg(args: &[Value], i: usize, what: &str) -> anyhow::Result<f64> {
    let v = arg(args, i);
    v.coerce_f64()
        .ok_or_else(|| anyhow::anyhow!("{what} must be a number, got {}", v.kind_name()))
}

/// A mapping given inline, or the value stored at a path given as text or key list.
pub(crate) fn lookup_or_inline(engine: &Engine, v: &Value, allow_missing: bool) -> Option<Value> {
    match v {
        Value::Null => None,
        Value::Mapping(_) => Some(v.clone()),
        _ => match Path::from_value(v) {
            Some(path) => engine.get_settings(&path, allow_missing).cloned(),
            None => Some(v.clone()),
        },
    }
}
