use crate::{
    builtin::args::{arg, lookup_or_inline, path_arg},
    foundation::error::EngineResult,
    registry::{ActionDef, Registry},
    settings::value::{Mapping, Value},
};

const DEFAULT_LIMIT: f64 = 20.0;

/// Rolling queues stored in the settings tree as
/// `{values, limit, weights, average, weightedAverage}`, newest value first.
pub(super) fn install(registry: &mut Registry) -> EngineResult<()> {
    registry.add_actions([
        ActionDef::method("makeQueue", |engine, args| {
            let path = path_arg(args, 0, "path")?;
            let params =
                lookup_or_inline(engine, arg(args, 1), true).unwrap_or_else(Value::mapping);
            let limit = params
                .field("limit")
                .and_then(Value::coerce_f64)
                .filter(|l| *l >= 1.0)
                .unwrap_or(DEFAULT_LIMIT);
            let weights = params
                .field("weights")
                .filter(|w| w.as_sequence().is_some())
                .cloned()
                .unwrap_or_else(|| Value::Sequence(Vec::new()));
            let mut queue = Mapping::new();
            queue.insert("values".to_owned(), Value::Sequence(vec![Value::Number(0.0)]));
            queue.insert("limit".to_owned(), Value::Number(limit));
            queue.insert("weights".to_owned(), weights);
            queue.insert("average".to_owned(), Value::Number(0.0));
            queue.insert("weightedAverage".to_owned(), Value::Number(0.0));
            engine.adjust_settings(&path, Value::Mapping(queue), true);
            Ok(Value::Null)
        }),
        ActionDef::method("queueAdd", |engine, args| {
            let path = path_arg(args, 0, "path")?;
            push(engine.settings_mut().get_mut(&path), arg(args, 1).clone());
            Ok(Value::Null)
        }),
        ActionDef::method("queueAddCopy", |engine, args| {
            let path = path_arg(args, 0, "path")?;
            let source = path_arg(args, 1, "source")?;
            let value = engine.get_settings(&source, false).cloned().unwrap_or_default();
            push(engine.settings_mut().get_mut(&path), value);
            Ok(Value::Null)
        }),
    ])
}

fn push(queue: Option<&mut Value>, value: Value) {
    let Some(queue) = queue.and_then(Value::as_mapping_mut) else {
        tracing::warn!("queue not found");
        return;
    };
    let limit = queue
        .get("limit")
        .and_then(Value::coerce_f64)
        .unwrap_or(DEFAULT_LIMIT)
        .max(1.0) as usize;
    let weights: Vec<f64> = queue
        .get("weights")
        .and_then(Value::as_sequence)
        .map(|w| w.iter().map(|v| v.coerce_f64().unwrap_or(0.0)).collect())
        .unwrap_or_default();
    let Some(values) = queue.get_mut("values").and_then(Value::as_sequence_mut) else {
        tracing::warn!("queue has no values");
        return;
    };
    values.insert(0, value);
    values.truncate(limit);

    let numbers: Vec<f64> = values.iter().map(|v| v.coerce_f64().unwrap_or(0.0)).collect();
    let total: f64 = numbers.iter().sum();
    let average = total / numbers.len() as f64;
    let (mut weighted, mut weight_total) = (0.0, 0.0);
    for (i, n) in numbers.iter().enumerate() {
        let w = weights.get(i).copied().filter(|w| *w != 0.0).unwrap_or(1.0);
        weighted += n * w;
        weight_total += w;
    }
    queue.insert("average".to_owned(), Value::Number(average));
    queue.insert(
        "weightedAverage".to_owned(),
        Value::Number(weighted / weight_total),
    );
}
