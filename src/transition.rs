pub mod bezier;
pub mod color;
pub mod gradient;
pub mod table;

use std::collections::BTreeMap;

use crate::{
    builtin::args::{arg, flag, lookup_or_inline, number_arg, path_arg},
    engine::Engine,
    foundation::error::EngineResult,
    registry::{ActionDef, Registry},
    settings::{
        path::Path,
        value::{Mapping, Value},
    },
    stage::model::StageList,
    transition::{
        bezier::{CubicTiming, presets_value},
        table::TransitionSpec,
    },
};

impl Engine {
    /// Start moving the fields of `targets` under `path`. Returns the fields accepted.
    ///
    /// The start time is the time source's current time when `spec.now`, otherwise
    /// `spec.from_time`, the engine's pinned current time, or the time source's current time.
    pub fn add_transition(
        &mut self,
        path: &Path,
        targets: &Mapping,
        spec: &TransitionSpec,
    ) -> Vec<String> {
        let Some(current) = self
            .settings
            .get(path, true)
            .and_then(Value::as_mapping)
            .cloned()
        else {
            tracing::warn!(%path, "transitions need a mapping at their path");
            return Vec::new();
        };
        let time_type = spec.time_type.as_deref();
        let started = if spec.now {
            self.get_time(time_type, None)
        } else if let Some(t) = spec.from_time.or(self.current_time()) {
            t
        } else {
            self.get_time(time_type, None)
        };
        let accepted = self.transitions.add(path, &current, targets, spec, started);
        tracing::debug!(%path, fields = ?accepted, started, "transition added");
        accepted
    }

    /// Whether `path` has a transition (touching any of `fields`, when given).
    pub fn has_transition(&self, path: &Path, fields: Option<&Mapping>) -> bool {
        self.transitions.has(path, fields)
    }

    /// Stop `field` (or every field) under `path`, running callbacks whose gates open
    /// unless `ignore_callbacks`. Returns false when `path` had no transition.
    pub fn remove_transition(
        &mut self,
        path: &Path,
        field: Option<&str>,
        ignore_warn: bool,
        ignore_callbacks: bool,
        keep_bucket: bool,
    ) -> bool {
        match self.transitions.remove(path, field, ignore_callbacks, keep_bucket) {
            Some(fired) => {
                self.run_transition_callbacks(fired);
                true
            }
            None => {
                if !ignore_warn {
                    tracing::warn!(%path, "no transition to remove");
                }
                false
            }
        }
    }

    /// Advance every transition, write the values into the settings and run the callbacks
    /// of completed ones.
    pub fn process_all_transitions(&mut self) {
        if self.transitions.is_empty() {
            return;
        }
        let nows: BTreeMap<Option<String>, f64> = self
            .transitions
            .time_types()
            .into_iter()
            .map(|tt| {
                let now = self.get_time(tt.as_deref(), None);
                (tt, now)
            })
            .collect();
        let tick = self
            .transitions
            .tick(|tt| nows.get(&tt.map(str::to_owned)).copied().unwrap_or(0.0));
        for (path, field, value) in tick.writes {
            if !self.settings.set_field_silent(&path, &field, value) {
                tracing::debug!(%path, field, "transition path no longer holds a mapping");
            }
        }
        self.run_transition_callbacks(tick.fired);
    }

    /// Read-only view of the live transitions.
    pub fn transitions(&self) -> &table::TransitionTable {
        &self.transitions
    }

    fn run_transition_callbacks(&mut self, fired: Vec<StageList>) {
        for stages in fired {
            if let Err(e) = self.process_stages(&stages, None, None, None) {
                tracing::error!(error = %e, "transition callback failed");
            }
        }
    }
}

/// Register the transition actions and hooks.
pub(crate) fn install(registry: &mut Registry) -> EngineResult<()> {
    registry.add_initialiser("transitions", |engine, _| {
        engine.transitions.clear();
        Ok(())
    });
    registry.add_resetter("transitions", |engine, skip_clear| {
        if !skip_clear {
            engine.transitions.clear();
        }
        Ok(())
    });
    registry.add_adjust_callback(|engine, path, field, _| {
        if engine.has_transition(path, None) {
            engine.remove_transition(path, Some(field), true, false, false);
        }
    });
    registry.add_pipe_process_callback(|engine, _| engine.process_all_transitions());

    registry.add_actions([
        ActionDef::value("timingBeziers", presets_value()),
        ActionDef::method("addTransition", add_transition_action),
        ActionDef::method("hasTransition", |engine, args| {
            let mut path = path_arg(args, 0, "path")?;
            if flag(args, 2) {
                let stored = engine.get_settings(&path, false).cloned().unwrap_or_default();
                path = Path::from_value(&stored)
                    .ok_or_else(|| anyhow::anyhow!("no path stored at {path}"))?;
            }
            let fields = lookup_or_inline(engine, arg(args, 1), true);
            let fields = fields.as_ref().and_then(Value::as_mapping);
            Ok(Value::Bool(engine.has_transition(&path, fields)))
        }),
        ActionDef::method("removeTransition", |engine, args| {
            let path = path_arg(args, 0, "path")?;
            let field = arg(args, 1).as_str().map(str::to_owned);
            let removed = engine.remove_transition(
                &path,
                field.as_deref(),
                flag(args, 2),
                flag(args, 3),
                flag(args, 4),
            );
            Ok(Value::Bool(removed))
        }),
        ActionDef::method("processAllTransitions", |engine, _| {
            engine.process_all_transitions();
            Ok(Value::Null)
        }),
        ActionDef::method("cubicBezierAtTime", |_, args| {
            let t = number_arg(args, 0, "t")?;
            let timing = CubicTiming::new(
                number_arg(args, 1, "p1x")?,
                number_arg(args, 2, "p1y")?,
                number_arg(args, 3, "p2x")?,
                number_arg(args, 4, "p2y")?,
            );
            Ok(Value::Number(timing.at_time(t, number_arg(args, 5, "duration")?)))
        }),
    ])
}

fn add_transition_action(engine: &mut Engine, args: &[Value]) -> anyhow::Result<Value> {
    let path = path_arg(args, 0, "path")?;
    let Some(targets) = lookup_or_inline(engine, arg(args, 1), false) else {
        anyhow::bail!("addTransition needs target settings");
    };
    let Some(targets) = targets.as_mapping() else {
        anyhow::bail!("transition targets must be a mapping");
    };
    let Some(spec) = lookup_or_inline(engine, arg(args, 2), true) else {
        tracing::warn!(%path, "no transition settings");
        return Ok(Value::Null);
    };
    let spec: TransitionSpec = serde_json::from_value(spec.to_json())?;
    let accepted = engine.add_transition(&path, targets, &spec);
    Ok(Value::Sequence(accepted.into_iter().map(Value::from).collect()))
}

#[cfg(test)]
#[path = "../tests/unit/transition/actions.rs"]
mod tests;
