use std::collections::{BTreeMap, BTreeSet};

use crate::{
    settings::{
        path::Path,
        value::{Mapping, Value},
    },
    stage::model::StageList,
    transition::{
        bezier::{CubicTiming, timing_from_value},
        color::{format_rgba, parse_color},
        gradient::Gradient,
    },
};

/// Fields interpolated as colours rather than numbers.
pub const COLOR_FIELDS: [&str; 5] = ["fillStyle", "strokeStyle", "color", "colorFrom", "colorTo"];

/// How a transition is timed, and what runs when it completes.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransitionSpec {
    /// Length in time-source units.
    pub duration: f64,
    /// Wait before the value starts moving.
    pub delay: f64,
    /// Start at the current time of the time source, ignoring `from_time`.
    pub now: bool,
    /// Explicit start time.
    pub from_time: Option<f64>,
    /// Time source; the engine default when absent.
    pub time_type: Option<String>,
    /// Preset name or `[p1x, p1y, p2x, p2y]`.
    pub bezier: Option<Value>,
    /// Stages run once every field of this transition completed.
    pub callbacks: Option<StageList>,
}

impl TransitionSpec {
    /// Linear transition lasting `duration`.
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    /// Builder-style start time.
    pub fn from_time(mut self, t: f64) -> Self {
        self.from_time = Some(t);
        self
    }

    /// Builder-style delay.
    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    /// Builder-style timing curve (preset name).
    pub fn bezier(mut self, preset: &str) -> Self {
        self.bezier = Some(Value::from(preset));
        self
    }

    /// Builder-style completion stages.
    pub fn callbacks(mut self, stages: StageList) -> Self {
        self.callbacks = Some(stages);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
enum FieldKind {
    Numeric { from: f64, to: f64 },
    Color { gradient: Gradient, target: Value },
}

/// One field moving towards its target.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldTransition {
    started: f64,
    delay: f64,
    duration: f64,
    time_type: Option<String>,
    timing: Option<CubicTiming>,
    kind: FieldKind,
}

impl FieldTransition {
    /// Value at time `now` and whether the field has arrived.
    pub fn value_at(&self, now: f64) -> (Value, bool) {
        let elapsed = (now - (self.started + self.delay)).max(0.0);
        let progress = if self.duration > 0.0 {
            elapsed / self.duration
        } else {
            1.0
        };
        if progress >= 1.0 {
            let target = match &self.kind {
                FieldKind::Numeric { to, .. } => Value::Number(*to),
                FieldKind::Color { target, .. } => target.clone(),
            };
            return (target, true);
        }
        let p = match &self.timing {
            Some(timing) => timing.at_time(progress, self.duration),
            None => progress,
        };
        let value = match &self.kind {
            FieldKind::Numeric { from, to } => Value::Number(from + (to - from) * p),
            FieldKind::Color { gradient, .. } => Value::Text(format_rgba(gradient.sample(p))),
        };
        (value, false)
    }

    /// Time the field reaches its target.
    pub fn until(&self) -> f64 {
        self.started + self.delay + self.duration
    }
}

#[derive(Clone, Debug, PartialEq)]
struct CallbackGate {
    until: f64,
    keys: Vec<String>,
    actions: Vec<StageList>,
}

/// All fields moving under one settings path.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    path: Path,
    fields: BTreeMap<String, FieldTransition>,
    gates: Vec<CallbackGate>,
}

impl Transition {
    fn new(path: Path) -> Self {
        Self {
            path,
            fields: BTreeMap::new(),
            gates: Vec::new(),
        }
    }

    /// Settings path the values are written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The moving field `name`.
    pub fn field(&self, name: &str) -> Option<&FieldTransition> {
        self.fields.get(name)
    }

    /// Names of the moving fields.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    fn forget_field(&mut self, name: &str) {
        self.fields.remove(name);
        for gate in &mut self.gates {
            gate.keys.retain(|k| k != name);
        }
    }

    /// Gates left with no keys: discard their stages when `discard`, otherwise remove them
    /// and hand their stages back.
    fn drain_gates(&mut self, discard: bool) -> Vec<StageList> {
        let mut fired = Vec::new();
        if discard {
            for gate in self.gates.iter_mut().filter(|g| g.keys.is_empty()) {
                gate.actions.clear();
            }
            return fired;
        }
        self.gates.retain_mut(|gate| {
            if !gate.keys.is_empty() {
                return true;
            }
            fired.append(&mut gate.actions);
            false
        });
        fired
    }
}

/// Writes and completion stages produced by one pass over the table.
#[derive(Debug, Default)]
pub struct TransitionTick {
    /// `(path, field, value)` to store.
    pub writes: Vec<(Path, String, Value)>,
    /// Stage lists whose gates opened.
    pub fired: Vec<StageList>,
}

/// Transitions keyed by the joined form of their settings path.
#[derive(Clone, Debug, Default)]
pub struct TransitionTable {
    buckets: BTreeMap<String, Transition>,
}

impl TransitionTable {
    /// Number of paths with live transitions.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True when nothing is moving.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop everything without running callbacks.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// The transition under `path`.
    pub fn get(&self, path: &Path) -> Option<&Transition> {
        self.buckets.get(&path.joined())
    }

    /// Whether `path` has a transition, and when `fields` is given, whether any of those
    /// fields is moving.
    pub fn has(&self, path: &Path, fields: Option<&Mapping>) -> bool {
        match (self.get(path), fields) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(t), Some(fields)) => fields.keys().any(|k| t.fields.contains_key(k)),
        }
    }

    /// Start moving each field of `targets` from its value in `current` (the mapping at
    /// `path`). A field already moving is replaced without firing its callbacks. Returns
    /// the fields accepted.
    pub fn add(
        &mut self,
        path: &Path,
        current: &Mapping,
        targets: &Mapping,
        spec: &TransitionSpec,
        started: f64,
    ) -> Vec<String> {
        let timing = spec.bezier.as_ref().and_then(|b| {
            let timing = timing_from_value(b);
            if timing.is_none() {
                tracing::warn!(bezier = ?b, "unknown timing curve; using linear");
            }
            timing
        });
        let mut accepted = Vec::new();
        for (field, target) in targets {
            if self.get(path).is_some_and(|t| t.fields.contains_key(field)) {
                self.remove(path, Some(field.as_str()), true, true);
            }
            let Some(kind) = field_kind(field, current.get(field), target) else {
                continue;
            };
            let ft = FieldTransition {
                started,
                delay: spec.delay,
                duration: spec.duration,
                time_type: spec.time_type.clone(),
                timing,
                kind,
            };
            self.buckets
                .entry(path.joined())
                .or_insert_with(|| Transition::new(path.clone()))
                .fields
                .insert(field.clone(), ft);
            accepted.push(field.clone());
        }

        if let (Some(callbacks), false) = (&spec.callbacks, accepted.is_empty()) {
            let until = started + spec.delay + spec.duration;
            if let Some(t) = self.buckets.get_mut(&path.joined()) {
                let idx = match t.gates.iter().position(|g| g.until == until) {
                    Some(idx) => idx,
                    None => {
                        t.gates.push(CallbackGate {
                            until,
                            keys: Vec::new(),
                            actions: Vec::new(),
                        });
                        t.gates.len() - 1
                    }
                };
                let gate = &mut t.gates[idx];
                if !gate.actions.contains(callbacks) {
                    gate.actions.push(callbacks.clone());
                }
                for field in &accepted {
                    if !gate.keys.contains(field) {
                        gate.keys.push(field.clone());
                    }
                }
            }
        }
        accepted
    }

    /// Stop `field` (or every field) under `path`.
    ///
    /// Gates left without keys fire, or lose their stages when `ignore_callbacks`. The
    /// bucket is dropped once empty unless `keep_bucket`. Returns the stages to run, or
    /// `None` when `path` had no transition.
    pub fn remove(
        &mut self,
        path: &Path,
        field: Option<&str>,
        ignore_callbacks: bool,
        keep_bucket: bool,
    ) -> Option<Vec<StageList>> {
        let key = path.joined();
        let t = self.buckets.get_mut(&key)?;
        match field {
            Some(name) => t.forget_field(name),
            None => {
                let names: Vec<String> = t.fields.keys().cloned().collect();
                for name in names {
                    t.forget_field(&name);
                }
            }
        }
        let fired = t.drain_gates(ignore_callbacks);
        if !keep_bucket && t.fields.is_empty() {
            self.buckets.remove(&key);
        }
        Some(fired)
    }

    /// Time sources used by live fields.
    pub fn time_types(&self) -> BTreeSet<Option<String>> {
        self.buckets
            .values()
            .flat_map(|t| t.fields.values().map(|f| f.time_type.clone()))
            .collect()
    }

    /// Advance every field to the time `now_of` reports for its time source. Completed
    /// fields are removed and their callbacks collected.
    pub fn tick(&mut self, now_of: impl Fn(Option<&str>) -> f64) -> TransitionTick {
        let mut tick = TransitionTick::default();
        let mut done = Vec::new();
        for t in self.buckets.values() {
            for (field, ft) in &t.fields {
                let (value, complete) = ft.value_at(now_of(ft.time_type.as_deref()));
                tick.writes.push((t.path.clone(), field.clone(), value));
                if complete {
                    done.push((t.path.clone(), field.clone()));
                }
            }
        }
        for (path, field) in done {
            if let Some(fired) = self.remove(&path, Some(field.as_str()), false, false) {
                tick.fired.extend(fired);
            }
        }
        tick
    }
}

fn field_kind(field: &str, current: Option<&Value>, target: &Value) -> Option<FieldKind> {
    if COLOR_FIELDS.contains(&field) {
        let (Some(from), Some(to)) = (current.and_then(Value::as_str), target.as_str()) else {
            tracing::warn!(field, "colour transition needs a start and an end colour");
            return None;
        };
        return match (parse_color(from), parse_color(to)) {
            (Ok(from), Ok(to)) => Some(FieldKind::Color {
                gradient: Gradient::between(from, to),
                target: target.clone(),
            }),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(field, error = %e, "unparseable colour");
                None
            }
        };
    }
    match (current.and_then(Value::coerce_f64), target.coerce_f64()) {
        (Some(from), Some(to)) => Some(FieldKind::Numeric { from, to }),
        _ => {
            tracing::warn!(field, "numeric transition needs numeric start and end values");
            None
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transition/table.rs"]
mod tests;
