use std::{fmt, sync::Arc};

use serde::de::Error as _;

use crate::{
    engine::Engine,
    foundation::{
        core::Surface,
        error::{EngineError, EngineResult},
    },
    settings::{
        path::Path,
        value::{Mapping, Value},
    },
    stage::outcome::Outcome,
};

/// Arguments handed to a stage callback.
#[derive(Clone, Debug)]
pub struct StageCall<'a> {
    /// Current source surface.
    pub source: Option<Surface>,
    /// Current destination surface.
    pub destination: Option<Surface>,
    /// Pipeline being ticked, if any.
    pub pipeline: Option<&'a str>,
}

/// Signature of a stage callback.
pub type StageFn = dyn Fn(&mut Engine, StageCall<'_>) -> anyhow::Result<Outcome> + Send + Sync;

/// Signature of a condition callback; the result is judged by truthiness.
pub type ConditionFn = dyn Fn(&mut Engine, &[Value]) -> anyhow::Result<Value> + Send + Sync;

/// Shared callable stage. Equality is identity of the underlying closure.
#[derive(Clone)]
pub struct StageCallback(Arc<StageFn>);

impl StageCallback {
    /// Wrap a closure.
    pub fn new(
        f: impl Fn(&mut Engine, StageCall<'_>) -> anyhow::Result<Outcome> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, engine: &mut Engine, call: StageCall<'_>) -> anyhow::Result<Outcome> {
        (self.0)(engine, call)
    }
}

impl PartialEq for StageCallback {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for StageCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StageCallback(..)")
    }
}

/// Shared condition predicate. Equality is identity of the underlying closure.
#[derive(Clone)]
pub struct ConditionCallback(Arc<ConditionFn>);

impl ConditionCallback {
    /// Wrap a closure.
    pub fn new(
        f: impl Fn(&mut Engine, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, engine: &mut Engine, args: &[Value]) -> anyhow::Result<Value> {
        (self.0)(engine, args)
    }
}

impl PartialEq for ConditionCallback {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ConditionCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConditionCallback(..)")
    }
}

/// One executable step.
#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    /// Nested list, processed recursively.
    List(Vec<Stage>),
    /// Callable invoked with the current surfaces.
    Callback(StageCallback),
    /// Declarative descriptor.
    Descriptor(Arc<StageDescriptor>),
    /// Settings path whose value is parsed as a stage at processing time.
    Ref(Path),
}

impl Stage {
    /// Parse a settings value into a stage.
    ///
    /// A sequence made only of keys is a settings reference; any other sequence is a nested
    /// list. Mappings are descriptors and text is a one-key reference.
    pub fn from_value(v: &Value) -> EngineResult<Self> {
        match v {
            Value::Sequence(items) if items.is_empty() => Ok(Self::List(Vec::new())),
            Value::Sequence(items) => {
                if let Some(path) = Path::from_value(v) {
                    return Ok(Self::Ref(path));
                }
                let mut stages = Vec::with_capacity(items.len());
                for item in items {
                    match Self::from_value(item) {
                        Ok(stage) => stages.push(stage),
                        Err(e) => tracing::warn!(error = %e, "dropping unrecognized stage"),
                    }
                }
                Ok(Self::List(stages))
            }
            Value::Mapping(_) => Ok(Self::Descriptor(Arc::new(StageDescriptor::from_value(v)?))),
            Value::Text(name) => Ok(Self::Ref(Path::from(name.as_str()))),
            other => Err(EngineError::stage(format!(
                "a {} cannot be used as a stage",
                other.kind_name()
            ))),
        }
    }

    /// Wrap a descriptor.
    pub fn descriptor(d: StageDescriptor) -> Self {
        Self::Descriptor(Arc::new(d))
    }

    /// Wrap a closure.
    pub fn callback(
        f: impl Fn(&mut Engine, StageCall<'_>) -> anyhow::Result<Outcome> + Send + Sync + 'static,
    ) -> Self {
        Self::Callback(StageCallback::new(f))
    }

    /// Whether a descriptor asked to keep the incoming source.
    pub fn keeps_source(&self) -> bool {
        matches!(self, Self::Descriptor(d) if d.keep_source)
    }
}

/// A stage list as written in pipeline definitions and descriptors.
#[derive(Clone, Debug, PartialEq)]
pub enum StageList {
    /// Stages given in place.
    Inline(Vec<Stage>),
    /// Settings path holding the list.
    Ref(Path),
}

impl Default for StageList {
    fn default() -> Self {
        Self::Inline(Vec::new())
    }
}

impl StageList {
    /// Parse a settings value into a stage list.
    ///
    /// A sequence made only of keys is a settings reference, falling back to one-key
    /// references per element at processing time when it resolves to nothing.
    pub fn from_value(v: &Value) -> EngineResult<Self> {
        match v {
            Value::Text(name) => Ok(Self::Ref(Path::from(name.as_str()))),
            Value::Sequence(_) | Value::Mapping(_) => match Stage::from_value(v)? {
                Stage::List(stages) => Ok(Self::Inline(stages)),
                Stage::Ref(path) => Ok(Self::Ref(path)),
                single => Ok(Self::Inline(vec![single])),
            },
            other => Err(EngineError::stage(format!(
                "a {} cannot be used as a stage list",
                other.kind_name()
            ))),
        }
    }

    /// Stages given in place.
    pub fn inline(stages: impl IntoIterator<Item = Stage>) -> Self {
        Self::Inline(stages.into_iter().collect())
    }

    /// True for an empty inline list.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Inline(s) if s.is_empty())
    }
}

impl<'de> serde::Deserialize<'de> for StageList {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        Self::from_value(&v).map_err(D::Error::custom)
    }
}

/// Where a descriptor's source or destination comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceRef {
    /// Registered surface name.
    Named(String),
    /// Surface handle given directly.
    Handle(Surface),
}

impl<'de> serde::Deserialize<'de> for SurfaceRef {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let name = String::deserialize(d)?;
        Ok(Self::Named(name))
    }
}

/// Settings passed to a renderer.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingsRef {
    /// Look the settings up at this path.
    Path(Path),
    /// Use this value as-is.
    Inline(Value),
}

impl<'de> serde::Deserialize<'de> for SettingsRef {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(match &v {
            Value::Text(_) | Value::Sequence(_) => match Path::from_value(&v) {
                Some(path) => Self::Path(path),
                None => Self::Inline(v),
            },
            _ => Self::Inline(v),
        })
    }
}

/// Guard on a descriptor.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Fixed truth value.
    Bool(bool),
    /// Name of an action (or controller method) called with the condition arguments.
    Method(String),
    /// Settings path; truthiness of the stored value.
    Path(Path),
    /// Predicate closure called with the condition arguments.
    Callback(ConditionCallback),
    /// Nested descriptor processed as a stage: continue is true, skip is false.
    Stage(Arc<StageDescriptor>),
}

impl Condition {
    /// Parse a settings value into a condition. Numbers and null are judged by truthiness.
    pub fn from_value(v: &Value) -> EngineResult<Self> {
        match v {
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Text(name) => Ok(Self::Method(name.clone())),
            Value::Sequence(_) => Path::from_value(v)
                .map(Self::Path)
                .ok_or_else(|| EngineError::stage("condition path holds a non-key element")),
            Value::Mapping(_) => Ok(Self::Stage(Arc::new(StageDescriptor::from_value(v)?))),
            other => Ok(Self::Bool(other.is_truthy())),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Condition {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        Self::from_value(&v).map_err(D::Error::custom)
    }
}

/// Declarative stage: a guard, surface overrides and one verb.
///
/// Exactly one verb runs, in priority order `action`, `render`, `stages`. Keys the engine
/// does not interpret are kept in `extra` for renderers to read.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageDescriptor {
    /// Guard; a false guard skips the stage, an abort aborts the list.
    pub condition: Option<Condition>,
    /// Negate the guard.
    pub negate: bool,
    /// Arguments for method and callback guards; defaults to the descriptor itself.
    pub condition_arguments: Option<Vec<Value>>,
    /// Call a method guard on the controller instead of the action table.
    pub condition_in_controller: bool,
    /// Source override.
    pub source: Option<SurfaceRef>,
    /// Destination override.
    pub destination: Option<SurfaceRef>,
    /// Do not thread this stage's source forward.
    pub keep_source: bool,
    /// Action to run.
    pub action: Option<String>,
    /// Action arguments.
    pub arguments: Vec<Value>,
    /// Call the action on the controller instead of the action table.
    pub in_controller: bool,
    /// Renderer to run.
    pub render: Option<String>,
    /// Renderer settings.
    pub settings: Option<SettingsRef>,
    /// Nested stage list.
    pub stages: Option<StageList>,
    /// Keys the engine does not interpret.
    #[serde(flatten)]
    pub extra: Mapping,
}

impl StageDescriptor {
    /// Parse a mapping value into a descriptor.
    pub fn from_value(v: &Value) -> EngineResult<Self> {
        serde_json::from_value(v.to_json()).map_err(|e| EngineError::stage(e.to_string()))
    }

    /// Descriptor running the named action.
    pub fn action(name: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            action: Some(name.into()),
            arguments,
            ..Self::default()
        }
    }

    /// Descriptor running the named renderer.
    pub fn render(name: impl Into<String>) -> Self {
        Self {
            render: Some(name.into()),
            ..Self::default()
        }
    }

    /// Builder-style condition setter.
    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Builder-style settings setter.
    pub fn with_settings(mut self, settings: SettingsRef) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Builder-style nested stages setter.
    pub fn with_stages(mut self, stages: StageList) -> Self {
        self.stages = Some(stages);
        self
    }

    /// Builder-style setter for an uninterpreted key.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Uninterpreted key read by renderers (`count`, `maxLoop`, ...).
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Settings view of the descriptor, used as the default condition argument.
    pub fn to_value(&self) -> Value {
        let mut m = self.extra.clone();
        if let Some(action) = &self.action {
            m.insert("action".to_owned(), Value::from(action.as_str()));
        }
        if let Some(render) = &self.render {
            m.insert("render".to_owned(), Value::from(render.as_str()));
        }
        if !self.arguments.is_empty() {
            m.insert("arguments".to_owned(), Value::Sequence(self.arguments.clone()));
        }
        match &self.condition {
            Some(Condition::Bool(b)) => {
                m.insert("condition".to_owned(), Value::Bool(*b));
            }
            Some(Condition::Method(name)) => {
                m.insert("condition".to_owned(), Value::from(name.as_str()));
            }
            Some(Condition::Path(p)) => {
                m.insert("condition".to_owned(), p.to_value());
            }
            _ => {}
        }
        match &self.settings {
            Some(SettingsRef::Path(p)) => {
                m.insert("settings".to_owned(), p.to_value());
            }
            Some(SettingsRef::Inline(v)) => {
                m.insert("settings".to_owned(), v.clone());
            }
            None => {}
        }
        if self.negate {
            m.insert("negate".to_owned(), Value::Bool(true));
        }
        if self.keep_source {
            m.insert("keepSource".to_owned(), Value::Bool(true));
        }
        Value::Mapping(m)
    }
}

/// Fallback for a key-only list that resolved to nothing: one reference per key.
pub(crate) fn split_ref(path: &Path) -> Vec<Stage> {
    path.keys()
        .iter()
        .map(|k| Stage::Ref(Path::new(vec![k.clone()])))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/stage/model.rs"]
mod tests;
