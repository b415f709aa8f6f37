pub mod dependency;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

use crate::{
    engine::Engine,
    foundation::{
        core::Surface,
        error::{EngineError, EngineResult},
    },
    settings::{path::Path, value::Value},
    stage::{model::StageDescriptor, outcome::Outcome},
};

pub use dependency::{Dependency, DependencyKind};

/// Everything a renderer receives for one invocation.
#[derive(Clone, Debug)]
pub struct RenderCall<'a> {
    /// Current source surface.
    pub source: Option<Surface>,
    /// Current destination surface.
    pub destination: Option<Surface>,
    /// Resolved renderer settings (null when the stage gave none).
    pub settings: Value,
    /// Pipeline being ticked, if any.
    pub pipeline: Option<&'a str>,
    /// The descriptor that named the renderer.
    pub stage: Arc<StageDescriptor>,
}

/// Renderer callback.
pub type RenderFn =
    Arc<dyn Fn(&mut Engine, RenderCall<'_>) -> anyhow::Result<Outcome> + Send + Sync>;
/// Action callback.
pub type ActionFn = Arc<dyn Fn(&mut Engine, &[Value]) -> anyhow::Result<Value> + Send + Sync>;
/// Initialiser or resetter; the flag is `skip_clear` for resetters and unused otherwise.
pub type HookFn = Arc<dyn Fn(&mut Engine, bool) -> anyhow::Result<()> + Send + Sync>;
/// Time getter: maps an optional explicit time to seconds.
pub type TimeGetterFn = Arc<dyn Fn(&Engine, Option<f64>) -> f64 + Send + Sync>;
/// Listener told about every top-level field an adjust changed: `(path, field, changed)`.
pub type AdjustFn = Arc<dyn Fn(&mut Engine, &Path, &str, bool) + Send + Sync>;
/// Hook run at the start of every pipeline tick with the pipeline name.
pub type TickFn = Arc<dyn Fn(&mut Engine, &str) + Send + Sync>;

/// Named renderer registration.
#[derive(Clone)]
pub struct RendererDef {
    /// Registered name.
    pub name: String,
    /// Version compared by dependencies.
    pub version: u32,
    /// The callback.
    pub renderer: RenderFn,
    /// What this renderer needs.
    pub dependencies: Vec<Dependency>,
}

impl RendererDef {
    /// Version 0 renderer without dependencies.
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&mut Engine, RenderCall<'_>) -> anyhow::Result<Outcome> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            version: 0,
            renderer: Arc::new(f),
            dependencies: Vec::new(),
        }
    }

    /// Builder-style version setter.
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Builder-style dependency.
    pub fn depends_on(mut self, dep: Dependency) -> Self {
        self.dependencies.push(dep);
        self
    }
}

impl fmt::Debug for RendererDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererDef")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// An action is either a method or a plain value returned as-is.
#[derive(Clone)]
pub enum ActionKind {
    /// Callable action.
    Method(ActionFn),
    /// Constant returned by every call.
    Value(Value),
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(_) => f.write_str("Method(..)"),
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// Named action registration.
#[derive(Clone, Debug)]
pub struct ActionDef {
    /// Registered name.
    pub name: String,
    /// Version compared by dependencies and replacements.
    pub version: u32,
    /// Method or value.
    pub kind: ActionKind,
    /// What this action needs.
    pub dependencies: Vec<Dependency>,
}

impl ActionDef {
    /// Version 0 method action.
    pub fn method(
        name: impl Into<String>,
        f: impl Fn(&mut Engine, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            version: 0,
            kind: ActionKind::Method(Arc::new(f)),
            dependencies: Vec::new(),
        }
    }

    /// Version 0 value action.
    pub fn value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            version: 0,
            kind: ActionKind::Value(value.into()),
            dependencies: Vec::new(),
        }
    }

    /// Builder-style version setter.
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Builder-style dependency.
    pub fn depends_on(mut self, dep: Dependency) -> Self {
        self.dependencies.push(dep);
        self
    }
}

/// Process-wide tables of renderers, actions and hooks.
///
/// Built once at startup, then frozen behind an `Arc` and shared by every engine.
#[derive(Default)]
pub struct Registry {
    renderers: BTreeMap<String, RendererDef>,
    actions: BTreeMap<String, ActionDef>,
    reserved: BTreeSet<String>,
    initialisers: Vec<(String, HookFn)>,
    resetters: Vec<(String, HookFn)>,
    time_getters: BTreeMap<String, TimeGetterFn>,
    adjust_callbacks: Vec<AdjustFn>,
    tick_callbacks: Vec<TickFn>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("renderers", &self.renderers.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field(
                "initialisers",
                &self.initialisers.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field(
                "resetters",
                &self.resetters.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field("time_getters", &self.time_getters.keys().collect::<Vec<_>>())
            .field("adjust_callbacks", &self.adjust_callbacks.len())
            .field("tick_callbacks", &self.tick_callbacks.len())
            .finish()
    }
}

impl Registry {
    /// Empty registry: no core actions, no built-ins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the core actions, the transition engine and the built-in renderers,
    /// actions and time getters installed.
    pub fn standard() -> EngineResult<Self> {
        let mut registry = Self::new();
        crate::builtin::install(&mut registry)?;
        crate::transition::install(&mut registry)?;
        Ok(registry)
    }

    /// Register a renderer. A duplicate name keeps the first registration.
    pub fn add_renderer(&mut self, def: RendererDef) -> EngineResult<bool> {
        if def.name.is_empty() {
            return Err(EngineError::config("renderer registered without a name"));
        }
        if self.renderers.contains_key(&def.name) {
            tracing::warn!(renderer = %def.name, "renderer already registered; ignoring");
            return Ok(false);
        }
        tracing::debug!(renderer = %def.name, version = def.version, "renderer registered");
        self.renderers.insert(def.name.clone(), def);
        Ok(true)
    }

    /// Register an action.
    ///
    /// Core action names cannot be replaced. Replacing an existing action needs an equal or
    /// higher version.
    pub fn add_action(&mut self, def: ActionDef) -> EngineResult<()> {
        if def.name.is_empty() {
            return Err(EngineError::config("action registered without a name"));
        }
        if self.reserved.contains(&def.name) {
            return Err(EngineError::config(format!(
                "action '{}' is a core action and cannot be replaced",
                def.name
            )));
        }
        if let Some(existing) = self.actions.get(&def.name) {
            if existing.version > def.version {
                return Err(EngineError::config(format!(
                    "action '{}' version {} cannot replace version {}",
                    def.name, def.version, existing.version
                )));
            }
            tracing::warn!(
                action = %def.name,
                old = existing.version,
                new = def.version,
                "replacing action"
            );
        }
        self.actions.insert(def.name.clone(), def);
        Ok(())
    }

    /// Register several actions; stops at the first rejected one.
    pub fn add_actions(&mut self, defs: impl IntoIterator<Item = ActionDef>) -> EngineResult<()> {
        for def in defs {
            self.add_action(def)?;
        }
        Ok(())
    }

    /// Register a core action whose name can never be replaced afterwards.
    pub(crate) fn add_core_action(&mut self, def: ActionDef) -> EngineResult<()> {
        let name = def.name.clone();
        self.add_action(def)?;
        self.reserved.insert(name);
        Ok(())
    }

    /// Register a named initialiser run by [`Engine::init`]. Duplicates are ignored.
    pub fn add_initialiser(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&mut Engine, bool) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> bool {
        add_named_hook(&mut self.initialisers, "initialiser", name.into(), Arc::new(f))
    }

    /// Register a named resetter run by [`Engine::reset`]. Duplicates are ignored.
    pub fn add_resetter(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&mut Engine, bool) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> bool {
        add_named_hook(&mut self.resetters, "resetter", name.into(), Arc::new(f))
    }

    /// Register a named time getter. Duplicates are ignored.
    pub fn add_time_getter(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Engine, Option<f64>) -> f64 + Send + Sync + 'static,
    ) -> bool {
        let name = name.into();
        if self.time_getters.contains_key(&name) {
            tracing::warn!(time_getter = %name, "time getter already registered; ignoring");
            return false;
        }
        self.time_getters.insert(name, Arc::new(f));
        true
    }

    /// Register a settings-adjust listener.
    pub fn add_adjust_callback(
        &mut self,
        f: impl Fn(&mut Engine, &Path, &str, bool) + Send + Sync + 'static,
    ) {
        self.adjust_callbacks.push(Arc::new(f));
    }

    /// Register a hook run at the start of every pipeline tick.
    pub fn add_pipe_process_callback(
        &mut self,
        f: impl Fn(&mut Engine, &str) + Send + Sync + 'static,
    ) {
        self.tick_callbacks.push(Arc::new(f));
    }

    /// Look up a renderer.
    pub fn renderer(&self, name: &str) -> Option<&RendererDef> {
        self.renderers.get(name)
    }

    /// Look up an action.
    pub fn action(&self, name: &str) -> Option<&ActionDef> {
        self.actions.get(name)
    }

    /// Look up a time getter.
    pub fn time_getter(&self, name: &str) -> Option<&TimeGetterFn> {
        self.time_getters.get(name)
    }

    /// Whether `name` is a core action.
    pub fn is_core_action(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    /// Registered renderer names.
    pub fn renderer_names(&self) -> impl Iterator<Item = &str> {
        self.renderers.keys().map(String::as_str)
    }

    /// Registered action names.
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub(crate) fn initialisers(&self) -> Vec<(String, HookFn)> {
        self.initialisers.clone()
    }

    pub(crate) fn resetters(&self) -> Vec<(String, HookFn)> {
        self.resetters.clone()
    }

    pub(crate) fn resetter(&self, name: &str) -> Option<HookFn> {
        self.resetters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| Arc::clone(f))
    }

    pub(crate) fn adjust_callbacks(&self) -> &[AdjustFn] {
        &self.adjust_callbacks
    }

    pub(crate) fn tick_callbacks(&self) -> &[TickFn] {
        &self.tick_callbacks
    }

    /// Check `deps` on behalf of `owner`.
    ///
    /// A missing target or one below the required version is a configuration error. Unknown
    /// dependency kinds are logged and ignored.
    pub fn check_dependencies(&self, owner: &str, deps: &[Dependency]) -> EngineResult<()> {
        for dep in deps {
            let found = match dep.kind {
                DependencyKind::Renderer => self.renderers.get(&dep.name).map(|d| d.version),
                DependencyKind::Action => self.actions.get(&dep.name).map(|d| d.version),
                DependencyKind::Unknown => {
                    tracing::debug!(
                        owner,
                        dependency = %dep.name,
                        "unknown dependency kind; ignoring"
                    );
                    continue;
                }
            };
            let kind = match dep.kind {
                DependencyKind::Renderer => "renderer",
                _ => "action",
            };
            match found {
                None => {
                    return Err(EngineError::config(format!(
                        "'{owner}' needs {kind} '{}', which is not registered",
                        dep.name
                    )));
                }
                Some(have) => {
                    if let Some(need) = dep.version.filter(|need| *need > have) {
                        return Err(EngineError::config(format!(
                            "'{owner}' needs {kind} '{}' version {need}, found version {have}",
                            dep.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Check the dependencies of every registered renderer and action.
    pub fn check_all_dependencies(&self) -> EngineResult<()> {
        for def in self.renderers.values() {
            self.check_dependencies(&def.name, &def.dependencies)?;
        }
        for def in self.actions.values() {
            self.check_dependencies(&def.name, &def.dependencies)?;
        }
        Ok(())
    }
}

fn add_named_hook(hooks: &mut Vec<(String, HookFn)>, what: &str, name: String, f: HookFn) -> bool {
    if hooks.iter().any(|(n, _)| *n == name) {
        tracing::warn!(hook = what, name = %name, "already registered; ignoring");
        return false;
    }
    hooks.push((name, f));
    true
}

#[cfg(test)]
#[path = "../tests/unit/registry/registry.rs"]
mod tests;
