pub mod config;
pub mod document;

use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{
    foundation::{
        core::{Surface, SurfaceSpec},
        error::EngineResult,
    },
    registry::Registry,
    schedule::{
        clock::{Clock, SystemClock},
        pipeline::Pipeline,
        timer::TimerQueue,
    },
    settings::{path::Path, store::SettingsStore, value::Value},
    transition::table::TransitionTable,
};

pub use config::EngineConfig;
pub use document::EngineDocument;

/// Host object serving `inController` actions and `conditionInController` guards.
pub trait Controller {
    /// Call `method` with `args`.
    fn call(&mut self, method: &str, args: &[Value]) -> anyhow::Result<Value>;
}

/// One animation engine: a settings tree, surfaces, pipelines and their timers, sharing a
/// frozen [`Registry`].
pub struct Engine {
    pub(crate) registry: Arc<Registry>,
    pub(crate) config: EngineConfig,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) settings: SettingsStore,
    pub(crate) surfaces: BTreeMap<String, Surface>,
    pub(crate) pipelines: BTreeMap<String, Pipeline>,
    pub(crate) timers: TimerQueue,
    pub(crate) transitions: TransitionTable,
    base_times: BTreeMap<String, f64>,
    media_position_ms: Option<f64>,
    current_time: Option<f64>,
    controller: Option<Box<dyn Controller>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("surfaces", &self.surfaces.keys().collect::<Vec<_>>())
            .field("pipelines", &self.pipelines.keys().collect::<Vec<_>>())
            .field("pending_timers", &self.timers.len())
            .field("transitions", &self.transitions.len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Engine on the wall clock with default configuration.
    pub fn new(registry: Arc<Registry>) -> EngineResult<Self> {
        Self::with_clock(registry, EngineConfig::default(), Arc::new(SystemClock::new()))
    }

    /// Engine on `clock` with `config`.
    ///
    /// Fails when a registered renderer or action has an unmet dependency. Runs the
    /// initialisers and resetters before returning.
    pub fn with_clock(
        registry: Arc<Registry>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> EngineResult<Self> {
        registry.check_all_dependencies()?;
        let mut engine = Self {
            registry,
            config,
            clock,
            settings: SettingsStore::new(),
            surfaces: BTreeMap::new(),
            pipelines: BTreeMap::new(),
            timers: TimerQueue::default(),
            transitions: TransitionTable::default(),
            base_times: BTreeMap::new(),
            media_position_ms: None,
            current_time: None,
            controller: None,
        };
        engine.init();
        Ok(engine)
    }

    /// Drop pipelines, surfaces and settings, run every initialiser, then reset without
    /// clearing.
    pub fn init(&mut self) {
        self.pipelines.clear();
        self.timers.clear();
        self.surfaces.clear();
        self.settings = SettingsStore::new();
        for (name, hook) in self.registry.initialisers() {
            if let Err(e) = hook(self, false) {
                tracing::warn!(initialiser = %name, error = %e, "initialiser failed");
            }
        }
        self.reset(true);
    }

    /// Unless `skip_clear`, stop and drop every pipeline and clear the settings; then run
    /// every resetter.
    pub fn reset(&mut self, skip_clear: bool) {
        if !skip_clear {
            self.clear_pipelines();
            self.settings.clear(None);
        }
        for (name, hook) in self.registry.resetters() {
            if let Err(e) = hook(self, skip_clear) {
                tracing::warn!(resetter = %name, error = %e, "resetter failed");
            }
        }
    }

    /// Run the resetter registered as `name`. Returns false when there is none.
    pub fn call_resetter(&mut self, name: &str, skip_clear: bool) -> bool {
        let Some(hook) = self.registry.resetter(name) else {
            tracing::warn!(resetter = name, "no resetter with that name");
            return false;
        };
        if let Err(e) = hook(self, skip_clear) {
            tracing::warn!(resetter = name, error = %e, "resetter failed");
        }
        true
    }

    /// Shared registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Time source.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Install the controller used by `inController` stages.
    pub fn set_controller(&mut self, controller: Box<dyn Controller>) {
        self.controller = Some(controller);
    }

    pub(crate) fn call_controller(
        &mut self,
        method: &str,
        args: &[Value],
    ) -> anyhow::Result<Value> {
        match self.controller.as_mut() {
            Some(c) => c.call(method, args),
            None => anyhow::bail!("no controller installed for '{method}'"),
        }
    }

    // Settings

    /// Read-only view of the settings tree.
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Direct access to the settings tree. Writes through it notify nobody.
    pub fn settings_mut(&mut self) -> &mut SettingsStore {
        &mut self.settings
    }

    /// Value at `path`; see [`SettingsStore::get`].
    pub fn get_settings(&self, path: &Path, allow_missing: bool) -> Option<&Value> {
        self.settings.get(path, allow_missing)
    }

    /// Write `value` at `path` and tell the adjust listeners about each changed field.
    pub fn adjust_settings(&mut self, path: &Path, value: Value, clear: bool) {
        let changed = self.settings.adjust(path, value, clear);
        self.notify_adjusted(path, &changed);
    }

    /// Copy the value at `source` to `path`, notifying like [`Engine::adjust_settings`].
    pub fn copy_settings(&mut self, path: &Path, source: &Path, clear: bool) {
        let changed = self.settings.copy(path, source, clear);
        self.notify_adjusted(path, &changed);
    }

    /// Delete the subtree at `path`, or everything for `None`.
    pub fn clear_settings(&mut self, path: Option<&Path>) {
        self.settings.clear(path);
    }

    fn notify_adjusted(&mut self, path: &Path, changed: &[String]) {
        if changed.is_empty() {
            return;
        }
        let listeners = self.registry.adjust_callbacks().to_vec();
        for field in changed {
            for listener in &listeners {
                listener(self, path, field, true);
            }
        }
    }

    // Surfaces

    /// Register a surface, replacing any of the same name.
    pub fn add_surface(&mut self, name: &str, spec: SurfaceSpec) -> Surface {
        let surface = Surface::new(name, spec);
        if self.surfaces.insert(name.to_owned(), surface.clone()).is_some() {
            tracing::warn!(surface = name, "replacing surface");
        }
        surface
    }

    /// Forget a surface.
    pub fn remove_surface(&mut self, name: &str) -> Option<Surface> {
        self.surfaces.remove(name)
    }

    /// Forget all surfaces.
    pub fn clear_surfaces(&mut self) {
        self.surfaces.clear();
    }

    /// Look up a surface.
    pub fn surface(&self, name: &str) -> Option<&Surface> {
        self.surfaces.get(name)
    }

    /// All surfaces by name.
    pub fn surfaces(&self) -> impl Iterator<Item = (&str, &Surface)> {
        self.surfaces.iter().map(|(n, s)| (n.as_str(), s))
    }

    // Time

    /// Time in the units of `time_type` (the configured default when `None`).
    ///
    /// Without a getter for that type the explicit time is returned, or zero.
    pub fn get_time(&self, time_type: Option<&str>, explicit: Option<f64>) -> f64 {
        let time_type = time_type.unwrap_or(&self.config.default_time_type);
        match self.registry.time_getter(time_type) {
            Some(getter) => getter(self, explicit),
            None => {
                tracing::debug!(time_type, "no time getter registered");
                explicit.unwrap_or(0.0)
            }
        }
    }

    /// Clock milliseconds a time getter measures from.
    pub fn base_time(&self, name: &str) -> Option<f64> {
        self.base_times.get(name).copied()
    }

    /// Set the baseline of a time getter.
    pub fn set_base_time(&mut self, name: &str, ms: f64) {
        self.base_times.insert(name.to_owned(), ms);
    }

    /// Forget every time getter baseline.
    pub fn clear_base_times(&mut self) {
        self.base_times.clear();
    }

    /// Position of the external media element in milliseconds.
    pub fn set_media_position(&mut self, ms: Option<f64>) {
        self.media_position_ms = ms;
    }

    /// See [`Engine::set_media_position`].
    pub fn media_position_ms(&self) -> Option<f64> {
        self.media_position_ms
    }

    /// Pin the time new transitions start at; `None` unpins.
    pub fn set_current_time(&mut self, time: Option<f64>) {
        self.current_time = time;
    }

    /// See [`Engine::set_current_time`].
    pub fn current_time(&self) -> Option<f64> {
        self.current_time
    }
}

#[cfg(test)]
#[path = "../tests/unit/engine/engine.rs"]
mod tests;
