use crate::{
    engine::Engine,
    foundation::error::{EngineError, EngineResult},
    registry::Dependency,
    schedule::timer::TimerId,
    settings::{path::Path, value::Value},
    stage::{
        model::{Stage, StageList},
        outcome::Flow,
    },
};

/// Declarative pipeline: stage lists for each lifecycle step plus its settings path.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineDef {
    /// Stages run on every tick.
    pub stages: StageList,
    /// Stages run when the pipeline is initialised.
    pub init_stages: Option<StageList>,
    /// Stages run when the pipeline starts.
    pub start_stages: Option<StageList>,
    /// Stages run when the pipeline stops.
    pub stop_stages: Option<StageList>,
    /// Settings path holding `fps`, `autoEnable` and pipeline-local data.
    pub settings: Option<Path>,
    /// Renderers and actions this pipeline needs.
    pub dependencies: Vec<Dependency>,
}

impl PipelineDef {
    /// Pipeline ticking `stages`.
    pub fn new(stages: StageList) -> Self {
        Self {
            stages,
            ..Self::default()
        }
    }

    /// Builder-style settings path.
    pub fn with_settings(mut self, path: impl Into<Path>) -> Self {
        self.settings = Some(path.into());
        self
    }
}

/// Lifecycle state of a registered pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// Registered (and initialised) but not ticking.
    Initialized,
    /// Ticking on its own timer.
    Running,
}

/// Where [`Engine::push_auto_stage`] puts the stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoStageMode {
    /// After the already queued ones.
    Append,
    /// Before the already queued ones.
    Prepend,
    /// Append unless an equal stage is already queued.
    Single,
}

/// A registered pipeline.
#[derive(Clone, Debug)]
pub struct Pipeline {
    pub(crate) def: PipelineDef,
    pub(crate) state: PipelineState,
    pub(crate) timer: Option<TimerId>,
    pub(crate) last_tick_ms: Option<f64>,
    pub(crate) last_delay_ms: Option<f64>,
    pub(crate) auto_stages: Vec<Stage>,
    pub(crate) ticks: u64,
}

impl Pipeline {
    fn new(def: PipelineDef) -> Self {
        Self {
            def,
            state: PipelineState::Initialized,
            timer: None,
            last_tick_ms: None,
            last_delay_ms: None,
            auto_stages: Vec::new(),
            ticks: 0,
        }
    }

    /// The definition it was added with.
    pub fn def(&self) -> &PipelineDef {
        &self.def
    }

    /// Lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Whether the pipeline is ticking.
    pub fn is_running(&self) -> bool {
        self.state == PipelineState::Running
    }

    /// Baseline time of the last tick (or of the start), in clock milliseconds.
    pub fn last_tick_ms(&self) -> Option<f64> {
        self.last_tick_ms
    }

    /// Delay chosen when the last tick rescheduled itself.
    pub fn last_delay_ms(&self) -> Option<f64> {
        self.last_delay_ms
    }

    /// Number of completed ticks since it was added.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Engine {
    /// Register a pipeline under `name`, check its dependencies, run its init stages and
    /// start it when its settings have a truthy `autoEnable`.
    ///
    /// A running pipeline of the same name is not replaced.
    pub fn add_pipeline(&mut self, name: &str, def: PipelineDef) -> EngineResult<()> {
        if self.pipelines.get(name).is_some_and(Pipeline::is_running) {
            return Err(EngineError::config(format!(
                "pipeline '{name}' is running and cannot be replaced"
            )));
        }
        self.registry
            .check_dependencies(&format!("pipeline {name}"), &def.dependencies)?;
        self.pipelines.insert(name.to_owned(), Pipeline::new(def));
        tracing::debug!(pipeline = name, "pipeline added");
        self.init_pipeline(name, true)?;
        if self
            .pipeline_setting(name, "autoEnable")
            .is_some_and(Value::is_truthy)
        {
            self.start_pipeline(name)?;
        }
        Ok(())
    }

    /// Look up a pipeline.
    pub fn pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.get(name)
    }

    /// Names of all registered pipelines.
    pub fn pipeline_names(&self) -> Vec<String> {
        self.pipelines.keys().cloned().collect()
    }

    /// Names of the pipelines currently ticking.
    pub fn running_pipelines(&self) -> Vec<String> {
        self.pipelines
            .iter()
            .filter(|(_, p)| p.is_running())
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Run the init stages of `name` unless it is running.
    pub fn init_pipeline(&mut self, name: &str, quiet: bool) -> EngineResult<()> {
        let Some(p) = self.pipelines.get(name) else {
            tracing::warn!(pipeline = name, "init of unknown pipeline");
            return Ok(());
        };
        if p.is_running() {
            tracing::warn!(pipeline = name, "cannot init a running pipeline");
            return Ok(());
        }
        match p.def.init_stages.clone() {
            Some(stages) => {
                self.process_stages(&stages, Some(name), None, None)?;
            }
            None if !quiet => tracing::debug!(pipeline = name, "pipeline has no init stages"),
            None => {}
        }
        Ok(())
    }

    /// Start ticking `name`: record the baseline, run the start stages and schedule the
    /// first tick one frame later.
    pub fn start_pipeline(&mut self, name: &str) -> EngineResult<()> {
        let Some(p) = self.pipelines.get(name) else {
            tracing::warn!(pipeline = name, "start of unknown pipeline");
            return Ok(());
        };
        if p.is_running() {
            tracing::warn!(pipeline = name, "pipeline already running");
            return Ok(());
        }
        let start_stages = p.def.start_stages.clone();
        let now = self.clock.now_ms();
        if let Some(p) = self.pipelines.get_mut(name) {
            p.last_tick_ms = Some(now);
        }
        if let Some(stages) = start_stages {
            self.process_stages(&stages, Some(name), None, None)?;
        }
        let delay = 1000.0 / self.pipeline_fps(name);
        let id = self.timers.schedule(name, now + delay);
        if let Some(p) = self.pipelines.get_mut(name) {
            p.state = PipelineState::Running;
            p.timer = Some(id);
            p.last_delay_ms = Some(delay);
        }
        tracing::debug!(pipeline = name, delay_ms = delay, "pipeline started");
        Ok(())
    }

    /// Stop ticking `name` and run its stop stages. Stopping a pipeline that is not running
    /// warns unless `quiet`.
    pub fn stop_pipeline(&mut self, name: &str, quiet: bool) -> EngineResult<()> {
        let Some(p) = self.pipelines.get_mut(name) else {
            tracing::warn!(pipeline = name, "stop of unknown pipeline");
            return Ok(());
        };
        if !p.is_running() {
            if !quiet {
                tracing::warn!(pipeline = name, "pipeline is not running");
            }
            return Ok(());
        }
        p.state = PipelineState::Initialized;
        p.timer = None;
        let stop_stages = p.def.stop_stages.clone();
        self.timers.retain(|pipeline, _| pipeline != name);
        tracing::debug!(pipeline = name, "pipeline stopped");
        if let Some(stages) = stop_stages {
            self.process_stages(&stages, Some(name), None, None)?;
        }
        Ok(())
    }

    /// Stop every pipeline quietly and forget them all.
    pub fn clear_pipelines(&mut self) {
        for name in self.running_pipelines() {
            if let Err(e) = self.stop_pipeline(&name, true) {
                tracing::error!(pipeline = %name, error = %e, "stop stages failed while clearing");
            }
        }
        self.pipelines.clear();
        self.timers.clear();
    }

    /// Queue a one-shot stage for the next tick of `pipeline`.
    pub fn push_auto_stage(&mut self, pipeline: &str, stage: Stage, mode: AutoStageMode) {
        let Some(p) = self.pipelines.get_mut(pipeline) else {
            tracing::warn!(pipeline, "auto stage for unknown pipeline");
            return;
        };
        match mode {
            AutoStageMode::Append => p.auto_stages.push(stage),
            AutoStageMode::Prepend => p.auto_stages.insert(0, stage),
            AutoStageMode::Single => {
                if !p.auto_stages.contains(&stage) {
                    p.auto_stages.push(stage);
                }
            }
        }
    }

    /// Run every tick due at the current clock time. Ticks rescheduled while running wait
    /// for the next call. Returns how many ticks ran.
    pub fn run_due(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut ran = 0;
        while let Some((id, name)) = self.timers.pop_due(now) {
            if self.tick_pipeline(&name, id) {
                ran += 1;
            }
        }
        ran
    }

    /// Clock time of the earliest pending tick.
    pub fn next_deadline_ms(&self) -> Option<f64> {
        self.timers.peek_due_ms()
    }

    /// Drive the scheduler for `duration_ms` of clock time, sleeping between ticks.
    pub fn run_for(&mut self, duration_ms: f64) -> usize {
        let end = self.clock.now_ms() + duration_ms.max(0.0);
        let mut ran = 0;
        loop {
            ran += self.run_due();
            match self.next_deadline_ms() {
                Some(due) if due <= end => self.clock.sleep_until(due),
                _ => {
                    self.clock.sleep_until(end);
                    ran += self.run_due();
                    return ran;
                }
            }
        }
    }

    /// One tick: tick hooks, the pipeline stages, then queued auto stages, then reschedule
    /// after `max(1000 / fps - elapsed, floor)`.
    #[tracing::instrument(level = "trace", skip(self, timer))]
    fn tick_pipeline(&mut self, name: &str, timer: TimerId) -> bool {
        let Some(p) = self.pipelines.get(name) else {
            return false;
        };
        if !p.is_running() || p.timer != Some(timer) {
            tracing::trace!("stale timer; skipping");
            return false;
        }
        let stages = p.def.stages.clone();

        let hooks = self.registry.tick_callbacks().to_vec();
        for hook in hooks {
            hook(self, name);
        }

        let started = self.clock.now_ms();
        match self.process_stages(&stages, Some(name), None, None) {
            Ok(flow) if flow.is_abort() => tracing::debug!("pipeline stages aborted"),
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "pipeline stages failed"),
        }
        let auto = self
            .pipelines
            .get_mut(name)
            .map(|p| std::mem::take(&mut p.auto_stages))
            .unwrap_or_default();
        if !auto.is_empty() {
            let auto = StageList::Inline(auto);
            if let Err(e) = self.process_stages(&auto, Some(name), None, None) {
                tracing::error!(error = %e, "auto stages failed");
            }
        }

        let fps = self.pipeline_fps(name);
        let now = self.clock.now_ms();
        let delay = (1000.0 / fps - (now - started)).max(self.config.min_reschedule_ms);
        let still_ours = self
            .pipelines
            .get(name)
            .is_some_and(|p| p.is_running() && p.timer == Some(timer));
        if still_ours {
            let id = self.timers.schedule(name, now + delay);
            if let Some(p) = self.pipelines.get_mut(name) {
                p.timer = Some(id);
                p.last_tick_ms = Some(started);
                p.last_delay_ms = Some(delay);
                p.ticks += 1;
            }
        } else if let Some(p) = self.pipelines.get_mut(name) {
            p.ticks += 1;
        }
        tracing::trace!(delay_ms = delay, "tick done");
        true
    }

    /// Run a stage list outside any pipeline; render errors are returned.
    pub fn run_stages(&mut self, stages: &StageList) -> EngineResult<Flow> {
        self.process_stages(stages, None, None, None)
    }

    pub(crate) fn pipeline_setting(&self, name: &str, key: &str) -> Option<&Value> {
        let path = self.pipelines.get(name)?.def.settings.as_ref()?;
        self.settings.get(path, true)?.field(key)
    }

    fn pipeline_fps(&self, name: &str) -> f64 {
        self.pipeline_setting(name, "fps")
            .and_then(Value::coerce_f64)
            .filter(|fps| *fps > 0.0)
            .unwrap_or(self.config.default_fps)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/pipeline.rs"]
mod tests;
