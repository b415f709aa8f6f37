use std::sync::Arc;

use crate::{
    engine::Engine,
    foundation::{
        core::Surface,
        error::{EngineError, EngineResult},
    },
    registry::{ActionKind, RenderCall},
    settings::value::Value,
    stage::{
        model::{
            Condition, SettingsRef, Stage, StageCall, StageDescriptor, StageList, SurfaceRef,
            split_ref,
        },
        outcome::{Envelope, Flow, Outcome, Verdict},
    },
};

impl Engine {
    /// Run a stage list in order, threading surfaces from stage to stage.
    ///
    /// A skipped stage only skips itself; an abort anywhere aborts the whole list. Render
    /// errors are returned; every other stage failure is logged. Actions, conditions and
    /// stage callbacks abort the list by returning [`EngineError::Abort`].
    pub fn process_stages(
        &mut self,
        stages: &StageList,
        pipeline: Option<&str>,
        source: Option<Surface>,
        destination: Option<Surface>,
    ) -> EngineResult<Flow> {
        let stages = self.resolve_stage_list(stages);
        self.process_stage_slice(&stages, pipeline, source, destination)
    }

    /// Run one stage. See [`Stage`] for the accepted forms.
    pub fn process_stage(
        &mut self,
        stage: &Stage,
        pipeline: Option<&str>,
        source: Option<Surface>,
        destination: Option<Surface>,
    ) -> EngineResult<Flow> {
        match stage {
            Stage::List(items) => {
                if self
                    .process_stage_slice(items, pipeline, source.clone(), destination.clone())?
                    .is_abort()
                {
                    return Ok(Flow::Abort);
                }
                Ok(Flow::Continue(Envelope {
                    source,
                    destination,
                    result: None,
                }))
            }
            Stage::Callback(cb) => {
                let call = StageCall {
                    source: source.clone(),
                    destination: destination.clone(),
                    pipeline,
                };
                let mut env = Envelope {
                    source,
                    destination,
                    result: None,
                };
                match cb.call(self, call) {
                    Ok(Outcome::Abort) => return Ok(Flow::Abort),
                    Ok(Outcome::Surface(s)) => env.source = Some(s),
                    Ok(Outcome::Value(v)) => env.result = Some(v),
                    Ok(Outcome::Done) => {}
                    Err(e) if EngineError::is_abort_signal(&e) => return Ok(Flow::Abort),
                    Err(e) => tracing::warn!(pipeline, error = %e, "stage callback failed"),
                }
                Ok(Flow::Continue(env))
            }
            Stage::Descriptor(d) => self.process_descriptor(d, pipeline, source, destination),
            Stage::Ref(path) => {
                let resolved = match self.settings.get(path, true) {
                    Some(v) => Stage::from_value(v),
                    None if path.len() > 1 => {
                        let parts = split_ref(path);
                        return self.process_stage_slice(&parts, pipeline, source, destination);
                    }
                    None => Err(EngineError::stage(format!("nothing stored at {path}"))),
                };
                match resolved {
                    Ok(Stage::Ref(inner)) if inner == *path => {
                        tracing::warn!(%path, "stage reference points at itself");
                    }
                    Ok(stage) => return self.process_stage(&stage, pipeline, source, destination),
                    Err(e) => tracing::warn!(%path, error = %e, "unrecognized stage"),
                }
                Ok(Flow::Continue(Envelope {
                    source,
                    destination,
                    result: None,
                }))
            }
        }
    }

    /// Evaluate the guard of `stage`, applying `negate`.
    ///
    /// A nested descriptor guard that negates itself is negated once more when the outer
    /// stage does not negate. A descriptor without a guard passes.
    pub fn check_condition(
        &mut self,
        stage: &StageDescriptor,
        pipeline: Option<&str>,
        source: Option<Surface>,
        destination: Option<Surface>,
    ) -> EngineResult<Verdict> {
        let Some(condition) = &stage.condition else {
            return Ok(Verdict::Truth(true));
        };
        let args = || {
            stage
                .condition_arguments
                .clone()
                .unwrap_or_else(|| vec![stage.to_value()])
        };
        let mut verdict = match condition {
            Condition::Bool(b) => Verdict::Truth(*b),
            Condition::Method(name) => {
                let called = if stage.condition_in_controller {
                    self.call_controller(name, &args())
                } else {
                    self.call_action(name, &args())
                };
                match called {
                    Ok(v) => Verdict::Truth(v.is_truthy()),
                    Err(e) if EngineError::is_abort_signal(&e) => Verdict::Abort,
                    Err(e) => {
                        tracing::warn!(condition = %name, error = %e, "condition method failed");
                        Verdict::Truth(false)
                    }
                }
            }
            Condition::Path(path) => match self.settings.get(path, true) {
                Some(v) => Verdict::Truth(v.is_truthy()),
                None => {
                    tracing::warn!(%path, "condition path holds nothing");
                    Verdict::Truth(false)
                }
            },
            Condition::Callback(cb) => match cb.call(self, &args()) {
                Ok(v) => Verdict::Truth(v.is_truthy()),
                Err(e) if EngineError::is_abort_signal(&e) => Verdict::Abort,
                Err(e) => {
                    tracing::warn!(error = %e, "condition callback failed");
                    Verdict::Truth(false)
                }
            },
            Condition::Stage(nested) => {
                let flow = self.process_descriptor(nested, pipeline, source, destination)?;
                let v = match flow {
                    Flow::Abort => Verdict::Abort,
                    Flow::Skip => Verdict::Truth(false),
                    Flow::Continue(_) => Verdict::Truth(true),
                };
                if nested.negate && !stage.negate { v.negated() } else { v }
            }
        };
        if stage.negate {
            verdict = verdict.negated();
        }
        Ok(verdict)
    }

    /// Invoke the renderer `name`. An unknown renderer is logged and does nothing.
    pub fn do_render(
        &mut self,
        name: &str,
        source: Option<Surface>,
        destination: Option<Surface>,
        settings: Option<&SettingsRef>,
        pipeline: Option<&str>,
        stage: &Arc<StageDescriptor>,
    ) -> EngineResult<Outcome> {
        let Some(renderer) = self.registry.renderer(name).map(|d| Arc::clone(&d.renderer)) else {
            tracing::warn!(renderer = name, "render type not supported");
            return Ok(Outcome::Done);
        };
        let settings = match settings {
            Some(SettingsRef::Path(path)) => {
                self.settings.get(path, false).cloned().unwrap_or_default()
            }
            Some(SettingsRef::Inline(v)) => v.clone(),
            None => Value::Null,
        };
        let call = RenderCall {
            source,
            destination,
            settings,
            pipeline,
            stage: Arc::clone(stage),
        };
        renderer(self, call).map_err(|e| EngineError::render(name, e))
    }

    /// Call the action `name`. Value actions return a clone of their value.
    pub fn call_action(&mut self, name: &str, args: &[Value]) -> anyhow::Result<Value> {
        let Some(kind) = self.registry.action(name).map(|def| def.kind.clone()) else {
            anyhow::bail!("no action named '{name}'");
        };
        match kind {
            ActionKind::Value(v) => Ok(v),
            ActionKind::Method(f) => f(self, args),
        }
    }

    fn process_descriptor(
        &mut self,
        d: &Arc<StageDescriptor>,
        pipeline: Option<&str>,
        mut source: Option<Surface>,
        mut destination: Option<Surface>,
    ) -> EngineResult<Flow> {
        if d.condition.is_some() {
            match self.check_condition(d, pipeline, source.clone(), destination.clone())? {
                Verdict::Abort => return Ok(Flow::Abort),
                Verdict::Truth(false) => return Ok(Flow::Skip),
                Verdict::Truth(true) => {}
            }
        }
        if let Some(r) = &d.destination {
            destination = self.resolve_surface(r);
        }
        if let Some(r) = &d.source {
            source = self.resolve_surface(r);
        }
        let mut result = None;
        if let Some(action) = &d.action {
            let called = if d.in_controller {
                self.call_controller(action, &d.arguments)
            } else {
                self.call_action(action, &d.arguments)
            };
            match called {
                Ok(v) => result = Some(v),
                Err(e) if EngineError::is_abort_signal(&e) => return Ok(Flow::Abort),
                Err(e) => tracing::warn!(action = %action, pipeline, error = %e, "action failed"),
            }
        } else if let Some(render) = &d.render {
            match self.do_render(
                render,
                source.clone(),
                destination.clone(),
                d.settings.as_ref(),
                pipeline,
                d,
            ) {
                Ok(Outcome::Abort) => return Ok(Flow::Abort),
                Ok(Outcome::Surface(s)) => source = Some(s),
                Ok(Outcome::Value(v)) => result = Some(v),
                Ok(Outcome::Done) => {}
                Err(e) => {
                    tracing::error!(renderer = %render, pipeline, error = %e, "renderer failed");
                    return Err(e);
                }
            }
        } else if let Some(stages) = &d.stages {
            if self
                .process_stages(stages, pipeline, source.clone(), destination.clone())?
                .is_abort()
            {
                return Ok(Flow::Abort);
            }
        } else if d.condition.is_none() {
            tracing::warn!(stage = ?d.to_value(), "didn't understand stage");
        }
        Ok(Flow::Continue(Envelope {
            source,
            destination,
            result,
        }))
    }

    fn process_stage_slice(
        &mut self,
        stages: &[Stage],
        pipeline: Option<&str>,
        mut source: Option<Surface>,
        mut destination: Option<Surface>,
    ) -> EngineResult<Flow> {
        for stage in stages {
            match self.process_stage(stage, pipeline, source.clone(), destination.clone())? {
                Flow::Abort => return Ok(Flow::Abort),
                Flow::Skip => {}
                Flow::Continue(env) => {
                    if !stage.keeps_source() && env.source.is_some() {
                        source = env.source;
                    }
                    if env.destination.is_some() {
                        destination = env.destination;
                    }
                }
            }
        }
        Ok(Flow::Continue(Envelope {
            source,
            destination,
            result: None,
        }))
    }

    fn resolve_stage_list(&self, stages: &StageList) -> Vec<Stage> {
        match stages {
            StageList::Inline(stages) => stages.clone(),
            StageList::Ref(path) => match self.settings.get(path, true) {
                Some(v @ Value::Sequence(_)) => match Stage::from_value(v) {
                    Ok(Stage::List(stages)) => stages,
                    Ok(Stage::Ref(inner)) => vec![Stage::Ref(inner)],
                    Ok(other) => vec![other],
                    Err(e) => {
                        tracing::warn!(%path, error = %e, "unrecognized stage list");
                        Vec::new()
                    }
                },
                Some(v) => match Stage::from_value(v) {
                    Ok(stage) => vec![stage],
                    Err(e) => {
                        tracing::warn!(%path, error = %e, "unrecognized stage list");
                        Vec::new()
                    }
                },
                None => split_ref(path),
            },
        }
    }

    fn resolve_surface(&self, r: &SurfaceRef) -> Option<Surface> {
        match r {
            SurfaceRef::Handle(s) => Some(s.clone()),
            SurfaceRef::Named(name) => {
                let found = self.surfaces.get(name).cloned();
                if found.is_none() {
                    tracing::warn!(surface = %name, "no surface with that name");
                }
                found
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/processor.rs"]
mod tests;
