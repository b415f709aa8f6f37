//! Animstage is a declarative animation-pipeline engine.
//!
//! Named pipelines tick at their own frame rate and run ordered stage lists against a shared
//! settings tree:
//!
//! - Build a [`Registry`] of renderers, actions and hooks, then freeze it in an `Arc`
//! - Create an [`Engine`] and fill its settings, surfaces and pipelines (or load an
//!   [`EngineDocument`])
//! - Drive it with [`Engine::run_due`] / [`Engine::run_for`]; eased transitions of numeric
//!   and colour settings advance on every tick
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builtin;
mod engine;
mod foundation;
mod registry;
mod schedule;
mod settings;
mod stage;
mod transition;

pub use crate::engine::document::Ordered;
pub use crate::engine::{Controller, Engine, EngineConfig, EngineDocument};
pub use crate::foundation::core::{Rgba8, Surface, SurfaceKind, SurfaceSpec};
pub use crate::foundation::error::{EngineError, EngineResult};
pub use crate::registry::{
    ActionDef, ActionFn, ActionKind, AdjustFn, Dependency, DependencyKind, HookFn, Registry,
    RenderCall, RenderFn, RendererDef, TickFn, TimeGetterFn,
};
pub use crate::schedule::clock::{Clock, ManualClock, SystemClock};
pub use crate::schedule::pipeline::{AutoStageMode, Pipeline, PipelineDef, PipelineState};
pub use crate::settings::path::{GLOBAL_KEY, Key, Path};
pub use crate::settings::store::{MissReason, PathMiss, SettingsStore};
pub use crate::settings::value::{Mapping, Value};
pub use crate::stage::model::{
    Condition, ConditionCallback, SettingsRef, Stage, StageCall, StageCallback, StageDescriptor,
    StageList, SurfaceRef,
};
pub use crate::stage::outcome::{Envelope, Flow, Outcome, Verdict};
pub use crate::transition::bezier::{CubicTiming, TIMING_PRESETS};
pub use crate::transition::color::{format_rgba, parse_color};
pub use crate::transition::gradient::{GRADIENT_SAMPLES, Gradient};
pub use crate::transition::table::{
    COLOR_FIELDS, FieldTransition, Transition, TransitionSpec, TransitionTable, TransitionTick,
};
