use super::*;
use crate::{
    engine::EngineConfig,
    registry::{Registry, RendererDef},
    schedule::clock::{Clock, ManualClock},
    stage::{model::StageDescriptor, outcome::Outcome},
};
use serde_json::json;
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

fn engine_on(clock: &ManualClock, extra: impl FnOnce(&mut Registry)) -> Engine {
    let mut registry = Registry::standard().unwrap();
    extra(&mut registry);
    Engine::with_clock(
        Arc::new(registry),
        EngineConfig::default(),
        Arc::new(clock.clone()),
    )
    .unwrap()
}

fn note(log: &Log, text: &str) -> Stage {
    let log = Arc::clone(log);
    let text = text.to_owned();
    Stage::callback(move |_, _| {
        log.lock().unwrap().push(text.clone());
        Ok(Outcome::Done)
    })
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn set(e: &mut Engine, path: &str, value: serde_json::Value) {
    e.adjust_settings(&Path::from(path), Value::from(value), false);
}

#[test]
fn reschedule_delay_subtracts_elapsed_work_with_a_floor() {
    let clock = ManualClock::new();
    let mut e = engine_on(&clock, |_| {});
    set(&mut e, "p", json!({"fps": 50, "work": 5}));
    let worker = clock.clone();
    let work = Stage::callback(move |engine, _| {
        let ms = engine
            .get_settings(&Path::from(["p", "work"]), true)
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        worker.advance(ms);
        Ok(Outcome::Done)
    });
    e.add_pipeline("main", PipelineDef::new(StageList::inline([work])).with_settings("p"))
        .unwrap();
    e.start_pipeline("main").unwrap();
    assert_eq!(e.next_deadline_ms(), Some(20.0));

    clock.set(20.0);
    assert_eq!(e.run_due(), 1);
    let p = e.pipeline("main").unwrap();
    assert_eq!(p.last_delay_ms(), Some(15.0));
    assert_eq!(p.last_tick_ms(), Some(20.0));
    assert_eq!(e.next_deadline_ms(), Some(40.0));

    set(&mut e, "p", json!({"work": 25}));
    clock.set(40.0);
    assert_eq!(e.run_due(), 1);
    assert_eq!(e.pipeline("main").unwrap().last_delay_ms(), Some(2.0));
    assert_eq!(clock.now_ms(), 65.0);
    assert_eq!(e.next_deadline_ms(), Some(67.0));
}

#[test]
fn default_fps_applies_without_settings() {
    let clock = ManualClock::new();
    let mut e = engine_on(&clock, |_| {});
    e.add_pipeline("main", PipelineDef::default()).unwrap();
    e.start_pipeline("main").unwrap();
    let due = e.next_deadline_ms().unwrap();
    assert!((due - 1000.0 / 60.0).abs() < 1e-3);
}

#[test]
fn lifecycle_stage_lists_run_at_their_moments() {
    let clock = ManualClock::new();
    let mut e = engine_on(&clock, |_| {});
    let log: Log = Arc::default();
    let def = PipelineDef {
        stages: StageList::inline([note(&log, "tick")]),
        init_stages: Some(StageList::inline([note(&log, "init")])),
        start_stages: Some(StageList::inline([note(&log, "start")])),
        stop_stages: Some(StageList::inline([note(&log, "stop")])),
        ..PipelineDef::default()
    };
    e.add_pipeline("main", def).unwrap();
    assert_eq!(entries(&log), ["init"]);
    assert_eq!(e.pipeline("main").unwrap().state(), PipelineState::Initialized);

    e.start_pipeline("main").unwrap();
    assert_eq!(e.running_pipelines(), ["main"]);
    e.run_for(60.0);
    e.stop_pipeline("main", false).unwrap();
    assert_eq!(entries(&log), ["init", "start", "tick", "tick", "tick", "stop"]);

    clock.advance(500.0);
    assert_eq!(e.run_due(), 0);
    assert!(e.running_pipelines().is_empty());
}

#[test]
fn running_pipeline_cannot_be_replaced() {
    let clock = ManualClock::new();
    let mut e = engine_on(&clock, |_| {});
    e.add_pipeline("main", PipelineDef::default()).unwrap();
    e.start_pipeline("main").unwrap();
    let err = e.add_pipeline("main", PipelineDef::default()).unwrap_err();
    assert!(err.is_config());

    e.stop_pipeline("main", true).unwrap();
    assert!(e.add_pipeline("main", PipelineDef::default()).is_ok());
}

#[test]
fn unmet_pipeline_dependency_is_rejected() {
    let clock = ManualClock::new();
    let mut e = engine_on(&clock, |_| {});
    let def = PipelineDef {
        dependencies: vec![Dependency::renderer("loop").at_least(3)],
        ..PipelineDef::default()
    };
    assert!(e.add_pipeline("main", def).unwrap_err().is_config());
    assert!(e.pipeline("main").is_none());
}

#[test]
fn auto_enable_starts_on_add() {
    let clock = ManualClock::new();
    let mut e = engine_on(&clock, |_| {});
    set(&mut e, "p", json!({"autoEnable": true, "fps": 10}));
    e.add_pipeline("main", PipelineDef::default().with_settings("p"))
        .unwrap();
    assert_eq!(e.running_pipelines(), ["main"]);
    assert_eq!(e.next_deadline_ms(), Some(100.0));
}

#[test]
fn auto_stages_run_once_in_order() {
    let clock = ManualClock::new();
    let mut e = engine_on(&clock, |_| {});
    let log: Log = Arc::default();
    e.add_pipeline("main", PipelineDef::new(StageList::inline([note(&log, "body")])))
        .unwrap();
    e.start_pipeline("main").unwrap();

    e.push_auto_stage("main", note(&log, "b"), AutoStageMode::Append);
    e.push_auto_stage("main", note(&log, "c"), AutoStageMode::Append);
    e.push_auto_stage("main", note(&log, "a"), AutoStageMode::Prepend);
    e.push_auto_stage("nope", note(&log, "lost"), AutoStageMode::Append);
    clock.advance(20.0);
    e.run_due();
    assert_eq!(entries(&log), ["body", "a", "b", "c"]);

    let restore = note(&log, "restore");
    e.push_auto_stage("main", note(&log, "queued"), AutoStageMode::Append);
    e.push_auto_stage("main", restore.clone(), AutoStageMode::Single);
    e.push_auto_stage("main", restore, AutoStageMode::Single);
    clock.advance(20.0);
    e.run_due();
    clock.advance(20.0);
    e.run_due();
    assert_eq!(
        entries(&log),
        ["body", "a", "b", "c", "body", "queued", "restore", "body"]
    );
}

#[test]
fn abort_mid_tick_still_runs_auto_stages_and_reschedules() {
    let clock = ManualClock::new();
    let mut e = engine_on(&clock, |_| {});
    let log: Log = Arc::default();
    let stages = StageList::inline([
        note(&log, "first"),
        Stage::callback(|_, _| Ok(Outcome::Abort)),
        note(&log, "never"),
    ]);
    e.add_pipeline("main", PipelineDef::new(stages)).unwrap();
    e.start_pipeline("main").unwrap();
    e.push_auto_stage("main", note(&log, "auto"), AutoStageMode::Append);

    clock.set(100.0);
    assert_eq!(e.run_due(), 1);
    assert_eq!(entries(&log), ["first", "auto"]);
    let p = e.pipeline("main").unwrap();
    assert_eq!(p.state(), PipelineState::Running);
    assert_eq!(p.last_tick_ms(), Some(100.0));
    let due = e.next_deadline_ms().unwrap();
    assert!((due - (100.0 + 1000.0 / 60.0)).abs() < 1e-3);
}

#[test]
fn render_error_does_not_stop_the_pipeline() {
    let clock = ManualClock::new();
    let mut e = engine_on(&clock, |r| {
        r.add_renderer(RendererDef::new("broken", |_, _| anyhow::bail!("boom")))
            .unwrap();
    });
    let log: Log = Arc::default();
    let stages = StageList::inline([
        Stage::descriptor(StageDescriptor::render("broken")),
        note(&log, "unreached"),
    ]);
    e.add_pipeline("main", PipelineDef::new(stages)).unwrap();
    e.start_pipeline("main").unwrap();
    clock.advance(20.0);
    assert_eq!(e.run_due(), 1);
    assert!(entries(&log).is_empty());
    assert_eq!(e.running_pipelines(), ["main"]);
    assert!(e.next_deadline_ms().is_some());
}

#[test]
fn stopping_itself_mid_tick_cancels_the_reschedule() {
    let clock = ManualClock::new();
    let mut e = engine_on(&clock, |_| {});
    let stop = Stage::descriptor(StageDescriptor::action(
        "stopPipeline",
        vec![Value::from("main")],
    ));
    e.add_pipeline("main", PipelineDef::new(StageList::inline([stop])))
        .unwrap();
    e.start_pipeline("main").unwrap();
    clock.advance(20.0);
    assert_eq!(e.run_due(), 1);
    assert!(e.running_pipelines().is_empty());
    assert_eq!(e.next_deadline_ms(), None);
}

#[test]
fn run_for_drives_a_manual_clock() {
    let clock = ManualClock::new();
    let mut e = engine_on(&clock, |_| {});
    set(&mut e, "p", json!({"fps": 10}));
    e.add_pipeline("main", PipelineDef::default().with_settings("p"))
        .unwrap();
    e.start_pipeline("main").unwrap();
    assert_eq!(e.run_for(1000.0), 10);
    assert_eq!(clock.now_ms(), 1000.0);
    assert_eq!(e.pipeline("main").unwrap().ticks(), 10);
}

#[test]
fn clear_pipelines_stops_and_forgets_everything() {
    let clock = ManualClock::new();
    let mut e = engine_on(&clock, |_| {});
    let log: Log = Arc::default();
    let def = PipelineDef {
        stop_stages: Some(StageList::inline([note(&log, "stop")])),
        ..PipelineDef::default()
    };
    e.add_pipeline("a", def.clone()).unwrap();
    e.add_pipeline("b", def).unwrap();
    e.start_pipeline("a").unwrap();
    e.clear_pipelines();
    assert_eq!(entries(&log), ["stop"]);
    assert!(e.pipeline_names().is_empty());
    assert_eq!(e.next_deadline_ms(), None);
}
