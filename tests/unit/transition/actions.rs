use super::*;
use crate::{
    engine::EngineConfig,
    schedule::{clock::ManualClock, pipeline::PipelineDef},
};
use serde_json::json;
use std::sync::Arc;

fn engine() -> (Engine, ManualClock) {
    let clock = ManualClock::new();
    let registry = Arc::new(Registry::standard().unwrap());
    let mut e =
        Engine::with_clock(registry, EngineConfig::default(), Arc::new(clock.clone())).unwrap();
    e.adjust_settings(&Path::root(), Value::from(json!({"box": {"x": 0, "y": 0}})), false);
    (e, clock)
}

fn call(e: &mut Engine, name: &str, args: serde_json::Value) -> Value {
    let Value::Sequence(args) = Value::from(args) else {
        panic!("arguments must be a list");
    };
    e.call_action(name, &args).unwrap()
}

fn x(e: &Engine) -> f64 {
    e.get_settings(&Path::from(["box", "x"]), false)
        .and_then(Value::as_f64)
        .unwrap()
}

#[test]
fn add_transition_moves_the_field_over_time() {
    let (mut e, clock) = engine();
    let accepted = call(&mut e, "addTransition", json!([["box"], {"x": 10}, {"duration": 1}]));
    assert_eq!(accepted, Value::from(json!(["x"])));

    clock.advance(500.0);
    e.process_all_transitions();
    assert!((x(&e) - 5.0).abs() < 1e-9);

    clock.advance(600.0);
    e.process_all_transitions();
    assert_eq!(x(&e), 10.0);
    assert!(e.transitions().is_empty());
}

#[test]
fn targets_and_settings_can_come_from_paths() {
    let (mut e, clock) = engine();
    e.adjust_settings(
        &Path::from("anim"),
        Value::from(json!({"to": {"x": 4}, "timing": {"duration": 2, "bezier": "linear"}})),
        false,
    );
    call(&mut e, "addTransition", json!([["box"], ["anim", "to"], ["anim", "timing"]]));
    clock.advance(1000.0);
    e.process_all_transitions();
    assert!((x(&e) - 2.0).abs() < 1e-6);
}

#[test]
fn missing_transition_settings_add_nothing() {
    let (mut e, _) = engine();
    let out = call(&mut e, "addTransition", json!([["box"], {"x": 10}, "nowhere"]));
    assert_eq!(out, Value::Null);
    assert!(!e.has_transition(&Path::from("box"), None));
}

#[test]
fn pinned_current_time_sets_the_start() {
    let (mut e, clock) = engine();
    call(&mut e, "setCurrentTime", json!([2.0]));
    call(&mut e, "addTransition", json!([["box"], {"x": 10}, {"duration": 1}]));
    clock.set(2500.0);
    e.process_all_transitions();
    assert!((x(&e) - 5.0).abs() < 1e-9);
}

#[test]
fn completion_runs_callback_stages() {
    let (mut e, clock) = engine();
    call(
        &mut e,
        "addTransition",
        json!([["box"], {"x": 1, "y": 1}, {
            "duration": 1,
            "callbacks": [{"action": "adjustSettings", "arguments": [["done"], true]}]
        }]),
    );
    clock.advance(1000.0);
    e.process_all_transitions();
    assert_eq!(e.get_settings(&Path::from("done"), true), Some(&Value::Bool(true)));
}

#[test]
fn adjusting_a_moving_field_cancels_it_and_fires_callbacks() {
    let (mut e, clock) = engine();
    call(
        &mut e,
        "addTransition",
        json!([["box"], {"x": 10}, {
            "duration": 1,
            "callbacks": [{"action": "adjustSettings", "arguments": [["done"], true]}]
        }]),
    );
    e.adjust_settings(&Path::from("box"), Value::from(json!({"x": 42})), false);
    assert!(!e.has_transition(&Path::from("box"), None));
    assert_eq!(e.get_settings(&Path::from("done"), true), Some(&Value::Bool(true)));

    clock.advance(500.0);
    e.process_all_transitions();
    assert_eq!(x(&e), 42.0);
}

#[test]
fn pipeline_ticks_drive_transitions() {
    let (mut e, _) = engine();
    e.add_pipeline("main", PipelineDef::default()).unwrap();
    e.start_pipeline("main").unwrap();
    call(&mut e, "addTransition", json!([["box"], {"y": 3}, {"duration": 0.5}]));
    e.run_for(600.0);
    let y = e.get_settings(&Path::from(["box", "y"]), false).and_then(Value::as_f64);
    assert_eq!(y, Some(3.0));
    assert!(e.transitions().is_empty());
}

#[test]
fn has_transition_with_fields_and_stored_path() {
    let (mut e, _) = engine();
    e.adjust_settings(&Path::from("target"), Value::from(json!(["box"])), false);
    call(&mut e, "addTransition", json!([["box"], {"x": 10}, {"duration": 1}]));

    assert_eq!(call(&mut e, "hasTransition", json!([["box"]])), Value::Bool(true));
    assert_eq!(call(&mut e, "hasTransition", json!([["box"], {"y": 0}])), Value::Bool(false));
    assert_eq!(call(&mut e, "hasTransition", json!([["target"], null, true])), Value::Bool(true));
}

#[test]
fn remove_transition_reports_whether_anything_moved() {
    let (mut e, _) = engine();
    call(&mut e, "addTransition", json!([["box"], {"x": 10, "y": 5}, {"duration": 1}]));
    assert_eq!(call(&mut e, "removeTransition", json!([["box"], "x"])), Value::Bool(true));
    assert!(e.has_transition(&Path::from("box"), None));
    assert_eq!(call(&mut e, "removeTransition", json!([["box"]])), Value::Bool(true));
    assert_eq!(call(&mut e, "removeTransition", json!([["box"], null, true])), Value::Bool(false));
}

#[test]
fn hard_reset_drops_transitions() {
    let (mut e, _) = engine();
    call(&mut e, "addTransition", json!([["box"], {"x": 10}, {"duration": 1}]));
    e.reset(true);
    assert_eq!(e.transitions().len(), 1);
    e.reset(false);
    assert!(e.transitions().is_empty());
}

#[test]
fn cubic_bezier_at_time_action() {
    let (mut e, _) = engine();
    let linear = call(&mut e, "cubicBezierAtTime", json!([0.3, 0, 0, 1, 1, 1]));
    assert!((linear.as_f64().unwrap() - 0.3).abs() < 5e-3);
    let ease_in_out = call(&mut e, "cubicBezierAtTime", json!([0.5, 0.42, 0, 0.58, 1, 1]));
    assert!((ease_in_out.as_f64().unwrap() - 0.5).abs() < 1e-3);
}

#[test]
fn timing_presets_are_exposed() {
    let (mut e, _) = engine();
    let presets = call(&mut e, "timingBeziers", json!([]));
    assert_eq!(presets.field("ease-in"), Some(&Value::from(json!([0.42, 0, 1, 1]))));
}
