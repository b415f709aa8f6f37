use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use serde_json::json;

use crate::{
    engine::{Engine, EngineConfig},
    schedule::{clock::ManualClock, pipeline::PipelineDef},
    settings::{path::Path, value::Value},
    stage::{
        model::{Stage, StageCallback, StageDescriptor, StageList},
        outcome::{Flow, Outcome},
    },
};

fn engine() -> Engine {
    let registry = Arc::new(crate::registry::Registry::standard().unwrap());
    Engine::with_clock(registry, EngineConfig::default(), Arc::new(ManualClock::new())).unwrap()
}

fn set(e: &mut Engine, key: &str, v: serde_json::Value) {
    e.adjust_settings(&Path::from(key), Value::from(v), false);
}

fn get(e: &Engine, keys: &[&str]) -> Value {
    let path = Path::new(keys.iter().map(|k| (*k).into()).collect());
    e.get_settings(&path, true).cloned().unwrap_or_default()
}

fn run(e: &mut Engine, stages: serde_json::Value) -> Flow {
    let list = StageList::from_value(&Value::from(stages)).unwrap();
    e.process_stages(&list, None, None, None).unwrap()
}

fn call(e: &mut Engine, name: &str, args: serde_json::Value) -> Value {
    let Value::Sequence(args) = Value::from(args) else {
        panic!("arguments must be a list");
    };
    e.call_action(name, &args).unwrap()
}

#[test]
fn counted_loop_writes_its_index() {
    let mut e = engine();
    set(&mut e, "n", json!(0));
    run(
        &mut e,
        json!([{
            "render": "loop",
            "count": 3,
            "countPath": ["i"],
            "stages": [{"action": "iterate", "arguments": [["n"]]}]
        }]),
    );
    assert_eq!(get(&e, &["n"]), Value::Number(3.0));
    assert_eq!(get(&e, &["i"]), Value::Number(2.0));
}

#[test]
fn guarded_loop_stops_at_max_loop() {
    let mut e = engine();
    set(&mut e, "n", json!(0));
    run(
        &mut e,
        json!([{
            "render": "loop",
            "condition": true,
            "maxLoop": 5,
            "stages": [{"action": "iterate", "arguments": [["n"]]}]
        }]),
    );
    assert_eq!(get(&e, &["n"]), Value::Number(5.0));
}

#[test]
fn guarded_loop_falls_back_to_the_engine_cap() {
    let mut e = engine();
    set(&mut e, "n", json!(0));
    run(
        &mut e,
        json!([{
            "render": "loop",
            "condition": true,
            "stages": [{"action": "iterate", "arguments": [["n"]]}]
        }]),
    );
    assert_eq!(get(&e, &["n"]), Value::Number(f64::from(e.config().default_max_loop)));
}

#[test]
fn loop_condition_can_live_in_the_renderer_settings() {
    let mut e = engine();
    set(&mut e, "go", json!(true));
    set(&mut e, "n", json!(0));
    set(&mut e, "runs", json!(0));
    run(
        &mut e,
        json!([{
            "render": "loop",
            "settings": {"condition": ["go"]},
            "stages": [
                {"action": "iterate", "arguments": [["runs"]]},
                {"action": "iterate", "arguments": [["n"], {
                    "min": 0,
                    "max": 2,
                    "callbacks": [{"action": "adjustSettings", "arguments": [["go"], false]}]
                }]}
            ]
        }]),
    );
    assert_eq!(get(&e, &["runs"]), Value::Number(3.0));
    assert_eq!(get(&e, &["n"]), Value::Number(0.0));
    assert_eq!(get(&e, &["go"]), Value::Bool(false));
}

#[test]
fn loop_without_count_or_condition_does_nothing() {
    let mut e = engine();
    set(&mut e, "n", json!(0));
    let flow = run(
        &mut e,
        json!([{"render": "loop", "stages": [{"action": "iterate", "arguments": [["n"]]}]}]),
    );
    assert!(!flow.is_abort());
    assert_eq!(get(&e, &["n"]), Value::Number(0.0));
}

#[test]
fn abort_in_the_body_aborts_the_enclosing_list() {
    let mut e = engine();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let body = StageList::inline([Stage::Callback(StageCallback::new(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Outcome::Abort)
    }))]);
    let looped = StageDescriptor::render("loop")
        .with_stages(body)
        .with_extra("count", 3);
    let after =
        StageDescriptor::action("adjustSettings", vec![Value::from("after"), Value::Bool(true)]);
    let list = StageList::inline([
        Stage::Descriptor(Arc::new(looped)),
        Stage::Descriptor(Arc::new(after)),
    ]);

    let flow = e.process_stages(&list, None, None, None).unwrap();
    assert!(flow.is_abort());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(get(&e, &["after"]).is_null());
}

#[test]
fn iterate_steps_and_wraps() {
    let mut e = engine();
    set(&mut e, "n", json!(4));
    let up = json!([["n"], {"by": 2, "min": 1, "max": 5}]);
    assert_eq!(call(&mut e, "iterate", up), Value::Number(1.0));
    let down = json!([["n"], {"by": -1, "min": 1, "max": 5}]);
    assert_eq!(call(&mut e, "iterate", down), Value::Number(5.0));
    assert_eq!(call(&mut e, "iterate", json!([["n"]])), Value::Number(6.0));

    set(&mut e, "step", json!({"by": 0.5}));
    assert_eq!(call(&mut e, "iterate", json!([["n"], "step"])), Value::Number(6.5));
    assert_eq!(call(&mut e, "iterate", json!([["missing"]])), Value::Null);
}

#[test]
fn queues_keep_the_newest_values_and_their_averages() {
    let mut e = engine();
    call(&mut e, "makeQueue", json!([["q"], {"limit": 3, "weights": [2, 1]}]));
    assert_eq!(get(&e, &["q", "values"]), Value::from(json!([0])));

    for v in [3, 6, 9, 12] {
        call(&mut e, "queueAdd", json!([["q"], v]));
    }
    assert_eq!(get(&e, &["q", "values"]), Value::from(json!([12, 9, 6])));
    assert_eq!(get(&e, &["q", "average"]), Value::Number(9.0));
    assert_eq!(get(&e, &["q", "weightedAverage"]), Value::Number(9.75));

    set(&mut e, "src", json!(4));
    call(&mut e, "queueAddCopy", json!([["q"], ["src"]]));
    assert_eq!(get(&e, &["q", "values"]), Value::from(json!([4, 12, 9])));
}

#[test]
fn set_fps_follows_the_tempo() {
    let mut e = engine();
    set(&mut e, "anim", json!({"steps": 8}));
    assert_eq!(call(&mut e, "setFPS", json!([["pipe"], ["anim"], 120, 4])), Value::Number(8.0));
    assert_eq!(get(&e, &["pipe", "fps"]), Value::Number(8.0));

    set(&mut e, "still", json!({}));
    assert_eq!(call(&mut e, "setFPS", json!([["pipe"], ["still"], 120, 4])), Value::Number(30.0));
}

#[test]
fn core_actions_reach_settings_and_pipelines() {
    let mut e = engine();
    call(&mut e, "adjustSettings", json!([["a"], {"x": 1, "y": 2}]));
    call(&mut e, "adjustSettings", json!([["a"], {"z": 3}, true]));
    assert_eq!(call(&mut e, "getSettings", json!([["a"]])), Value::from(json!({"z": 3})));
    call(&mut e, "copySettings", json!([["b"], ["a"]]));
    call(&mut e, "clearSettings", json!([["a"]]));
    assert_eq!(call(&mut e, "getSettings", json!([null])), Value::from(json!({"b": {"z": 3}})));
    assert!(e.call_action("getSettings", &[Value::from("zzz")]).is_ok());

    e.add_pipeline("main", PipelineDef::default()).unwrap();
    call(&mut e, "startPipeline", json!(["main"]));
    assert_eq!(e.running_pipelines(), ["main"]);
    call(&mut e, "stopPipeline", json!(["main", true]));
    assert!(e.running_pipelines().is_empty());
    assert!(e.call_action("startPipeline", &[]).is_err());

    assert_eq!(call(&mut e, "callResetter", json!(["relativeTime"])), Value::Bool(true));
    assert_eq!(call(&mut e, "callResetter", json!(["nope"])), Value::Bool(false));
}
