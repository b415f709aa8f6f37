use super::*;
use crate::registry::dependency::DependencyKind;

fn noop_renderer(name: &str) -> RendererDef {
    RendererDef::new(name, |_, _| Ok(Outcome::Done))
}

#[test]
fn duplicate_renderer_keeps_the_first() {
    let mut r = Registry::new();
    assert!(r.add_renderer(noop_renderer("fill").version(1)).unwrap());
    assert!(!r.add_renderer(noop_renderer("fill").version(5)).unwrap());
    assert_eq!(r.renderer("fill").map(|d| d.version), Some(1));
}

#[test]
fn nameless_registrations_are_configuration_errors() {
    let mut r = Registry::new();
    assert!(r.add_renderer(noop_renderer("")).unwrap_err().is_config());
    assert!(r.add_action(ActionDef::value("", 1.0)).unwrap_err().is_config());
}

#[test]
fn action_replacement_needs_equal_or_higher_version() {
    let mut r = Registry::new();
    r.add_action(ActionDef::value("speed", 1.0).version(2)).unwrap();
    let err = r.add_action(ActionDef::value("speed", 2.0).version(1)).unwrap_err();
    assert!(err.is_config());
    r.add_action(ActionDef::value("speed", 3.0).version(2)).unwrap();
    assert!(matches!(
        r.action("speed").map(|d| &d.kind),
        Some(ActionKind::Value(Value::Number(n))) if *n == 3.0
    ));
}

#[test]
fn core_actions_cannot_be_replaced() {
    let r = Registry::standard().unwrap();
    assert!(r.is_core_action("adjustSettings"));
    let mut r = r;
    let err = r
        .add_action(ActionDef::method("adjustSettings", |_, _| Ok(Value::Null)).version(99))
        .unwrap_err();
    assert!(err.is_config());
}

#[test]
fn add_actions_stops_at_first_rejection() {
    let mut r = Registry::new();
    r.add_action(ActionDef::value("b", 1.0).version(3)).unwrap();
    let err = r.add_actions([
        ActionDef::value("a", 1.0),
        ActionDef::value("b", 1.0).version(1),
        ActionDef::value("c", 1.0),
    ]);
    assert!(err.is_err());
    assert!(r.action("a").is_some());
    assert!(r.action("c").is_none());
}

#[test]
fn named_hooks_ignore_duplicates() {
    let mut r = Registry::new();
    assert!(r.add_initialiser("x", |_, _| Ok(())));
    assert!(!r.add_initialiser("x", |_, _| Ok(())));
    assert!(r.add_resetter("x", |_, _| Ok(())));
    assert!(!r.add_resetter("x", |_, _| Ok(())));
    assert!(r.add_time_getter("t", |_, t| t.unwrap_or(0.0)));
    assert!(!r.add_time_getter("t", |_, _| 1.0));
    assert_eq!(r.initialisers().len(), 1);
    assert!(r.resetter("x").is_some());
}

#[test]
fn dependency_checks() {
    let mut r = Registry::new();
    r.add_renderer(noop_renderer("loop").version(2)).unwrap();

    assert!(r.check_dependencies("p", &[Dependency::renderer("loop")]).is_ok());
    assert!(r.check_dependencies("p", &[Dependency::renderer("loop").at_least(2)]).is_ok());

    let err = r
        .check_dependencies("p", &[Dependency::renderer("loop").at_least(3)])
        .unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("version 3"));

    let err = r.check_dependencies("p", &[Dependency::action("missing")]).unwrap_err();
    assert!(err.is_config());

    let unknown = Dependency {
        kind: DependencyKind::Unknown,
        name: "whatever".to_owned(),
        version: None,
    };
    assert!(r.check_dependencies("p", &[unknown]).is_ok());
}

#[test]
fn registered_definitions_are_checked_together() {
    let mut r = Registry::new();
    r.add_renderer(noop_renderer("blur").depends_on(Dependency::action("kernel")))
        .unwrap();
    assert!(r.check_all_dependencies().unwrap_err().is_config());
    r.add_action(ActionDef::value("kernel", 3.0)).unwrap();
    assert!(r.check_all_dependencies().is_ok());
}

#[test]
fn dependencies_parse_from_json() {
    let deps: Vec<Dependency> = serde_json::from_value(serde_json::json!([
        {"renderer": "loop", "version": 2},
        {"action": "iterate"},
        {"plugin": "x"}
    ]))
    .unwrap();
    assert_eq!(deps[0], Dependency::renderer("loop").at_least(2));
    assert_eq!(deps[1], Dependency::action("iterate"));
    assert_eq!(deps[2].kind, DependencyKind::Unknown);
}

#[test]
fn dependency_naming_both_kinds_is_an_action() {
    let dep: Dependency =
        serde_json::from_value(serde_json::json!({"renderer": "x", "action": "y"})).unwrap();
    assert_eq!(dep.kind, DependencyKind::Action);
    assert_eq!(dep.name, "y");
}

#[test]
fn standard_registry_has_the_builtins() {
    let r = Registry::standard().unwrap();
    for action in [
        "addTransition",
        "hasTransition",
        "removeTransition",
        "processAllTransitions",
        "cubicBezierAtTime",
        "timingBeziers",
        "iterate",
        "makeQueue",
        "queueAdd",
        "queueAddCopy",
        "setFPS",
        "getSettings",
    ] {
        assert!(r.action(action).is_some(), "{action}");
    }
    assert_eq!(r.renderer("loop").map(|d| d.version), Some(2));
    assert!(r.time_getter("relative").is_some());
    assert!(r.time_getter("media").is_some());
    assert!(r.check_all_dependencies().is_ok());
}
