use super::*;
use serde_json::json;

fn v(j: serde_json::Value) -> Value {
    Value::from(j)
}

#[test]
fn scalar_round_trips() {
    let mut s = SettingsStore::new();
    let p = Path::from(["anim", "speed"]);
    let changed = s.adjust(&p, Value::from(2.5), false);
    assert!(changed.is_empty());
    assert_eq!(s.get(&p, false), Some(&Value::from(2.5)));
}

#[test]
fn sequence_and_mapping_round_trip() {
    let mut s = SettingsStore::new();
    let seq = Path::from(["anim", "points"]);
    s.adjust(&seq, v(json!([1, 2, 3])), false);
    assert_eq!(s.get(&seq, false), Some(&v(json!([1, 2, 3]))));

    let map = Path::from(["anim", "style"]);
    let changed = s.adjust(&map, v(json!({"fillStyle": "#fff", "alpha": 1})), false);
    assert_eq!(changed, vec!["alpha".to_owned(), "fillStyle".to_owned()]);
    assert_eq!(s.get(&map, false), Some(&v(json!({"fillStyle": "#fff", "alpha": 1}))));
}

#[test]
fn sequence_adjust_splices_unless_cleared() {
    let mut s = SettingsStore::new();
    let p = Path::from("q");
    s.adjust(&p, v(json!([1, 2, 3, 4])), false);
    s.adjust(&p, v(json!([9, 8])), false);
    assert_eq!(s.get(&p, false), Some(&v(json!([9, 8, 3, 4]))));
    s.adjust(&p, v(json!([7])), true);
    assert_eq!(s.get(&p, false), Some(&v(json!([7]))));
}

#[test]
fn mapping_merge_is_shallow() {
    let mut s = SettingsStore::new();
    let p = Path::from("m");
    s.adjust(&p, v(json!({"a": {"x": 1, "y": 2}, "b": 1})), false);
    s.adjust(&p, v(json!({"a": {"x": 5}})), false);
    assert_eq!(s.get(&p, false), Some(&v(json!({"a": {"x": 5}, "b": 1}))));
    s.adjust(&p, v(json!({"c": 3})), true);
    assert_eq!(s.get(&p, false), Some(&v(json!({"c": 3}))));
}

#[test]
fn root_adjust_replaces_only_named_keys() {
    let mut s = SettingsStore::new();
    s.adjust(&Path::root(), v(json!({"keep": true, "a": {"deep": 1}})), false);
    let changed = s.adjust(&Path::root(), v(json!({"a": 1, "b": 2})), false);
    assert_eq!(changed.len(), 2);
    assert_eq!(s.root(), &v(json!({"keep": true, "a": 1, "b": 2})));

    let ignored = s.adjust(&Path::root(), Value::from(3.0), false);
    assert!(ignored.is_empty());
}

#[test]
fn write_autovivifies_by_next_key_shape() {
    let mut s = SettingsStore::new();
    let p = Path::new(vec![Key::from("layers"), Key::from(1usize), Key::from("x")]);
    s.adjust(&p, Value::from(4.0), false);
    assert_eq!(s.root(), &v(json!({"layers": [null, {"x": 4}]})));
}

#[test]
fn write_below_scalar_is_refused() {
    let mut s = SettingsStore::new();
    s.adjust(&Path::from("n"), Value::from(1.0), false);
    let changed = s.adjust(&Path::from(["n", "x", "y"]), v(json!({"z": 1})), false);
    assert!(changed.is_empty());
    assert_eq!(s.get(&Path::from("n"), false), Some(&Value::from(1.0)));
}

#[test]
fn far_out_of_range_index_is_refused() {
    let mut s = SettingsStore::new();
    s.adjust(&Path::from("layers"), v(json!([1, 2])), false);
    let before = s.clone();

    let huge = Path::new(vec![Key::from("layers"), Key::Index(usize::MAX)]);
    assert!(s.adjust(&huge, Value::from(1.0), false).is_empty());
    let deep = Path::new(vec![Key::from("layers"), Key::Index(usize::MAX / 2), Key::from("x")]);
    assert!(s.adjust(&deep, Value::from(1.0), false).is_empty());
    let by_name = Path::new(vec![Key::from("layers"), Key::from("99999999999")]);
    assert!(s.adjust(&by_name, Value::from(1.0), false).is_empty());
    assert_eq!(s, before);

    let near = Path::new(vec![Key::from("layers"), Key::Index(4)]);
    s.adjust(&near, Value::from(5.0), false);
    let padded = v(json!([1, 2, null, null, 5]));
    assert_eq!(s.get(&Path::from("layers"), true), Some(&padded));
}

#[test]
fn unrepresentable_numbers_are_not_keys() {
    assert_eq!(Key::from_value(&Value::from(1e19)), None);
    assert_eq!(Key::from_value(&Value::from(f64::INFINITY)), None);
    assert_eq!(Key::from_value(&Value::from(-1.0)), None);
    assert_eq!(Key::from_value(&Value::from(3.0)), Some(Key::Index(3)));
    assert_eq!(Path::from_value(&v(json!(["layers", 1e19]))), None);
}

#[test]
fn misses_are_typed() {
    let mut s = SettingsStore::new();
    s.adjust(&Path::from("n"), Value::from(1.0), false);
    let miss = s.resolve(&Path::from(["n", "x"])).unwrap_err();
    assert_eq!(miss, PathMiss { depth: 1, reason: MissReason::NotAContainer });
    let miss = s.resolve(&Path::from(["nope"])).unwrap_err();
    assert_eq!(miss.reason, MissReason::MissingKey);

    assert_eq!(s.get(&Path::from("nope"), true), None);
    assert_eq!(s.get(&Path::from("nope"), false), Some(&Value::mapping()));
}

#[test]
fn numeric_key_into_scalar_yields_nothing() {
    let mut s = SettingsStore::new();
    s.adjust(&Path::from("t"), Value::from("text"), false);
    let p = Path::new(vec![Key::from("t"), Key::from(0usize)]);
    assert_eq!(s.get(&p, true), None);
}

#[test]
fn copy_reads_source_then_adjusts() {
    let mut s = SettingsStore::new();
    s.adjust(&Path::from("src"), v(json!({"a": 1})), false);
    s.adjust(&Path::from("dst"), v(json!({"b": 2})), false);
    let changed = s.copy(&Path::from("dst"), &Path::from("src"), false);
    assert_eq!(changed, vec!["a".to_owned()]);
    assert_eq!(s.get(&Path::from("dst"), false), Some(&v(json!({"a": 1, "b": 2}))));
}

#[test]
fn clear_removes_subtree_or_everything() {
    let mut s = SettingsStore::new();
    s.adjust(&Path::root(), v(json!({"a": {"b": 1, "c": 2}, "l": [1, 2]})), false);
    s.clear(Some(&Path::from(["a", "b"])));
    assert_eq!(s.get(&Path::from("a"), false), Some(&v(json!({"c": 2}))));
    s.clear(Some(&Path::new(vec![Key::from("l"), Key::from(0usize)])));
    assert_eq!(s.get(&Path::from("l"), false), Some(&v(json!([null, 2]))));
    s.clear(None);
    assert_eq!(s.root(), &Value::mapping());
}

#[test]
fn silent_field_write_requires_mapping() {
    let mut s = SettingsStore::new();
    s.adjust(&Path::from("m"), v(json!({"x": 0})), false);
    assert!(s.set_field_silent(&Path::from("m"), "x", Value::from(3.0)));
    assert!(!s.set_field_silent(&Path::from("missing"), "x", Value::from(3.0)));
    assert_eq!(s.get(&Path::from(["m", "x"]), false), Some(&Value::from(3.0)));
}
