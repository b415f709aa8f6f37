use crate::settings::{
    path::{Key, Path},
    value::{Mapping, Value},
};

static EMPTY: Value = Value::Mapping(Mapping::new());

/// Furthest a write may index past the end of a sequence; the gap is filled with nulls.
const MAX_SEQUENCE_GAP: usize = 1024;

/// Why a path failed to resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissReason {
    /// A container along the path has no entry for the key.
    MissingKey,
    /// A scalar was reached before the end of the path.
    NotAContainer,
}

/// Typed "not found" outcome of [`SettingsStore::resolve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathMiss {
    /// Index of the path segment that could not be followed.
    pub depth: usize,
    /// What went wrong at that segment.
    pub reason: MissReason,
}

/// Hierarchical key-path store holding all mutable animation state.
///
/// The root is always a mapping. Writes through [`SettingsStore::adjust`] report the
/// mapping fields they touched so the owner can notify listeners.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingsStore {
    root: Value,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            root: Value::mapping(),
        }
    }

    /// The whole tree.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Resolve `path` without creating anything.
    pub fn resolve(&self, path: &Path) -> Result<&Value, PathMiss> {
        let mut node = &self.root;
        for (depth, key) in path.keys().iter().enumerate() {
            node = match child(node, key) {
                Ok(next) => next,
                Err(reason) => return Err(PathMiss { depth, reason }),
            };
        }
        Ok(node)
    }

    /// Resolve `path`. On a miss, returns `None` when `allow_missing`, otherwise logs a
    /// warning and returns an empty mapping.
    pub fn get(&self, path: &Path, allow_missing: bool) -> Option<&Value> {
        match self.resolve(path) {
            Ok(v) => Some(v),
            Err(_) if allow_missing => None,
            Err(miss) => {
                tracing::warn!(
                    %path,
                    depth = miss.depth,
                    reason = ?miss.reason,
                    "settings could not be found"
                );
                Some(&EMPTY)
            }
        }
    }

    /// Mutable access to an existing node.
    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Value> {
        let mut node = &mut self.root;
        for key in path.keys() {
            node = child_mut(node, key)?;
        }
        Some(node)
    }

    /// Parent container of `path`'s leaf, creating missing intermediate containers: a
    /// sequence when the following segment is an index, a mapping otherwise. Null
    /// intermediates are replaced; other scalars stop resolution.
    pub fn parent_for_write(&mut self, path: &Path) -> Option<&mut Value> {
        let keys = path.keys();
        let depth = keys.len().saturating_sub(1);
        let mut node = &mut self.root;
        for i in 0..depth {
            let next_is_index = keys.get(i + 1).is_some_and(Key::is_index);
            node = match child_for_write(node, &keys[i], next_is_index) {
                Some(next) => next,
                None => {
                    tracing::warn!(%path, depth = i, "cannot create intermediate settings");
                    return None;
                }
            };
        }
        Some(node)
    }

    /// Write `new_value` at `path` and return the mapping fields that changed.
    ///
    /// - empty path: shallow-replace each top-level key of a mapping `new_value`;
    /// - sequence: replace (when `clear` or the leaf is not a sequence) or splice into the
    ///   leaf sequence, overwriting leading elements;
    /// - mapping: shallow-merge into the leaf mapping (replacing it when `clear` or the
    ///   leaf is not a mapping), one reported field per key;
    /// - scalar: set the leaf directly, reporting nothing.
    pub fn adjust(&mut self, path: &Path, new_value: Value, clear: bool) -> Vec<String> {
        let mut changed = Vec::new();

        if path.is_empty() {
            match new_value {
                Value::Mapping(m) => {
                    if let Some(root) = self.root.as_mapping_mut() {
                        for (k, v) in m {
                            root.insert(k.clone(), v);
                            changed.push(k);
                        }
                    }
                }
                other => {
                    tracing::warn!(
                        kind = other.kind_name(),
                        "root adjust ignored: only a mapping can be merged into the root"
                    );
                }
            }
            return changed;
        }

        let Some(leaf) = path.leaf().cloned() else {
            return changed;
        };
        let Some(parent) = self.parent_for_write(path) else {
            return changed;
        };
        let Some(slot) = slot_for_write(parent, &leaf) else {
            tracing::warn!(%path, "adjust target cannot be written");
            return changed;
        };

        match new_value {
            Value::Sequence(items) => {
                if clear || !matches!(slot, Value::Sequence(_)) {
                    *slot = Value::Sequence(Vec::new());
                }
                if let Some(seq) = slot.as_sequence_mut() {
                    for (i, v) in items.into_iter().enumerate() {
                        if i < seq.len() {
                            seq[i] = v;
                        } else {
                            seq.push(v);
                        }
                    }
                }
            }
            Value::Mapping(m) => {
                if clear || !matches!(slot, Value::Mapping(_)) {
                    *slot = Value::mapping();
                }
                if let Some(map) = slot.as_mapping_mut() {
                    for (k, v) in m {
                        map.insert(k.clone(), v);
                        changed.push(k);
                    }
                }
            }
            scalar => *slot = scalar,
        }
        changed
    }

    /// Read `source` and [`adjust`](Self::adjust) it into `path`.
    pub fn copy(&mut self, path: &Path, source: &Path, clear: bool) -> Vec<String> {
        let value = self.get(source, false).cloned().unwrap_or_default();
        self.adjust(path, value, clear)
    }

    /// Delete the subtree at `path`, or reset the whole store when `path` is `None` or
    /// empty. Deleting a sequence element leaves a null hole.
    pub fn clear(&mut self, path: Option<&Path>) {
        let Some(path) = path.filter(|p| !p.is_empty()) else {
            self.root = Value::mapping();
            return;
        };
        let Some(leaf) = path.leaf() else {
            return;
        };
        let Some(parent) = self.get_mut(&path.parent()) else {
            return;
        };
        match (parent, leaf) {
            (Value::Mapping(m), key) => {
                m.remove(&key.as_field());
            }
            (Value::Sequence(seq), key) => {
                if let Some(slot) = seq_index(key).and_then(|i| seq.get_mut(i)) {
                    *slot = Value::Null;
                }
            }
            _ => {}
        }
    }

    /// Set `field` of the mapping at `path` without reporting a change. Returns false when
    /// the path does not lead to a mapping.
    pub fn set_field_silent(&mut self, path: &Path, field: &str, value: Value) -> bool {
        match self.get_mut(path).and_then(Value::as_mapping_mut) {
            Some(map) => {
                map.insert(field.to_owned(), value);
                true
            }
            None => false,
        }
    }
}

fn seq_index(key: &Key) -> Option<usize> {
    match key {
        Key::Index(i) => Some(*i),
        Key::Name(s) => s.parse().ok(),
    }
}

fn child<'a>(node: &'a Value, key: &Key) -> Result<&'a Value, MissReason> {
    match node {
        Value::Mapping(m) => m.get(&key.as_field()).ok_or(MissReason::MissingKey),
        Value::Sequence(seq) => seq_index(key)
            .and_then(|i| seq.get(i))
            .ok_or(MissReason::MissingKey),
        _ => Err(MissReason::NotAContainer),
    }
}

fn child_mut<'a>(node: &'a mut Value, key: &Key) -> Option<&'a mut Value> {
    match node {
        Value::Mapping(m) => m.get_mut(&key.as_field()),
        Value::Sequence(seq) => seq_index(key).and_then(|i| seq.get_mut(i)),
        _ => None,
    }
}

fn slot_for_write<'a>(node: &'a mut Value, key: &Key) -> Option<&'a mut Value> {
    match node {
        Value::Mapping(m) => Some(m.entry(key.as_field()).or_insert(Value::Null)),
        Value::Sequence(seq) => {
            let i = seq_index(key)?;
            if i > seq.len().saturating_add(MAX_SEQUENCE_GAP) {
                tracing::warn!(index = i, len = seq.len(), "sequence index too far past the end");
                return None;
            }
            if i >= seq.len() {
                seq.resize(i + 1, Value::Null);
            }
            seq.get_mut(i)
        }
        _ => None,
    }
}

fn child_for_write<'a>(
    node: &'a mut Value,
    key: &Key,
    next_is_index: bool,
) -> Option<&'a mut Value> {
    let slot = slot_for_write(node, key)?;
    if slot.is_null() {
        *slot = if next_is_index {
            Value::Sequence(Vec::new())
        } else {
            Value::mapping()
        };
    }
    if slot.is_container() { Some(slot) } else { None }
}

#[cfg(test)]
#[path = "../../tests/unit/settings/store.rs"]
mod tests;
