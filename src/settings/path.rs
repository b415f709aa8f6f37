use std::fmt;

use crate::settings::value::Value;

/// Reserved transition-table key for the empty (root) path.
pub const GLOBAL_KEY: &str = "-global";

/// Largest number [`Key::from_value`] accepts as an index.
const MAX_INDEX: f64 = u32::MAX as f64;

/// One segment of a settings path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Key {
    /// Index into a sequence.
    Index(usize),
    /// Field of a mapping.
    Name(String),
}

impl Key {
    /// Interpret a scalar settings value as a key. Numbers must be whole, non-negative and
    /// no larger than `u32::MAX`.
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Text(s) => Some(Self::Name(s.clone())),
            Value::Number(n) if *n >= 0.0 && *n <= MAX_INDEX && n.fract() == 0.0 => {
                Some(Self::Index(*n as usize))
            }
            _ => None,
        }
    }

    /// True for integer keys.
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// The key as a mapping field name (indices are rendered in decimal).
    pub fn as_field(&self) -> String {
        match self {
            Self::Index(i) => i.to_string(),
            Self::Name(s) => s.clone(),
        }
    }

    /// Convert back into a settings value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Index(i) => Value::from(*i),
            Self::Name(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Name(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Name(s)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

/// Address of a node in the settings tree. The empty path is the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Path(Vec<Key>);

impl Path {
    /// Path from explicit keys.
    pub fn new(keys: Vec<Key>) -> Self {
        Self(keys)
    }

    /// The empty (root) path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Interpret a settings value as a path: text is a one-key path, a non-negative
    /// integer is a one-index path, and a sequence of such scalars is a full path.
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Sequence(items) => items
                .iter()
                .map(Key::from_value)
                .collect::<Option<Vec<_>>>()
                .map(Self),
            other => Key::from_value(other).map(|k| Self(vec![k])),
        }
    }

    /// Keys of this path.
    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment.
    pub fn leaf(&self) -> Option<&Key> {
        self.0.last()
    }

    /// Everything but the last segment.
    pub fn parent(&self) -> Self {
        let n = self.0.len().saturating_sub(1);
        Self(self.0[..n].to_vec())
    }

    /// A new path with `key` appended.
    pub fn child(&self, key: impl Into<Key>) -> Self {
        let mut keys = self.0.clone();
        keys.push(key.into());
        Self(keys)
    }

    /// Key used to bucket transitions: segments joined with `-`, or [`GLOBAL_KEY`] for
    /// the root.
    pub fn joined(&self) -> String {
        if self.0.is_empty() {
            return GLOBAL_KEY.to_owned();
        }
        self.0
            .iter()
            .map(Key::as_field)
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Convert back into a settings value (a sequence of keys).
    pub fn to_value(&self) -> Value {
        Value::Sequence(self.0.iter().map(Key::to_value).collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, k) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}")?;
        }
        f.write_str("]")
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self(vec![Key::from(s)])
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(keys: [&str; N]) -> Self {
        Self(keys.iter().map(|k| Key::from(*k)).collect())
    }
}

impl From<Vec<Key>> for Path {
    fn from(keys: Vec<Key>) -> Self {
        Self(keys)
    }
}

impl TryFrom<Value> for Path {
    type Error = String;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        Self::from_value(&v).ok_or_else(|| format!("{} is not a settings path", v.kind_name()))
    }
}

impl<'de> serde::Deserialize<'de> for Path {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = Value::deserialize(deserializer)?;
        Self::try_from(v).map_err(serde::de::Error::custom)
    }
}
