use crate::settings::value::Value;

/// What a dependency points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DependencyKind {
    /// A registered renderer.
    Renderer,
    /// A registered action.
    Action,
    /// Neither; ignored with a diagnostic.
    Unknown,
}

/// Requirement that a renderer or action exists with at least `version`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dependency {
    /// Target table.
    pub kind: DependencyKind,
    /// Registered name in that table.
    pub name: String,
    /// Minimum version; `None` accepts any.
    pub version: Option<u32>,
}

impl Dependency {
    /// Require the renderer `name`.
    pub fn renderer(name: impl Into<String>) -> Self {
        Self {
            kind: DependencyKind::Renderer,
            name: name.into(),
            version: None,
        }
    }

    /// Require the action `name`.
    pub fn action(name: impl Into<String>) -> Self {
        Self {
            kind: DependencyKind::Action,
            name: name.into(),
            version: None,
        }
    }

    /// Require at least `version`.
    pub fn at_least(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}

#[derive(serde::Deserialize)]
struct DependencyDef {
    #[serde(default)]
    renderer: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    version: Option<u32>,
    #[serde(flatten)]
    rest: std::collections::BTreeMap<String, Value>,
}

impl<'de> serde::Deserialize<'de> for Dependency {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let def = DependencyDef::deserialize(d)?;
        let (kind, name) = match (def.action, def.renderer) {
            (Some(name), _) => (DependencyKind::Action, name),
            (None, Some(name)) => (DependencyKind::Renderer, name),
            (None, None) => (
                DependencyKind::Unknown,
                def.rest.keys().next().cloned().unwrap_or_default(),
            ),
        };
        Ok(Self {
            kind,
            name,
            version: def.version,
        })
    }
}
