use std::{collections::BTreeMap, fmt, marker::PhantomData};

use serde::de::{MapAccess, Visitor};

use crate::{
    engine::{Engine, EngineConfig},
    foundation::{
        core::SurfaceSpec,
        error::{EngineError, EngineResult},
    },
    schedule::pipeline::PipelineDef,
    settings::{path::Path, value::Value},
};

/// A whole engine setup in one JSON document.
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct EngineDocument {
    /// Engine configuration; defaults when absent.
    pub config: EngineConfig,
    /// Merged into the settings root.
    pub settings: Value,
    /// Surfaces to register.
    pub surfaces: BTreeMap<String, SurfaceSpec>,
    /// Pipelines in document order.
    pub pipelines: Ordered<PipelineDef>,
    /// Pipelines to start after all are added.
    pub start: Vec<String>,
}

impl EngineDocument {
    /// Parse a document.
    pub fn from_json_str(s: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

impl Engine {
    /// Merge the document's settings, register its surfaces and pipelines in order, then
    /// start the listed pipelines. Its `config` is not applied here; pass it to
    /// [`Engine::with_clock`].
    ///
    /// Settings that are neither null nor a mapping are rejected with
    /// [`EngineError::Settings`] before anything is registered.
    pub fn load_document(&mut self, doc: &EngineDocument) -> EngineResult<()> {
        match &doc.settings {
            Value::Null => {}
            settings @ Value::Mapping(_) => {
                self.adjust_settings(&Path::root(), settings.clone(), false)
            }
            other => {
                return Err(EngineError::settings(format!(
                    "document settings must be a mapping, not {}",
                    other.kind_name()
                )));
            }
        }
        for (name, spec) in &doc.surfaces {
            self.add_surface(name, spec.clone());
        }
        for (name, def) in doc.pipelines.iter() {
            self.add_pipeline(name, def.clone())?;
        }
        for name in &doc.start {
            self.start_pipeline(name)?;
        }
        tracing::info!(
            pipelines = doc.pipelines.len(),
            surfaces = doc.surfaces.len(),
            "document loaded"
        );
        Ok(())
    }
}

/// JSON object read as a list of entries in document order.
#[derive(Clone, Debug, PartialEq)]
pub struct Ordered<T>(pub Vec<(String, T)>);

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Ordered<T> {
    /// Entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de, T: serde::Deserialize<'de>> serde::Deserialize<'de> for Ordered<T> {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<T>(PhantomData<T>);

        impl<'de, T: serde::Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
            type Value = Ordered<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((k, v)) = map.next_entry::<String, T>()? {
                    out.push((k, v));
                }
                Ok(Ordered(out))
            }
        }

        d.deserialize_map(OrderedVisitor(PhantomData))
    }
}
