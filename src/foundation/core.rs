use std::sync::Arc;

/// Closed set of surface classifications the engine distinguishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    /// Drawable bitmap target (the default for new surfaces).
    #[default]
    Canvas,
    /// Still image source.
    Image,
    /// Video source.
    Video,
    /// Generic host element, targetable by class/style actions.
    Element,
    /// Anything else.
    Unknown,
}

/// Declarative description used to register a surface with an engine.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SurfaceSpec {
    /// Surface classification.
    #[serde(default)]
    pub kind: SurfaceKind,
    /// Optional width in pixels.
    #[serde(default)]
    pub width: Option<u32>,
    /// Optional height in pixels.
    #[serde(default)]
    pub height: Option<u32>,
}

/// Opaque, cheaply clonable handle to a named render source/target.
///
/// The engine never draws into surfaces; it only threads them between stages and hands
/// them to renderers.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    name: Arc<str>,
    spec: SurfaceSpec,
}

impl Surface {
    /// Create a handle for `name` described by `spec`.
    pub fn new(name: impl Into<Arc<str>>, spec: SurfaceSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }

    /// Shorthand for an unsized canvas surface.
    pub fn canvas(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, SurfaceSpec::default())
    }

    /// Name the surface is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Surface classification.
    pub fn kind(&self) -> SurfaceKind {
        self.spec.kind
    }

    /// Full description.
    pub fn spec(&self) -> &SurfaceSpec {
        &self.spec
    }
}

/// Straight (non-premultiplied) 8-bit RGBA color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel (255 = opaque).
    pub a: u8,
}

impl Rgba8 {
    /// Construct from channel values.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Linear per-channel interpolation; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
            let a = f64::from(a);
            let b = f64::from(b);
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        }

        let t = t.clamp(0.0, 1.0);
        Self {
            r: lerp_u8(self.r, other.r, t),
            g: lerp_u8(self.g, other.g, t),
            b: lerp_u8(self.b, other.b, t),
            a: lerp_u8(self.a, other.a, t),
        }
    }
}
