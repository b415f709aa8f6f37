use image::{Rgba, RgbaImage};

use crate::foundation::core::Rgba8;

/// Number of colour samples in a gradient.
pub const GRADIENT_SAMPLES: u32 = 100;

/// Linear colour ramp pre-rendered as a 1x100 RGBA strip, sampled at pixel centres.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    strip: RgbaImage,
}

impl Gradient {
    /// Ramp from `from` to `to`.
    pub fn between(from: Rgba8, to: Rgba8) -> Self {
        let strip = RgbaImage::from_fn(1, GRADIENT_SAMPLES, |_, y| {
            let t = (f64::from(y) + 0.5) / f64::from(GRADIENT_SAMPLES);
            let c = from.lerp(to, t);
            Rgba([c.r, c.g, c.b, c.a])
        });
        Self { strip }
    }

    /// Colour at `progress` in `[0, 1]`: sample `round(progress * 99)`.
    pub fn sample(&self, progress: f64) -> Rgba8 {
        let last = f64::from(GRADIENT_SAMPLES - 1);
        let index = (progress.clamp(0.0, 1.0) * last).round() as u32;
        let Rgba([r, g, b, a]) = *self.strip.get_pixel(0, index);
        Rgba8::new(r, g, b, a)
    }

    /// Raw RGBA bytes, four per sample.
    pub fn as_raw(&self) -> &[u8] {
        self.strip.as_raw()
    }
}
