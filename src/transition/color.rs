use crate::foundation::core::Rgba8;

const NAMED: [(&str, Rgba8); 16] = [
    ("black", Rgba8::new(0, 0, 0, 255)),
    ("white", Rgba8::new(255, 255, 255, 255)),
    ("red", Rgba8::new(255, 0, 0, 255)),
    ("green", Rgba8::new(0, 128, 0, 255)),
    ("lime", Rgba8::new(0, 255, 0, 255)),
    ("blue", Rgba8::new(0, 0, 255, 255)),
    ("yellow", Rgba8::new(255, 255, 0, 255)),
    ("cyan", Rgba8::new(0, 255, 255, 255)),
    ("aqua", Rgba8::new(0, 255, 255, 255)),
    ("magenta", Rgba8::new(255, 0, 255, 255)),
    ("fuchsia", Rgba8::new(255, 0, 255, 255)),
    ("gray", Rgba8::new(128, 128, 128, 255)),
    ("grey", Rgba8::new(128, 128, 128, 255)),
    ("orange", Rgba8::new(255, 165, 0, 255)),
    ("purple", Rgba8::new(128, 0, 128, 255)),
    ("transparent", Rgba8::new(0, 0, 0, 0)),
];

/// Parse a CSS colour: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()`, `hsl()`,
/// `hsla()` or a basic named colour.
pub fn parse_color(s: &str) -> Result<Rgba8, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = s.to_ascii_lowercase();
    if let Some((name, args)) = lower.split_once('(') {
        let args = args
            .strip_suffix(')')
            .ok_or_else(|| format!("unterminated colour function \"{s}\""))?;
        let parts: Vec<&str> = args
            .split([',', ' ', '/'])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        return match name.trim() {
            "rgb" | "rgba" => parse_rgb_args(&parts),
            "hsl" | "hsla" => parse_hsl_args(&parts),
            other => Err(format!("unknown colour function \"{other}\"")),
        };
    }
    NAMED
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|(_, c)| *c)
        .ok_or_else(|| format!("unknown colour \"{s}\""))
}

/// CSS `rgba(r,g,b,a)` text with alpha as a fraction.
pub fn format_rgba(c: Rgba8) -> String {
    let alpha = f64::from(c.a) / 255.0;
    format!("rgba({},{},{},{alpha})", c.r, c.g, c.b)
}

fn parse_hex(s: &str) -> Result<Rgba8, String> {
    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }
    fn hex_nibble(c: &str) -> Result<u8, String> {
        hex_byte(c).map(|n| n * 17)
    }

    if !s.is_ascii() {
        return Err(format!("invalid hex colour \"#{s}\""));
    }
    match s.len() {
        3 | 4 => {
            let r = hex_nibble(&s[0..1])?;
            let g = hex_nibble(&s[1..2])?;
            let b = hex_nibble(&s[2..3])?;
            let a = if s.len() == 4 { hex_nibble(&s[3..4])? } else { 255 };
            Ok(Rgba8::new(r, g, b, a))
        }
        6 | 8 => {
            let r = hex_byte(&s[0..2])?;
            let g = hex_byte(&s[2..4])?;
            let b = hex_byte(&s[4..6])?;
            let a = if s.len() == 8 { hex_byte(&s[6..8])? } else { 255 };
            Ok(Rgba8::new(r, g, b, a))
        }
        _ => Err("hex colour must be #rgb, #rgba, #rrggbb or #rrggbbaa".to_owned()),
    }
}

fn number(part: &str) -> Result<f64, String> {
    part.parse::<f64>()
        .map_err(|_| format!("invalid colour component \"{part}\""))
}

/// Channel in 0..=255, percentages allowed.
fn channel(part: &str) -> Result<u8, String> {
    let v = match part.strip_suffix('%') {
        Some(pct) => number(pct)? * 2.55,
        None => number(part)?,
    };
    Ok(v.clamp(0.0, 255.0).round() as u8)
}

/// Alpha in 0..=1 (or a percentage) mapped to 0..=255.
fn alpha(part: Option<&&str>) -> Result<u8, String> {
    let Some(part) = part else {
        return Ok(255);
    };
    let v = match part.strip_suffix('%') {
        Some(pct) => number(pct)? / 100.0,
        None => number(part)?,
    };
    Ok((v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn fraction(part: &str) -> Result<f64, String> {
    match part.strip_suffix('%') {
        Some(pct) => Ok(number(pct)? / 100.0),
        None => number(part),
    }
}

fn parse_rgb_args(parts: &[&str]) -> Result<Rgba8, String> {
    if !(3..=4).contains(&parts.len()) {
        return Err("rgb() takes 3 or 4 components".to_owned());
    }
    Ok(Rgba8::new(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha(parts.get(3))?,
    ))
}

fn parse_hsl_args(parts: &[&str]) -> Result<Rgba8, String> {
    if !(3..=4).contains(&parts.len()) {
        return Err("hsl() takes 3 or 4 components".to_owned());
    }
    let h = number(parts[0].trim_end_matches("deg"))?;
    let s = fraction(parts[1])?;
    let l = fraction(parts[2])?;
    let (r, g, b) = hsl_to_rgb(h, s, l);
    let to_u8 = |x: f64| (x.clamp(0.0, 1.0) * 255.0).round() as u8;
    Ok(Rgba8::new(to_u8(r), to_u8(g), to_u8(b), alpha(parts.get(3))?))
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (f64, f64, f64) {
    let h = (h % 360.0 + 360.0) % 360.0 / 360.0;
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        return (l, l, l);
    }

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 1.0 / 2.0 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    (
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    )
}
