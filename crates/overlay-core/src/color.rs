//! CSS color strings to PDF RGB
//!
//! Export resolves each overlay's color through a [`ColorNormalizer`]. Hosts
//! with a native color parser can plug it in; [`CssColorParser`] covers hex,
//! `rgb()`/`rgba()` and the basic named colors.

use serde::{Deserialize, Serialize};

/// RGB color with components in 0..1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }
}

pub trait ColorNormalizer {
    /// Resolve a color specifier, or `None` if it is not understood
    fn normalize(&self, spec: &str) -> Option<Rgb>;
}

/// Resolve `spec`, degrading to black rather than failing.
pub fn resolve_color(normalizer: &dyn ColorNormalizer, spec: &str) -> Rgb {
    normalizer.normalize(spec).unwrap_or_else(|| {
        tracing::warn!("Unresolvable color {:?}, drawing in black", spec);
        Rgb::BLACK
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CssColorParser;

impl ColorNormalizer for CssColorParser {
    fn normalize(&self, spec: &str) -> Option<Rgb> {
        let spec = spec.trim().to_ascii_lowercase();

        if let Some(hex) = spec.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(args) = spec
            .strip_prefix("rgba(")
            .or_else(|| spec.strip_prefix("rgb("))
        {
            return parse_rgb_args(args.strip_suffix(')')?);
        }
        named_color(&spec)
    }
}

/// `rgb`, `rgba`, `rrggbb` or `rrggbbaa`; alpha is ignored
fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        3 | 4 => {
            let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some(Rgb::from_bytes(nibble(0)?, nibble(1)?, nibble(2)?))
        }
        6 | 8 => {
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some(Rgb::from_bytes(byte(0)?, byte(2)?, byte(4)?))
        }
        _ => None,
    }
}

/// Accepts both `255, 0, 0, 0.5` and `255 0 0 / 50%`
fn parse_rgb_args(args: &str) -> Option<Rgb> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }

    let channel = |part: &str| -> Option<f64> {
        let value = if let Some(pct) = part.strip_suffix('%') {
            pct.parse::<f64>().ok()? / 100.0
        } else {
            part.parse::<f64>().ok()? / 255.0
        };
        value.is_finite().then(|| value.clamp(0.0, 1.0))
    };

    if let Some(alpha) = parts.get(3) {
        let alpha = alpha.strip_suffix('%').unwrap_or(alpha);
        alpha.parse::<f64>().ok()?;
    }

    Some(Rgb {
        r: channel(parts[0])?,
        g: channel(parts[1])?,
        b: channel(parts[2])?,
    })
}

fn named_color(name: &str) -> Option<Rgb> {
    let (r, g, b) = match name {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "lime" => (0, 255, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "cyan" | "aqua" => (0, 255, 255),
        "magenta" | "fuchsia" => (255, 0, 255),
        "silver" => (192, 192, 192),
        "gray" | "grey" => (128, 128, 128),
        "maroon" => (128, 0, 0),
        "olive" => (128, 128, 0),
        "purple" => (128, 0, 128),
        "teal" => (0, 128, 128),
        "navy" => (0, 0, 128),
        "orange" => (255, 165, 0),
        _ => return None,
    };
    Some(Rgb::from_bytes(r, g, b))
}
