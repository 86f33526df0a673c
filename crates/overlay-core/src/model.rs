//! Overlay data model
//!
//! Text overlays are stored in normalized page space (0..1, origin top-left),
//! so they stay put regardless of the zoom or pixel density a page is shown at.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Page dimensions in PDF points. At scale 1 this is also the surface size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// US Letter, used when a page carries no usable MediaBox
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Position as a fraction of the owning page's width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

/// Position in rendering-surface pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    pub x: f64,
    pub y: f64,
}

/// Position in PDF user space, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfPoint {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned box on a rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayId(String);

impl OverlayId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OverlayId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for OverlayId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One text annotation on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayItem {
    pub id: OverlayId,
    pub text: String,
    pub x: f64,
    pub y: f64,
    /// UI pixels, treated as numerically equal to PDF points
    pub font_size: f64,
    /// CSS color specifier, resolved to RGB at export time
    pub color: String,
}

impl OverlayItem {
    pub fn new(text: impl Into<String>, x: f64, y: f64, font_size: f64, color: impl Into<String>) -> Self {
        Self {
            id: OverlayId::new(),
            text: text.into(),
            x,
            y,
            font_size,
            color: color.into(),
        }
    }

    pub fn position(&self) -> NormalizedPoint {
        NormalizedPoint {
            x: self.x,
            y: self.y,
        }
    }

    /// Shallow-merge every field set in `patch`.
    pub fn apply(&mut self, patch: &OverlayPatch) {
        if let Some(text) = &patch.text {
            self.text.clone_from(text);
        }
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(font_size) = patch.font_size {
            self.font_size = font_size;
        }
        if let Some(color) = &patch.color {
            self.color.clone_from(color);
        }
    }
}

/// Partial update for an [`OverlayItem`]. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayPatch {
    pub text: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub font_size: Option<f64>,
    pub color: Option<String>,
}

impl OverlayPatch {
    pub fn position(point: NormalizedPoint) -> Self {
        Self {
            x: Some(point.x),
            y: Some(point.y),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn font_size(size: f64) -> Self {
        Self {
            font_size: Some(size),
            ..Self::default()
        }
    }

    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::default()
        }
    }
}

/// Page index (0-based) to overlays in z-order, later items on top.
pub type OverlayCollection = BTreeMap<usize, Vec<OverlayItem>>;
