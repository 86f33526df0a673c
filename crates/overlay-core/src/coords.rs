//! Coordinate transformation between normalized, surface and PDF space
//!
//! - normalized: 0..1 fractions of the page, origin top-left
//! - surface: pixels of the page's drawing surface at scale 1, origin top-left
//! - PDF: points, origin bottom-left
//!
//! A page's native size in points doubles as its surface size in pixels.

use crate::model::{NormalizedPoint, PageSize, PdfPoint, SurfacePoint};

/// Clamp into [0, 1]. NaN maps to 0.
pub fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

/// Convert a normalized position to surface pixels
pub fn to_surface(norm: NormalizedPoint, size: PageSize) -> SurfacePoint {
    SurfacePoint {
        x: norm.x * size.width,
        y: norm.y * size.height,
    }
}

/// Convert a surface pixel position (e.g. a drag result) to a clamped normalized position.
///
/// An axis with a non-positive extent maps to 0 instead of dividing by zero.
pub fn from_surface(px: SurfacePoint, size: PageSize) -> NormalizedPoint {
    let axis = |value: f64, extent: f64| {
        if extent > 0.0 {
            clamp01(value / extent)
        } else {
            0.0
        }
    };

    NormalizedPoint {
        x: axis(px.x, size.width),
        y: axis(px.y, size.height),
    }
}

/// Convert a normalized top-left anchor into a PDF text baseline.
///
/// Subtracting the font size from the flipped top edge approximates the
/// baseline; real ascent metrics are not consulted.
pub fn to_pdf_point(norm: NormalizedPoint, size: PageSize, font_size_pt: f64) -> PdfPoint {
    PdfPoint {
        x: norm.x * size.width,
        y: size.height - norm.y * size.height - font_size_pt,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..5000.0
    }

    proptest! {
        /// normalized -> surface -> normalized is the identity
        #[test]
        fn roundtrip_norm_surface_norm(
            x in 0.0f64..=1.0,
            y in 0.0f64..=1.0,
            w in dimension(),
            h in dimension(),
        ) {
            let size = PageSize::new(w, h);
            let back = from_surface(to_surface(NormalizedPoint { x, y }, size), size);

            let tolerance = 1e-9;
            prop_assert!((back.x - x).abs() < tolerance, "X: {} vs {}", back.x, x);
            prop_assert!((back.y - y).abs() < tolerance, "Y: {} vs {}", back.y, y);
        }

        /// Any surface position, on or off the page, normalizes into [0, 1]
        #[test]
        fn from_surface_always_clamped(
            px in -10_000.0f64..10_000.0,
            py in -10_000.0f64..10_000.0,
            w in dimension(),
            h in dimension(),
        ) {
            let norm = from_surface(SurfacePoint { x: px, y: py }, PageSize::new(w, h));
            prop_assert!((0.0..=1.0).contains(&norm.x));
            prop_assert!((0.0..=1.0).contains(&norm.y));
        }

        /// PDF x matches surface x; PDF y is the flipped surface y minus the font size
        #[test]
        fn pdf_point_agrees_with_surface(
            x in 0.0f64..=1.0,
            y in 0.0f64..=1.0,
            w in dimension(),
            h in dimension(),
            font in 1.0f64..200.0,
        ) {
            let size = PageSize::new(w, h);
            let norm = NormalizedPoint { x, y };
            let surface = to_surface(norm, size);
            let pdf = to_pdf_point(norm, size, font);

            prop_assert!((pdf.x - surface.x).abs() < 1e-9);
            prop_assert!((pdf.y - (h - surface.y - font)).abs() < 1e-9);
        }
    }
}
