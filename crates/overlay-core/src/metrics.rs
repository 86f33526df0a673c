//! Text metrics for the standard PDF fonts and overlay autosizing
//!
//! Width tables are built once per process on first use and shared
//! read-only. Callers receive the measurer explicitly; nothing here
//! reaches for hidden global drawing state.

use crate::coords::to_surface;
use crate::model::{NormalizedPoint, PageSize, SurfaceRect};
use std::sync::OnceLock;

/// Horizontal padding on each side of an autosized overlay box, in pixels
pub const BOX_PADDING: f64 = 4.0;
/// Line height as a multiple of the font size
pub const LINE_HEIGHT: f64 = 1.2;

/// Width of glyphs outside the tables, in 1/1000 em
const FALLBACK_WIDTH: u16 = 600;

// Helvetica (WinAnsi, 32..126) widths in 1/1000 em
const HELVETICA_32_126: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// The PDF standard 14 fonts, which every viewer provides without embedding a font program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

impl StandardFont {
    pub fn from_name(name: &str) -> Option<Self> {
        let font = match name {
            "Helvetica" => StandardFont::Helvetica,
            "Helvetica-Bold" => StandardFont::HelveticaBold,
            "Helvetica-Oblique" => StandardFont::HelveticaOblique,
            "Helvetica-BoldOblique" => StandardFont::HelveticaBoldOblique,
            "Times-Roman" => StandardFont::TimesRoman,
            "Times-Bold" => StandardFont::TimesBold,
            "Times-Italic" => StandardFont::TimesItalic,
            "Times-BoldItalic" => StandardFont::TimesBoldItalic,
            "Courier" => StandardFont::Courier,
            "Courier-Bold" => StandardFont::CourierBold,
            "Courier-Oblique" => StandardFont::CourierOblique,
            "Courier-BoldOblique" => StandardFont::CourierBoldOblique,
            "Symbol" => StandardFont::Symbol,
            "ZapfDingbats" => StandardFont::ZapfDingbats,
            _ => return None,
        };
        Some(font)
    }

    /// The PostScript name written as `/BaseFont`
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    pub fn is_fixed_pitch(&self) -> bool {
        matches!(
            self,
            StandardFont::Courier
                | StandardFont::CourierBold
                | StandardFont::CourierOblique
                | StandardFont::CourierBoldOblique
        )
    }

    /// Symbol and ZapfDingbats carry their own encodings
    pub fn uses_win_ansi(&self) -> bool {
        !matches!(self, StandardFont::Symbol | StandardFont::ZapfDingbats)
    }
}

pub trait TextMeasurer {
    /// Advance width of `text` at `font_size`, in points
    fn text_width(&self, text: &str, font_size: f64) -> f64;
}

/// Per-byte advance widths for a standard font under WinAnsi encoding.
///
/// Proportional faces share the Helvetica table; fixed-pitch faces are 600 throughout.
#[derive(Debug)]
pub struct StandardFontMetrics {
    widths: [u16; 256],
}

static PROPORTIONAL: OnceLock<StandardFontMetrics> = OnceLock::new();
static FIXED_PITCH: OnceLock<StandardFontMetrics> = OnceLock::new();

impl StandardFontMetrics {
    /// Shared metrics for `font`, built on first use
    pub fn shared(font: StandardFont) -> &'static StandardFontMetrics {
        if font.is_fixed_pitch() {
            FIXED_PITCH.get_or_init(|| StandardFontMetrics {
                widths: [FALLBACK_WIDTH; 256],
            })
        } else {
            PROPORTIONAL.get_or_init(Self::build_proportional)
        }
    }

    fn build_proportional() -> Self {
        let mut widths = [FALLBACK_WIDTH; 256];
        for (offset, width) in HELVETICA_32_126.iter().enumerate() {
            widths[32 + offset] = *width;
        }
        tracing::debug!("Built proportional font width table");
        Self { widths }
    }

    /// Width of one WinAnsi byte, in 1/1000 em
    pub fn byte_width(&self, byte: u8) -> u16 {
        self.widths[byte as usize]
    }
}

impl TextMeasurer for StandardFontMetrics {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        let em: f64 = encode_win_ansi(text)
            .into_iter()
            .map(|b| self.byte_width(b) as f64)
            .sum();
        em * font_size / 1000.0
    }
}

/// Encode `text` as WinAnsi bytes; characters outside the code page become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => c as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            _ => b'?',
        })
        .collect()
}

/// On-surface box an overlay occupies: text width plus padding, one line tall.
///
/// Empty text still gets a box two ems wide so it can be grabbed.
pub fn autosize_box(
    measurer: &dyn TextMeasurer,
    text: &str,
    font_size: f64,
    anchor: NormalizedPoint,
    page: PageSize,
) -> SurfaceRect {
    let origin = to_surface(anchor, page);
    let text_width = measurer.text_width(text, font_size).max(font_size * 2.0);

    SurfaceRect {
        x: origin.x,
        y: origin.y,
        width: text_width + BOX_PADDING * 2.0,
        height: font_size * LINE_HEIGHT,
    }
}
