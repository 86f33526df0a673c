//! Export engine
//!
//! Replays every overlay as a text draw against a fresh writer loaded from the
//! pristine document bytes, converting positions into PDF point space and
//! colors into RGB. Any writer failure aborts the export; nothing partial is
//! returned.

use crate::color::{resolve_color, ColorNormalizer, CssColorParser, Rgb};
use crate::config::EditorConfig;
use crate::coords::to_pdf_point;
use crate::error::{OverlayError, WriterError};
use crate::metrics::StandardFont;
use crate::model::{OverlayCollection, PageSize, PdfPoint};
use crate::upload::PDF_MIME;
use serde::Serialize;

/// Document writer collaborator
pub trait DocumentWriter: Sized {
    /// Handle to an embedded font
    type Font;

    fn load(bytes: &[u8]) -> Result<Self, WriterError>;

    fn page_count(&self) -> usize;

    /// Page size in points, as stored in the document
    fn page_size(&self, index: usize) -> Result<PageSize, WriterError>;

    fn embed_standard_font(&mut self, font: StandardFont) -> Result<Self::Font, WriterError>;

    fn measure_text_width(&self, font: &Self::Font, text: &str, size: f64) -> f64;

    /// Draw `text` with its baseline starting at `at`
    fn draw_text(
        &mut self,
        page: usize,
        text: &str,
        at: PdfPoint,
        size: f64,
        font: &Self::Font,
        color: Rgb,
    ) -> Result<(), WriterError>;

    fn save(self) -> Result<Vec<u8>, WriterError>;
}

/// One issued text draw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPlacement {
    pub page: usize,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub color: Rgb,
    /// Measured advance width in points
    pub width: f64,
}

#[derive(Debug, Clone)]
pub struct ExportedPdf {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub placements: Vec<TextPlacement>,
}

/// Burn `overlays` into the document in `bytes`
///
/// # Errors
///
/// Returns [`OverlayError::Export`] if the writer cannot parse the document,
/// embed the font, draw, or save.
pub fn export_overlays<W: DocumentWriter>(
    bytes: &[u8],
    overlays: &OverlayCollection,
    font: StandardFont,
    normalizer: &dyn ColorNormalizer,
) -> Result<(Vec<u8>, Vec<TextPlacement>), OverlayError> {
    let mut writer = W::load(bytes)?;
    let embedded = writer.embed_standard_font(font)?;
    let page_count = writer.page_count();

    let mut placements = Vec::new();
    for page in 0..page_count {
        let Some(items) = overlays.get(&page) else {
            continue;
        };
        let size = writer.page_size(page)?;

        for item in items {
            let color = resolve_color(normalizer, &item.color);
            let at = to_pdf_point(item.position(), size, item.font_size);
            let width = writer.measure_text_width(&embedded, &item.text, item.font_size);

            writer.draw_text(page, &item.text, at, item.font_size, &embedded, color)?;
            tracing::debug!(
                "Drew {:?} on page {} at ({:.2}, {:.2})",
                item.text,
                page,
                at.x,
                at.y
            );

            placements.push(TextPlacement {
                page,
                text: item.text.clone(),
                x: at.x,
                y: at.y,
                font_size: item.font_size,
                color,
                width,
            });
        }
    }

    for (page, items) in overlays.range(page_count..) {
        if !items.is_empty() {
            tracing::warn!(
                "Skipping {} overlays on page {}: document has {} pages",
                items.len(),
                page,
                page_count
            );
        }
    }

    let out = writer.save()?;
    Ok((out, placements))
}

/// Everything an export needs, detached from the live editor
#[derive(Debug, Clone)]
pub struct ExportJob {
    source_url: String,
    bytes: Vec<u8>,
    overlays: OverlayCollection,
    font: StandardFont,
    output_suffix: String,
}

impl ExportJob {
    pub fn new(
        source_url: impl Into<String>,
        bytes: Vec<u8>,
        overlays: OverlayCollection,
        config: &EditorConfig,
    ) -> Result<Self, OverlayError> {
        let font = config.font()?;
        Ok(Self {
            source_url: source_url.into(),
            bytes,
            overlays,
            font,
            output_suffix: config.output_suffix.clone(),
        })
    }

    pub fn overlays(&self) -> &OverlayCollection {
        &self.overlays
    }

    pub fn file_name(&self) -> String {
        download_file_name(&self.source_url, &self.output_suffix)
    }

    /// Run with the built-in CSS color parser
    pub fn run<W: DocumentWriter>(&self) -> Result<ExportedPdf, OverlayError> {
        self.run_with::<W>(&CssColorParser)
    }

    pub fn run_with<W: DocumentWriter>(
        &self,
        normalizer: &dyn ColorNormalizer,
    ) -> Result<ExportedPdf, OverlayError> {
        let (bytes, placements) =
            export_overlays::<W>(&self.bytes, &self.overlays, self.font, normalizer)?;
        let file_name = self.file_name();

        tracing::info!(
            "Exported {} ({} overlays, {} bytes)",
            file_name,
            placements.len(),
            bytes.len()
        );
        Ok(ExportedPdf {
            file_name,
            mime_type: PDF_MIME,
            bytes,
            placements,
        })
    }
}

/// Download name for an export of the document at `url`
pub fn download_file_name(url: &str, suffix: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();

    let stem = match segment.len().checked_sub(4) {
        Some(cut) if segment.is_char_boundary(cut) && segment[cut..].eq_ignore_ascii_case(".pdf") => {
            &segment[..cut]
        }
        _ => segment,
    };
    let stem = if stem.is_empty() { "document" } else { stem };

    format!("{}{}.pdf", stem, suffix)
}
