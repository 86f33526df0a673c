//! Document writer over lopdf
//!
//! Text is appended as a new content stream per page. The page's original
//! content is bracketed with `q`/`Q` first, so whatever graphics state it
//! leaves behind (a scaled CTM, a clip, a fill color) cannot move or tint the
//! overlay text.

use crate::page_box::{effective_resources, owned_dict, page_box};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use overlay_core::metrics::encode_win_ansi;
use overlay_core::{
    DocumentWriter, PageSize, PdfPoint, Rgb, StandardFont, StandardFontMetrics, TextMeasurer,
    WriterError,
};
use std::collections::{BTreeMap, BTreeSet};

/// A standard font added to the document, with its page resource name
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedFont {
    id: ObjectId,
    resource_name: String,
    font: StandardFont,
}

impl EmbeddedFont {
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn font(&self) -> StandardFont {
        self.font
    }
}

#[derive(Default)]
struct PageDraws {
    operations: Vec<Operation>,
    fonts: BTreeMap<String, ObjectId>,
}

pub struct LopdfWriter {
    doc: Document,
    pages: Vec<ObjectId>,
    pending: BTreeMap<usize, PageDraws>,
}

impl LopdfWriter {
    fn page_id(&self, index: usize) -> Result<ObjectId, WriterError> {
        self.pages
            .get(index)
            .copied()
            .ok_or(WriterError::PageNotFound(index))
    }

    /// A font resource name no page already uses
    fn unused_font_name(&self) -> String {
        let mut taken = BTreeSet::new();
        for page_id in &self.pages {
            let resources = effective_resources(&self.doc, *page_id);
            if let Some(fonts) = resources
                .get(b"Font")
                .ok()
                .and_then(|obj| owned_dict(&self.doc, obj))
            {
                taken.extend(fonts.iter().map(|(name, _)| name.clone()));
            }
        }
        for draws in self.pending.values() {
            taken.extend(draws.fonts.keys().map(|name| name.as_bytes().to_vec()));
        }

        let mut n = 1;
        loop {
            let name = format!("OvF{}", n);
            if !taken.contains(name.as_bytes()) {
                return name;
            }
            n += 1;
        }
    }

    fn flush(&mut self) -> Result<(), WriterError> {
        let pending = std::mem::take(&mut self.pending);
        for (index, draws) in pending {
            let page_id = self.page_id(index)?;
            add_font_resources(&mut self.doc, page_id, &draws.fonts)?;

            let overlay = Content {
                operations: draws.operations,
            }
            .encode()
            .map_err(|e| WriterError::Operation(e.to_string()))?;
            append_isolated_content(&mut self.doc, page_id, overlay)?;
            tracing::debug!("Appended overlay content to page {}", index);
        }
        Ok(())
    }
}

fn add_font_resources(
    doc: &mut Document,
    page_id: ObjectId,
    fonts: &BTreeMap<String, ObjectId>,
) -> Result<(), WriterError> {
    let mut resources = effective_resources(doc, page_id);
    let mut font_dict = resources
        .get(b"Font")
        .ok()
        .and_then(|obj| owned_dict(doc, obj))
        .unwrap_or_else(Dictionary::new);
    for (name, id) in fonts {
        font_dict.set(name.clone(), Object::Reference(*id));
    }
    resources.set("Font", Object::Dictionary(font_dict));

    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| WriterError::Operation(e.to_string()))?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Wrap the page's existing content in `q`/`Q`, then append `overlay` after it
fn append_isolated_content(
    doc: &mut Document,
    page_id: ObjectId,
    overlay: Vec<u8>,
) -> Result<(), WriterError> {
    let existing = match doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| WriterError::Operation(e.to_string()))?
        .get(b"Contents")
    {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(arr)) => arr.clone(),
        _ => Vec::new(),
    };

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    // Leading newline: some readers join streams without a separator.
    let mut body = b"\nQ\n".to_vec();
    body.extend(overlay);
    let close_id = doc.add_object(Stream::new(Dictionary::new(), body));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(close_id));

    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| WriterError::Operation(e.to_string()))?
        .set("Contents", Object::Array(contents));
    Ok(())
}

impl DocumentWriter for LopdfWriter {
    type Font = EmbeddedFont;

    fn load(bytes: &[u8]) -> Result<Self, WriterError> {
        let doc = Document::load_mem(bytes).map_err(|e| WriterError::Parse(e.to_string()))?;
        let pages = doc.get_pages().into_values().collect();
        Ok(Self {
            doc,
            pages,
            pending: BTreeMap::new(),
        })
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize, WriterError> {
        let page_id = self.page_id(index)?;
        page_box(&self.doc, page_id)
            .map(|b| b.size())
            .map_err(WriterError::Operation)
    }

    fn embed_standard_font(&mut self, font: StandardFont) -> Result<EmbeddedFont, WriterError> {
        let mut dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
        };
        if font.uses_win_ansi() {
            dict.set("Encoding", "WinAnsiEncoding");
        }

        let id = self.doc.add_object(dict);
        let resource_name = self.unused_font_name();
        tracing::debug!("Embedded {} as /{}", font.base_font(), resource_name);
        Ok(EmbeddedFont {
            id,
            resource_name,
            font,
        })
    }

    fn measure_text_width(&self, font: &EmbeddedFont, text: &str, size: f64) -> f64 {
        StandardFontMetrics::shared(font.font).text_width(text, size)
    }

    fn draw_text(
        &mut self,
        page: usize,
        text: &str,
        at: PdfPoint,
        size: f64,
        font: &EmbeddedFont,
        color: Rgb,
    ) -> Result<(), WriterError> {
        let page_id = self.page_id(page)?;
        let origin = page_box(&self.doc, page_id).map_err(WriterError::Operation)?;

        let draws = self.pending.entry(page).or_default();
        draws
            .fonts
            .insert(font.resource_name.clone(), font.id);
        draws.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(font.resource_name.as_bytes().to_vec()),
                    Object::Real(size as f32),
                ],
            ),
            Operation::new(
                "rg",
                vec![
                    Object::Real(color.r as f32),
                    Object::Real(color.g as f32),
                    Object::Real(color.b as f32),
                ],
            ),
            Operation::new(
                "Td",
                vec![
                    Object::Real((origin.llx + at.x) as f32),
                    Object::Real((origin.lly + at.y) as f32),
                ],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
        Ok(())
    }

    fn save(mut self) -> Result<Vec<u8>, WriterError> {
        self.flush()?;
        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| WriterError::Operation(e.to_string()))?;
        Ok(output)
    }
}
