//! Page renderer over lopdf
//!
//! "Painting" decodes a page's content streams into a display list sized to
//! the page's native points. That is enough to drive the editing pipeline and
//! to inspect what a page draws, without a rasterizer.

use crate::page_box::page_box;
use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use overlay_core::{PageRenderer, PageSize, RenderError};

/// A parsed document and its pages in order
#[derive(Debug)]
pub struct LoadedPdf {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl LoadedPdf {
    fn page_id(&self, index: usize) -> Result<ObjectId, RenderError> {
        self.pages
            .get(index)
            .copied()
            .ok_or(RenderError::PageNotFound(index))
    }
}

/// Display list for one page
#[derive(Debug, Clone)]
pub struct PageSurface {
    size: PageSize,
    operations: Vec<Operation>,
}

impl PageSurface {
    pub fn size(&self) -> PageSize {
        self.size
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn is_blank(&self) -> bool {
        self.operations.is_empty()
    }

    /// Strings shown by `Tj`, `'`, `"` and `TJ`, one entry per operator
    pub fn text_runs(&self) -> Vec<String> {
        self.operations
            .iter()
            .filter_map(|op| match op.operator.as_str() {
                "Tj" | "'" => op.operands.first().and_then(string_bytes),
                "\"" => op.operands.get(2).and_then(string_bytes),
                "TJ" => match op.operands.first() {
                    Some(Object::Array(parts)) => {
                        Some(parts.iter().filter_map(string_bytes).flatten().collect())
                    }
                    _ => None,
                },
                _ => None,
            })
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .collect()
    }
}

fn string_bytes(obj: &Object) -> Option<Vec<u8>> {
    match obj {
        Object::String(bytes, _) => Some(bytes.clone()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfRenderer;

impl LopdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl PageRenderer for LopdfRenderer {
    type Document = LoadedPdf;
    type Surface = PageSurface;

    async fn load(&self, bytes: Vec<u8>) -> Result<LoadedPdf, RenderError> {
        let doc = Document::load_mem(&bytes).map_err(|e| RenderError::Open(e.to_string()))?;
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        tracing::debug!("Parsed PDF {} with {} pages", doc.version, pages.len());
        Ok(LoadedPdf { doc, pages })
    }

    fn page_count(&self, doc: &LoadedPdf) -> usize {
        doc.pages.len()
    }

    async fn native_size(&self, doc: &LoadedPdf, index: usize) -> Result<PageSize, RenderError> {
        let page_id = doc.page_id(index)?;
        page_box(&doc.doc, page_id)
            .map(|b| b.size())
            .map_err(|reason| RenderError::Page { page: index, reason })
    }

    fn create_surface(&self, size: PageSize) -> PageSurface {
        PageSurface {
            size,
            operations: Vec::new(),
        }
    }

    async fn render_into(
        &self,
        doc: &LoadedPdf,
        index: usize,
        surface: &mut PageSurface,
    ) -> Result<(), RenderError> {
        let page_id = doc.page_id(index)?;
        let page_error = |e: lopdf::Error| RenderError::Page {
            page: index,
            reason: e.to_string(),
        };

        let bytes = doc.doc.get_page_content(page_id).map_err(page_error)?;
        let content = Content::decode(&bytes).map_err(page_error)?;
        surface.operations.extend(content.operations);
        Ok(())
    }
}
