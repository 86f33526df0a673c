//! Text overlay editing and export for PDF documents
//!
//! Overlays live in normalized page space, are edited through
//! [`OverlayController`], persisted per document, and burned into the page
//! content by [`ExportJob`]. Rendering, writing, storage and color parsing are
//! collaborator traits; `overlay-pdf` provides lopdf-backed implementations.

pub mod color;
pub mod config;
pub mod controller;
pub mod coords;
pub mod editor;
pub mod error;
pub mod export;
pub mod metrics;
pub mod model;
pub mod persistence;
pub mod pipeline;
pub mod store;
pub mod upload;

pub use color::{resolve_color, ColorNormalizer, CssColorParser, Rgb};
pub use config::EditorConfig;
pub use controller::{EditField, OverlayController};
pub use coords::{clamp01, from_surface, to_pdf_point, to_surface};
pub use editor::{Editor, PendingDocument};
pub use error::{OverlayError, RenderError, StoreError, WriterError};
pub use export::{
    download_file_name, export_overlays, DocumentWriter, ExportJob, ExportedPdf, TextPlacement,
};
pub use metrics::{autosize_box, StandardFont, StandardFontMetrics, TextMeasurer};
pub use model::{
    NormalizedPoint, OverlayCollection, OverlayId, OverlayItem, OverlayPatch, PageSize, PdfPoint,
    SurfacePoint, SurfaceRect,
};
pub use persistence::{DirectoryStore, DocumentKey, KeyValueStore, MemoryStore};
pub use pipeline::{LoadOutcome, LoadState, PageRenderer, RenderPipeline, RenderedDocument, RenderedPage};
pub use store::OverlayStore;
pub use upload::{validate_upload, BlobStore, DirectoryBlobStore, UploadedDocument, PDF_MIME};
