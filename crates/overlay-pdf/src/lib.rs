//! lopdf-backed renderer and writer for `overlay-core`

pub mod page_box;
pub mod renderer;
pub mod writer;

pub use page_box::{page_box, PageBox};
pub use renderer::{LoadedPdf, LopdfRenderer, PageSurface};
pub use writer::{EmbeddedFont, LopdfWriter};

/// Editor wired to the lopdf renderer
pub type PdfEditor<K> = overlay_core::Editor<LopdfRenderer, K>;
