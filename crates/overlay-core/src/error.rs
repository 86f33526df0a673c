use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Invalid upload: {0}")]
    Validation(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Failed to load PDF: {0}")]
    Load(String),

    #[error("Failed to render page {page}: {reason}")]
    PageRender { page: usize, reason: String },

    #[error("Failed to read saved overlays: {0}")]
    PersistenceRead(String),

    #[error("Failed to save overlays: {0}")]
    PersistenceWrite(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("No document is open")]
    NoDocument,

    #[error("Page {0} is not available")]
    PageUnavailable(usize),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl OverlayError {
    /// The one-line notification shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            OverlayError::Validation(_) => "Please choose a PDF file.".to_string(),
            OverlayError::Upload(_) => "The file could not be uploaded. Try again.".to_string(),
            OverlayError::Load(_) => "This PDF could not be opened.".to_string(),
            OverlayError::PageRender { page, .. } => {
                format!("Page {} could not be displayed.", page + 1)
            }
            // Saved overlays that cannot be read are treated as absent.
            OverlayError::PersistenceRead(_) => String::new(),
            OverlayError::PersistenceWrite(_) => "Your changes could not be saved.".to_string(),
            OverlayError::Export(_) => "Export failed. No file was produced.".to_string(),
            OverlayError::NoDocument => "Open a PDF first.".to_string(),
            OverlayError::PageUnavailable(page) => {
                format!("Page {} is not ready yet.", page + 1)
            }
            OverlayError::Config(msg) => format!("Configuration error: {}", msg),
        }
    }
}

/// Failure reported by a page renderer collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Document could not be opened: {0}")]
    Open(String),

    #[error("Page {0} not found")]
    PageNotFound(usize),

    #[error("Page {page} failed: {reason}")]
    Page { page: usize, reason: String },
}

/// Failure reported by a document writer collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WriterError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Failed to embed font {0}")]
    Font(String),

    #[error("Page {0} not found")]
    PageNotFound(usize),

    #[error("PDF operation failed: {0}")]
    Operation(String),
}

/// Failure reported by a key-value store collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl From<WriterError> for OverlayError {
    fn from(err: WriterError) -> Self {
        OverlayError::Export(err.to_string())
    }
}
