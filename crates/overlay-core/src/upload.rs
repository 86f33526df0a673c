//! Upload validation and the blob store contract
//!
//! Non-PDF files are rejected here, before any store, renderer or writer sees them.

use crate::error::OverlayError;
use std::fs;
use std::path::{Path, PathBuf};

pub const PDF_MIME: &str = "application/pdf";

/// A stored document: its public URL
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedDocument {
    pub url: String,
}

pub trait BlobStore {
    /// Store `bytes` and return a fetchable URL
    fn upload(&mut self, name: &str, bytes: &[u8], mime_type: &str)
        -> Result<UploadedDocument, OverlayError>;

    /// Fetch the bytes behind a URL returned by [`BlobStore::upload`]
    fn fetch(&self, url: &str) -> Result<Vec<u8>, OverlayError>;
}

/// Reject anything that is not declared and shaped as a PDF
pub fn validate_upload(declared_mime: &str, bytes: &[u8]) -> Result<(), OverlayError> {
    let essence = declared_mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence != PDF_MIME {
        return Err(OverlayError::Validation(format!(
            "expected {}, got {:?}",
            PDF_MIME, declared_mime
        )));
    }

    if bytes.len() < 8 {
        return Err(OverlayError::Validation(
            "File too small to be a valid PDF".to_string(),
        ));
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err(OverlayError::Validation(
            "Not a valid PDF file (missing %PDF- header)".to_string(),
        ));
    }

    Ok(())
}

/// Blob store writing into a local directory and handing out `file://` URLs
#[derive(Debug, Clone)]
pub struct DirectoryBlobStore {
    root: PathBuf,
}

impl DirectoryBlobStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, OverlayError> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|e| OverlayError::Upload(e.to_string()))?;
        let root = root
            .canonicalize()
            .map_err(|e| OverlayError::Upload(e.to_string()))?;
        Ok(Self { root })
    }
}

fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf");

    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl BlobStore for DirectoryBlobStore {
    fn upload(
        &mut self,
        name: &str,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<UploadedDocument, OverlayError> {
        validate_upload(mime_type, bytes)?;

        let file_name = format!("{}-{}", uuid::Uuid::new_v4(), sanitize_file_name(name));
        let path = self.root.join(file_name);
        fs::write(&path, bytes).map_err(|e| OverlayError::Upload(e.to_string()))?;

        tracing::info!("Stored upload {} ({} bytes)", path.display(), bytes.len());
        Ok(UploadedDocument {
            url: format!("file://{}", path.display()),
        })
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, OverlayError> {
        let path = url
            .strip_prefix("file://")
            .ok_or_else(|| OverlayError::Load(format!("Unsupported URL: {}", url)))?;
        fs::read(path).map_err(|e| OverlayError::Load(e.to_string()))
    }
}
