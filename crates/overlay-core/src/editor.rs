//! Editing session: one open document, its rendered pages and its overlays.
//!
//! Loading is split in two. [`Editor::load`] borrows the editor shared and may
//! race other loads; only the newest survives. [`Editor::commit`] needs
//! `&mut self` to publish the result, so a document switch can never overlap
//! an [`ExportJob`], which owns copies of everything it reads.

use crate::config::EditorConfig;
use crate::controller::OverlayController;
use crate::error::OverlayError;
use crate::export::ExportJob;
use crate::model::PageSize;
use crate::persistence::{DocumentKey, KeyValueStore};
use crate::pipeline::{LoadOutcome, LoadState, PageRenderer, RenderPipeline, RenderedPage};
use crate::upload::{validate_upload, BlobStore};

/// A finished load waiting to be published
pub struct PendingDocument<S> {
    url: String,
    pristine: Vec<u8>,
    outcome: LoadOutcome<S>,
}

struct OpenDocument<S> {
    url: String,
    pristine: Vec<u8>,
    pages: Vec<RenderedPage<S>>,
}

pub struct Editor<R: PageRenderer, K: KeyValueStore> {
    pipeline: RenderPipeline<R>,
    controller: OverlayController<K>,
    current: Option<OpenDocument<R::Surface>>,
}

impl<R: PageRenderer, K: KeyValueStore> Editor<R, K> {
    /// # Errors
    /// Returns [`OverlayError::Config`] if `config` does not validate
    pub fn new(renderer: R, persistence: K, config: EditorConfig) -> Result<Self, OverlayError> {
        Ok(Self {
            pipeline: RenderPipeline::new(renderer),
            controller: OverlayController::new(config, persistence)?,
            current: None,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        self.controller.config()
    }

    pub fn load_state(&self) -> LoadState {
        self.pipeline.state()
    }

    pub fn url(&self) -> Option<&str> {
        self.current.as_ref().map(|doc| doc.url.as_str())
    }

    pub fn page_sizes(&self) -> &[PageSize] {
        self.controller.page_sizes()
    }

    pub fn pages(&self) -> &[RenderedPage<R::Surface>] {
        self.current
            .as_ref()
            .map(|doc| doc.pages.as_slice())
            .unwrap_or(&[])
    }

    pub fn controller(&self) -> &OverlayController<K> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut OverlayController<K> {
        &mut self.controller
    }

    /// Run the rendering pipeline over `bytes`.
    ///
    /// The renderer gets its own buffer; the editor keeps a separate pristine
    /// copy for export.
    pub async fn load(
        &self,
        url: impl Into<String>,
        bytes: &[u8],
    ) -> Result<PendingDocument<R::Surface>, OverlayError> {
        let url = url.into();
        tracing::info!("Opening {}", url);
        let outcome = self.pipeline.load(bytes.to_vec()).await?;
        Ok(PendingDocument {
            url,
            pristine: bytes.to_vec(),
            outcome,
        })
    }

    /// Publish a finished load. Returns `false` if it was superseded, in
    /// which case nothing changes.
    pub fn commit(&mut self, pending: PendingDocument<R::Surface>) -> bool {
        let LoadOutcome::Ready(rendered) = pending.outcome else {
            return false;
        };
        if rendered.token != self.pipeline.current_token() {
            tracing::debug!("Discarding stale load {}", rendered.token);
            return false;
        }

        for index in rendered.failed_pages() {
            tracing::warn!("{}: page {} is shown blank", pending.url, index);
        }

        let key = DocumentKey::from_url(&self.config().storage_namespace, &pending.url);
        self.controller.switch_document(key, rendered.page_sizes);
        self.current = Some(OpenDocument {
            url: pending.url,
            pristine: pending.pristine,
            pages: rendered.pages,
        });
        true
    }

    /// Load and publish in one step.
    ///
    /// # Errors
    /// Returns [`OverlayError::Load`] if the document cannot be opened; the
    /// previously open document, if any, stays open.
    pub async fn open(&mut self, url: impl Into<String>, bytes: &[u8]) -> Result<bool, OverlayError> {
        let pending = self.load(url, bytes).await?;
        Ok(self.commit(pending))
    }

    /// Validate and store an upload, then open it from its stored URL
    pub async fn upload_and_open<B: BlobStore>(
        &mut self,
        blobs: &mut B,
        name: &str,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<bool, OverlayError> {
        validate_upload(mime_type, bytes)?;
        let uploaded = blobs.upload(name, bytes, mime_type)?;
        self.open(uploaded.url, bytes).await
    }

    /// Detach everything an export needs from the live session
    pub fn prepare_export(&self) -> Result<ExportJob, OverlayError> {
        let doc = self.current.as_ref().ok_or(OverlayError::NoDocument)?;
        ExportJob::new(
            doc.url.clone(),
            doc.pristine.clone(),
            self.controller.snapshot(),
            self.config(),
        )
    }
}
