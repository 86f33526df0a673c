//! Page rendering pipeline
//!
//! Opens a document, discovers every page's native size, then paints each
//! page into a surface of exactly that size. Each load takes a fresh token;
//! after every suspension point the load checks that its token is still
//! current and quietly stops if a newer load has started. A superseded load
//! publishes nothing and changes no state.

use crate::error::{OverlayError, RenderError};
use crate::model::PageSize;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Page renderer collaborator
#[async_trait(?Send)]
pub trait PageRenderer {
    type Document;
    type Surface;

    /// Open a document. The renderer owns the buffer it is given.
    async fn load(&self, bytes: Vec<u8>) -> Result<Self::Document, RenderError>;

    fn page_count(&self, doc: &Self::Document) -> usize;

    /// Native size in points of page `index` (0-based)
    async fn native_size(&self, doc: &Self::Document, index: usize)
        -> Result<PageSize, RenderError>;

    /// A blank surface of `size` pixels at scale 1
    fn create_surface(&self, size: PageSize) -> Self::Surface;

    async fn render_into(
        &self,
        doc: &Self::Document,
        index: usize,
        surface: &mut Self::Surface,
    ) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading { token: u64 },
    Ready { token: u64, page_count: usize },
    Failed { token: u64, reason: String },
}

/// Outcome of painting one page
#[derive(Debug)]
pub enum RenderedPage<S> {
    Painted(S),
    Failed(String),
}

impl<S> RenderedPage<S> {
    pub fn surface(&self) -> Option<&S> {
        match self {
            RenderedPage::Painted(surface) => Some(surface),
            RenderedPage::Failed(_) => None,
        }
    }
}

/// Everything a successful load publishes
#[derive(Debug)]
pub struct RenderedDocument<S> {
    pub token: u64,
    pub page_sizes: Vec<PageSize>,
    pub pages: Vec<RenderedPage<S>>,
}

impl<S> RenderedDocument<S> {
    pub fn page_count(&self) -> usize {
        self.page_sizes.len()
    }

    /// Indices of pages that failed to paint
    pub fn failed_pages(&self) -> Vec<usize> {
        self.pages
            .iter()
            .enumerate()
            .filter_map(|(i, page)| matches!(page, RenderedPage::Failed(_)).then_some(i))
            .collect()
    }
}

#[derive(Debug)]
pub enum LoadOutcome<S> {
    Ready(RenderedDocument<S>),
    /// A newer load started before this one finished
    Superseded,
}

pub struct RenderPipeline<R: PageRenderer> {
    renderer: R,
    current: AtomicU64,
    state: Mutex<LoadState>,
}

impl<R: PageRenderer> RenderPipeline<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            current: AtomicU64::new(0),
            state: Mutex::new(LoadState::Idle),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn state(&self) -> LoadState {
        self.lock_state().clone()
    }

    /// Token of the most recently started load
    pub fn current_token(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    fn is_current(&self, token: u64) -> bool {
        self.current_token() == token
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, LoadState> {
        // A poisoned lock only means a panic mid-assignment; the enum is still whole.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn transition(&self, token: u64, next: LoadState) -> bool {
        if !self.is_current(token) {
            return false;
        }
        *self.lock_state() = next;
        true
    }

    /// Load and paint a document. Any load already in flight is superseded.
    ///
    /// # Errors
    /// Returns [`OverlayError::Load`] if the document cannot be opened or a
    /// page size cannot be determined. Individual page paint failures are
    /// recorded in the result instead.
    pub async fn load(&self, bytes: Vec<u8>) -> Result<LoadOutcome<R::Surface>, OverlayError> {
        let token = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.transition(token, LoadState::Loading { token });
        tracing::debug!("Load {} started ({} bytes)", token, bytes.len());

        let doc = match self.renderer.load(bytes).await {
            Ok(doc) => doc,
            Err(e) => return self.fail(token, e),
        };
        if !self.is_current(token) {
            return Ok(self.superseded(token));
        }

        let page_count = self.renderer.page_count(&doc);
        let mut page_sizes = Vec::with_capacity(page_count);
        for index in 0..page_count {
            let size = match self.renderer.native_size(&doc, index).await {
                Ok(size) if !size.is_degenerate() => size,
                Ok(size) => {
                    let reason = format!(
                        "page {} has degenerate size {}x{}",
                        index, size.width, size.height
                    );
                    return self.fail(token, RenderError::Page { page: index, reason });
                }
                Err(e) => return self.fail(token, e),
            };
            if !self.is_current(token) {
                return Ok(self.superseded(token));
            }
            page_sizes.push(size);
        }

        let mut pages = Vec::with_capacity(page_count);
        for (index, size) in page_sizes.iter().enumerate() {
            let mut surface = self.renderer.create_surface(*size);
            let result = self.renderer.render_into(&doc, index, &mut surface).await;
            if !self.is_current(token) {
                return Ok(self.superseded(token));
            }
            match result {
                Ok(()) => {
                    tracing::debug!("Load {}: painted page {}", token, index);
                    pages.push(RenderedPage::Painted(surface));
                }
                Err(e) => {
                    let err = OverlayError::PageRender {
                        page: index,
                        reason: e.to_string(),
                    };
                    tracing::warn!("Load {}: {}", token, err);
                    pages.push(RenderedPage::Failed(e.to_string()));
                }
            }
        }

        if !self.transition(token, LoadState::Ready { token, page_count }) {
            return Ok(self.superseded(token));
        }
        tracing::info!("Load {} ready with {} pages", token, page_count);

        Ok(LoadOutcome::Ready(RenderedDocument {
            token,
            page_sizes,
            pages,
        }))
    }

    fn fail(
        &self,
        token: u64,
        err: RenderError,
    ) -> Result<LoadOutcome<R::Surface>, OverlayError> {
        let reason = err.to_string();
        if !self.transition(
            token,
            LoadState::Failed {
                token,
                reason: reason.clone(),
            },
        ) {
            return Ok(self.superseded(token));
        }
        tracing::warn!("Load {} failed: {}", token, reason);
        Err(OverlayError::Load(reason))
    }

    fn superseded(&self, token: u64) -> LoadOutcome<R::Surface> {
        tracing::debug!(
            "Load {} superseded by load {}, discarding results",
            token,
            self.current_token()
        );
        LoadOutcome::Superseded
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use pretty_assertions::assert_eq;

    fn ready(outcome: LoadOutcome<FakeSurface>) -> RenderedDocument<FakeSurface> {
        match outcome {
            LoadOutcome::Ready(doc) => doc,
            LoadOutcome::Superseded => panic!("load was superseded"),
        }
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let pipeline = RenderPipeline::new(FakeRenderer::default());
        assert_eq!(pipeline.state(), LoadState::Idle);
    }

    #[tokio::test]
    async fn test_surfaces_match_native_sizes() {
        let pipeline = RenderPipeline::new(FakeRenderer::default());
        let bytes = fake_pdf(&[(612.0, 792.0), (842.0, 595.0)]);

        let doc = ready(pipeline.load(bytes).await.unwrap());

        assert_eq!(
            doc.page_sizes,
            vec![PageSize::new(612.0, 792.0), PageSize::new(842.0, 595.0)]
        );
        for (index, page) in doc.pages.iter().enumerate() {
            let surface = page.surface().unwrap();
            assert_eq!(surface.size, doc.page_sizes[index]);
            assert_eq!(surface.painted_page, Some(index));
        }
        assert_eq!(
            pipeline.state(),
            LoadState::Ready {
                token: 1,
                page_count: 2
            }
        );
    }

    #[tokio::test]
    async fn test_one_bad_page_does_not_fail_document() {
        let renderer = FakeRenderer {
            broken_pages: [1].into_iter().collect(),
            ..FakeRenderer::default()
        };
        let pipeline = RenderPipeline::new(renderer);
        let bytes = fake_pdf(&[(612.0, 792.0), (612.0, 792.0), (612.0, 792.0)]);

        let doc = ready(pipeline.load(bytes).await.unwrap());

        assert_eq!(doc.failed_pages(), vec![1]);
        assert!(doc.pages[0].surface().is_some());
        assert!(doc.pages[2].surface().is_some());
        assert!(matches!(pipeline.state(), LoadState::Ready { .. }));
    }

    #[tokio::test]
    async fn test_unreadable_document_fails() {
        let pipeline = RenderPipeline::new(FakeRenderer::default());

        let err = pipeline.load(b"garbage".to_vec()).await.unwrap_err();

        assert!(matches!(err, OverlayError::Load(_)));
        assert!(matches!(pipeline.state(), LoadState::Failed { token: 1, .. }));
    }

    #[tokio::test]
    async fn test_missing_page_size_fails_load() {
        let renderer = FakeRenderer {
            broken_sizes: [0].into_iter().collect(),
            ..FakeRenderer::default()
        };
        let pipeline = RenderPipeline::new(renderer);

        let result = pipeline.load(fake_pdf(&[(612.0, 792.0)])).await;

        assert!(matches!(result, Err(OverlayError::Load(_))));
    }

    #[tokio::test]
    async fn test_degenerate_page_size_fails_load() {
        let pipeline = RenderPipeline::new(FakeRenderer::default());
        let result = pipeline.load(fake_pdf(&[(612.0, 0.0)])).await;
        assert!(matches!(result, Err(OverlayError::Load(_))));
    }

    #[tokio::test]
    async fn test_newer_load_supersedes_older() {
        let pipeline = RenderPipeline::new(FakeRenderer::default());
        let first = fake_pdf(&[(100.0, 100.0), (100.0, 100.0), (100.0, 100.0)]);
        let second = fake_pdf(&[(200.0, 300.0)]);

        let (a, b) = tokio::join!(pipeline.load(first), pipeline.load(second));

        assert!(matches!(a.unwrap(), LoadOutcome::Superseded));
        let doc = ready(b.unwrap());
        assert_eq!(doc.token, 2);
        assert_eq!(doc.page_sizes, vec![PageSize::new(200.0, 300.0)]);
        assert_eq!(
            pipeline.state(),
            LoadState::Ready {
                token: 2,
                page_count: 1
            }
        );
    }

    #[tokio::test]
    async fn test_superseded_failure_does_not_mark_failed() {
        let pipeline = RenderPipeline::new(FakeRenderer::default());

        let (a, b) = tokio::join!(
            pipeline.load(b"garbage".to_vec()),
            pipeline.load(fake_pdf(&[(612.0, 792.0)]))
        );

        assert!(matches!(a.unwrap(), LoadOutcome::Superseded));
        assert!(matches!(b.unwrap(), LoadOutcome::Ready(_)));
        assert!(matches!(pipeline.state(), LoadState::Ready { token: 2, .. }));
    }

    #[tokio::test]
    async fn test_sequential_loads_both_complete() {
        let pipeline = RenderPipeline::new(FakeRenderer::default());

        let first = ready(pipeline.load(fake_pdf(&[(10.0, 10.0)])).await.unwrap());
        let second = ready(pipeline.load(fake_pdf(&[(20.0, 20.0)])).await.unwrap());

        assert_eq!(first.token, 1);
        assert_eq!(second.token, 2);
    }
}
