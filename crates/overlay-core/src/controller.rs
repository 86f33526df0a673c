//! Interaction controller
//!
//! The create/update/delete surface the UI talks to. Drag results arrive in
//! surface pixels and are normalized against the owning page's size. Every
//! mutation is written through to persistence under the open document's key.

use crate::config::EditorConfig;
use crate::coords::from_surface;
use crate::error::OverlayError;
use crate::metrics::{autosize_box, StandardFont, StandardFontMetrics, TextMeasurer};
use crate::model::{
    OverlayCollection, OverlayId, OverlayItem, OverlayPatch, PageSize, SurfacePoint, SurfaceRect,
};
use crate::persistence::{load_overlays, save_overlays, DocumentKey, KeyValueStore};
use crate::store::OverlayStore;

/// A user edit to one overlay field. Position is deliberately absent: it only
/// changes through [`OverlayController::on_drag_stop`].
#[derive(Debug, Clone, PartialEq)]
pub enum EditField {
    Text(String),
    Color(String),
    FontSize(f64),
}

/// Overlay state for the document currently open
#[derive(Debug)]
struct ActiveDocument {
    key: DocumentKey,
    page_sizes: Vec<PageSize>,
    store: OverlayStore,
}

pub struct OverlayController<K: KeyValueStore> {
    config: EditorConfig,
    persistence: K,
    font: StandardFont,
    measurer: &'static StandardFontMetrics,
    active: Option<ActiveDocument>,
}

impl<K: KeyValueStore> OverlayController<K> {
    /// # Errors
    /// Returns [`OverlayError::Config`] if `config` does not validate
    pub fn new(config: EditorConfig, persistence: K) -> Result<Self, OverlayError> {
        config.validate()?;
        let font = config.font()?;
        Ok(Self {
            config,
            persistence,
            font,
            measurer: StandardFontMetrics::shared(font),
            active: None,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Font used to measure and export overlays
    pub fn font(&self) -> StandardFont {
        self.font
    }

    pub fn persistence(&self) -> &K {
        &self.persistence
    }

    pub fn key(&self) -> Option<&DocumentKey> {
        self.active.as_ref().map(|doc| &doc.key)
    }

    pub fn page_sizes(&self) -> &[PageSize] {
        self.active
            .as_ref()
            .map(|doc| doc.page_sizes.as_slice())
            .unwrap_or(&[])
    }

    /// Make `key` the active document and seed overlays from persistence
    pub fn switch_document(&mut self, key: DocumentKey, page_sizes: Vec<PageSize>) {
        let saved = load_overlays(&self.persistence, &key);
        tracing::info!(
            "Switched to {} ({} pages, {} saved overlays)",
            key,
            page_sizes.len(),
            saved.values().map(Vec::len).sum::<usize>()
        );

        let mut store = OverlayStore::new();
        store.restore(saved);
        self.active = Some(ActiveDocument {
            key,
            page_sizes,
            store,
        });
    }

    fn active_mut(&mut self) -> Result<&mut ActiveDocument, OverlayError> {
        self.active.as_mut().ok_or(OverlayError::NoDocument)
    }

    fn page_size(&self, page: usize) -> Result<PageSize, OverlayError> {
        let doc = self.active.as_ref().ok_or(OverlayError::NoDocument)?;
        doc.page_sizes
            .get(page)
            .copied()
            .ok_or(OverlayError::PageUnavailable(page))
    }

    /// Add a default overlay at the center of `page`
    pub fn add_text_overlay(&mut self, page: usize) -> Result<OverlayId, OverlayError> {
        let size = self.page_size(page)?;
        let item = OverlayItem::new(
            self.config.default_text.clone(),
            0.5,
            0.5,
            self.config.default_font_size(size.width),
            self.config.default_color.clone(),
        );
        let id = item.id.clone();

        self.active_mut()?.store.add(page, item);
        tracing::debug!("Added overlay {} on page {}", id, page);
        self.persist();
        Ok(id)
    }

    /// Commit the end of a drag. `position` is the overlay's new top-left in surface pixels.
    pub fn on_drag_stop(
        &mut self,
        page: usize,
        id: &OverlayId,
        position: SurfacePoint,
    ) -> Result<(), OverlayError> {
        let size = self.page_size(page)?;
        let patch = OverlayPatch::position(from_surface(position, size));

        if self.active_mut()?.store.update(page, id, &patch) {
            self.persist();
        }
        Ok(())
    }

    pub fn on_edit_field(
        &mut self,
        page: usize,
        id: &OverlayId,
        field: EditField,
    ) -> Result<(), OverlayError> {
        let patch = match field {
            EditField::Text(text) => OverlayPatch::text(text),
            EditField::Color(color) => OverlayPatch::color(color),
            EditField::FontSize(size) if !size.is_finite() => {
                tracing::warn!("Ignoring font size {} for overlay {}", size, id);
                return Ok(());
            }
            EditField::FontSize(size) => OverlayPatch::font_size(self.config.clamp_font_size(size)),
        };

        if self.active_mut()?.store.update(page, id, &patch) {
            self.persist();
        }
        Ok(())
    }

    pub fn remove_text_overlay(&mut self, page: usize, id: &OverlayId) -> Result<(), OverlayError> {
        if self.active_mut()?.store.remove(page, id) {
            tracing::debug!("Removed overlay {} from page {}", id, page);
            self.persist();
        }
        Ok(())
    }

    pub fn overlays(&self, page: usize) -> &[OverlayItem] {
        self.active
            .as_ref()
            .map(|doc| doc.store.page(page))
            .unwrap_or(&[])
    }

    pub fn overlay(&self, page: usize, id: &OverlayId) -> Option<&OverlayItem> {
        self.active.as_ref()?.store.get(page, id)
    }

    /// Surface-space box of an overlay, sized to its text
    pub fn overlay_bounds(&self, page: usize, id: &OverlayId) -> Option<SurfaceRect> {
        let size = self.page_size(page).ok()?;
        let item = self.overlay(page, id)?;
        Some(autosize_box(
            self.measurer as &dyn TextMeasurer,
            &item.text,
            item.font_size,
            item.position(),
            size,
        ))
    }

    pub fn snapshot(&self) -> OverlayCollection {
        self.active
            .as_ref()
            .map(|doc| doc.store.snapshot())
            .unwrap_or_default()
    }

    /// Write the active collection through. Failures are logged, never surfaced:
    /// editing continues with in-memory state.
    fn persist(&mut self) {
        let Some(doc) = self.active.as_ref() else {
            return;
        };
        let snapshot = doc.store.snapshot();
        if let Err(e) = save_overlays(&mut self.persistence, &doc.key, &snapshot) {
            tracing::warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryStore, DEFAULT_NAMESPACE};
    use pretty_assertions::assert_eq;

    const URL: &str = "https://cdn.example.com/f/three-pages.pdf";

    fn three_pages() -> Vec<PageSize> {
        vec![
            PageSize::new(595.0, 842.0),
            PageSize::new(800.0, 600.0),
            PageSize::new(612.0, 792.0),
        ]
    }

    fn controller() -> OverlayController<MemoryStore> {
        let mut controller = OverlayController::new(EditorConfig::default(), MemoryStore::new())
            .unwrap();
        controller.switch_document(DocumentKey::from_url(DEFAULT_NAMESPACE, URL), three_pages());
        controller
    }

    #[test]
    fn test_requires_open_document() {
        let mut controller = OverlayController::new(EditorConfig::default(), MemoryStore::new())
            .unwrap();
        assert!(matches!(
            controller.add_text_overlay(0),
            Err(OverlayError::NoDocument)
        ));
        assert!(controller.overlays(0).is_empty());
    }

    #[test]
    fn test_add_uses_defaults() {
        let mut controller = controller();
        let id = controller.add_text_overlay(1).unwrap();

        let item = controller.overlay(1, &id).unwrap();
        assert_eq!(item.text, "New Text");
        assert_eq!((item.x, item.y), (0.5, 0.5));
        assert_eq!(item.font_size, 16.0); // round(800 * 0.02)
        assert_eq!(item.color, "#000000");
    }

    #[test]
    fn test_add_out_of_range_page() {
        let mut controller = controller();
        assert!(matches!(
            controller.add_text_overlay(3),
            Err(OverlayError::PageUnavailable(3))
        ));
    }

    #[test]
    fn test_drag_normalizes_against_owning_page() {
        let mut controller = controller();
        let id = controller.add_text_overlay(1).unwrap();

        controller
            .on_drag_stop(1, &id, SurfacePoint { x: 200.0, y: 450.0 })
            .unwrap();

        let item = controller.overlay(1, &id).unwrap();
        assert_eq!((item.x, item.y), (0.25, 0.75));
    }

    #[test]
    fn test_drag_to_origin_and_beyond() {
        let mut controller = controller();
        let id = controller.add_text_overlay(1).unwrap();

        controller
            .on_drag_stop(1, &id, SurfacePoint { x: 0.0, y: 0.0 })
            .unwrap();
        assert_eq!(controller.overlay(1, &id).unwrap().x, 0.0);

        controller
            .on_drag_stop(1, &id, SurfacePoint { x: -50.0, y: 9000.0 })
            .unwrap();
        let item = controller.overlay(1, &id).unwrap();
        assert_eq!((item.x, item.y), (0.0, 1.0));
    }

    #[test]
    fn test_font_size_edits_are_clamped() {
        let mut controller = controller();
        let id = controller.add_text_overlay(0).unwrap();

        controller
            .on_edit_field(0, &id, EditField::FontSize(300.0))
            .unwrap();
        assert_eq!(controller.overlay(0, &id).unwrap().font_size, 72.0);

        controller
            .on_edit_field(0, &id, EditField::FontSize(1.0))
            .unwrap();
        assert_eq!(controller.overlay(0, &id).unwrap().font_size, 8.0);
    }

    #[test]
    fn test_non_finite_font_size_keeps_saved_overlays() {
        let mut controller = controller();
        let a = controller.add_text_overlay(0).unwrap();
        controller.add_text_overlay(0).unwrap();

        controller
            .on_edit_field(0, &a, EditField::FontSize(f64::NAN))
            .unwrap();
        controller
            .on_edit_field(0, &a, EditField::FontSize(f64::INFINITY))
            .unwrap();
        assert_eq!(controller.overlay(0, &a).unwrap().font_size, 12.0);

        let key = controller.key().unwrap().clone();
        controller.switch_document(
            DocumentKey::from_url(DEFAULT_NAMESPACE, "https://cdn.example.com/other.pdf"),
            vec![PageSize::letter()],
        );
        controller.switch_document(key, three_pages());
        assert_eq!(controller.overlays(0).len(), 2);
        assert_eq!(controller.overlay(0, &a).unwrap().font_size, 12.0);
    }

    #[test]
    fn test_nan_drag_stays_on_page() {
        let mut controller = controller();
        let id = controller.add_text_overlay(1).unwrap();

        controller
            .on_drag_stop(1, &id, SurfacePoint { x: f64::NAN, y: 300.0 })
            .unwrap();

        let item = controller.overlay(1, &id).unwrap();
        assert_eq!((item.x, item.y), (0.0, 0.5));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let inverted = EditorConfig {
            default_font_min: 30.0,
            default_font_max: 10.0,
            ..EditorConfig::default()
        };
        assert!(matches!(
            OverlayController::new(inverted, MemoryStore::new()),
            Err(OverlayError::Config(_))
        ));

        let unknown_font = EditorConfig {
            font_name: "Comic Sans".to_string(),
            ..EditorConfig::default()
        };
        assert!(matches!(
            OverlayController::new(unknown_font, MemoryStore::new()),
            Err(OverlayError::Config(_))
        ));
    }

    #[test]
    fn test_font_resolved_from_config() {
        let config = EditorConfig {
            font_name: "Courier".to_string(),
            ..EditorConfig::default()
        };
        let controller = OverlayController::new(config, MemoryStore::new()).unwrap();
        assert_eq!(controller.font(), StandardFont::Courier);
    }

    #[test]
    fn test_edits_on_deleted_overlay_are_ignored() {
        let mut controller = controller();
        let id = controller.add_text_overlay(0).unwrap();
        controller.remove_text_overlay(0, &id).unwrap();

        controller
            .on_edit_field(0, &id, EditField::Text("late".to_string()))
            .unwrap();
        controller
            .on_drag_stop(0, &id, SurfacePoint { x: 1.0, y: 1.0 })
            .unwrap();
        controller.remove_text_overlay(0, &id).unwrap();

        assert!(controller.overlays(0).is_empty());
    }

    #[test]
    fn test_mutations_persist_and_restore() {
        let mut controller = controller();
        let id = controller.add_text_overlay(0).unwrap();
        controller
            .on_edit_field(0, &id, EditField::Text("Approved".to_string()))
            .unwrap();

        let store = controller.persistence().clone();
        let mut reopened = OverlayController::new(EditorConfig::default(), store).unwrap();
        reopened.switch_document(DocumentKey::from_url(DEFAULT_NAMESPACE, URL), three_pages());

        assert_eq!(reopened.overlays(0).len(), 1);
        assert_eq!(reopened.overlays(0)[0].text, "Approved");
        assert_eq!(reopened.overlays(0)[0].id, id);
        assert!(reopened.overlays(1).is_empty());
        assert!(reopened.overlays(2).is_empty());
    }

    #[test]
    fn test_switch_document_isolates_overlays() {
        let mut controller = controller();
        controller.add_text_overlay(0).unwrap();

        controller.switch_document(
            DocumentKey::from_url(DEFAULT_NAMESPACE, "https://cdn.example.com/other.pdf"),
            vec![PageSize::letter()],
        );
        assert!(controller.snapshot().is_empty());
    }

    #[test]
    fn test_overlay_bounds_grow_with_text() {
        let mut controller = controller();
        let id = controller.add_text_overlay(0).unwrap();
        let before = controller.overlay_bounds(0, &id).unwrap();

        controller
            .on_edit_field(0, &id, EditField::Text("A much longer annotation".to_string()))
            .unwrap();
        let after = controller.overlay_bounds(0, &id).unwrap();

        assert_eq!(before.x, 297.5);
        assert_eq!(before.y, 421.0);
        assert!(after.width > before.width);
    }
}
