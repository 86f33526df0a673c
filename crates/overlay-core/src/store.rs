//! In-memory overlay state for the open document
//!
//! Updates and removals for an id that is no longer present are silent
//! no-ops: an edit racing a delete from the UI is expected, not an error.

use crate::model::{OverlayCollection, OverlayId, OverlayItem, OverlayPatch};

#[derive(Debug, Clone, Default)]
pub struct OverlayStore {
    pages: OverlayCollection,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` on top of the page's existing overlays
    pub fn add(&mut self, page: usize, item: OverlayItem) {
        self.pages.entry(page).or_default().push(item);
    }

    /// Merge `patch` into the item with `id`. Returns whether an item matched.
    ///
    /// Position fields must already be clamped by the caller.
    pub fn update(&mut self, page: usize, id: &OverlayId, patch: &OverlayPatch) -> bool {
        match self
            .pages
            .get_mut(&page)
            .and_then(|items| items.iter_mut().find(|item| &item.id == id))
        {
            Some(item) => {
                item.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Drop the item with `id`. Returns whether an item matched.
    pub fn remove(&mut self, page: usize, id: &OverlayId) -> bool {
        let Some(items) = self.pages.get_mut(&page) else {
            return false;
        };

        let before = items.len();
        items.retain(|item| &item.id != id);
        let removed = items.len() != before;

        if items.is_empty() {
            self.pages.remove(&page);
        }
        removed
    }

    pub fn get(&self, page: usize, id: &OverlayId) -> Option<&OverlayItem> {
        self.pages.get(&page)?.iter().find(|item| &item.id == id)
    }

    /// Overlays on `page` in draw order
    pub fn page(&self, page: usize) -> &[OverlayItem] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> OverlayCollection {
        self.pages.clone()
    }

    /// Replace everything, e.g. after switching documents
    pub fn restore(&mut self, collection: OverlayCollection) {
        self.pages = collection;
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.pages)
    }

    pub fn from_json(json: &str) -> Result<OverlayCollection, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(text: &str) -> OverlayItem {
        OverlayItem::new(text, 0.5, 0.5, 16.0, "#000000")
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = OverlayStore::new();
        assert!(store.is_empty());
        assert!(store.page(0).is_empty());
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut store = OverlayStore::new();
        store.add(0, item("first"));
        store.add(0, item("second"));
        store.add(1, item("other page"));

        let texts: Vec<&str> = store.page(0).iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_update_by_id() {
        let mut store = OverlayStore::new();
        let overlay = item("draft");
        let id = overlay.id.clone();
        store.add(0, overlay);

        assert!(store.update(0, &id, &OverlayPatch::text("final")));
        assert_eq!(store.get(0, &id).unwrap().text, "final");
    }

    #[test]
    fn test_update_missing_id_is_noop() {
        let mut store = OverlayStore::new();
        store.add(0, item("keep"));
        let before = store.snapshot();

        assert!(!store.update(0, &OverlayId::new(), &OverlayPatch::text("x")));
        assert!(!store.update(7, &OverlayId::new(), &OverlayPatch::text("x")));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_update_wrong_page_is_noop() {
        let mut store = OverlayStore::new();
        let overlay = item("on page 0");
        let id = overlay.id.clone();
        store.add(0, overlay);

        assert!(!store.update(1, &id, &OverlayPatch::text("moved?")));
        assert_eq!(store.get(0, &id).unwrap().text, "on page 0");
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut store = OverlayStore::new();
        store.add(0, item("a"));
        assert!(!store.remove(0, &OverlayId::new()));
        assert!(!store.remove(3, &OverlayId::new()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_last_item_drops_page_entry() {
        let mut store = OverlayStore::new();
        let overlay = item("only");
        let id = overlay.id.clone();
        store.add(2, overlay);

        assert!(store.remove(2, &id));
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_restore_replaces_wholesale() {
        let mut store = OverlayStore::new();
        store.add(0, item("old"));

        let mut incoming = OverlayCollection::new();
        incoming.insert(1, vec![item("new")]);
        store.restore(incoming.clone());

        assert_eq!(store.snapshot(), incoming);
        assert!(store.page(0).is_empty());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut store = OverlayStore::new();
        store.add(0, item("persist me"));
        let json = store.to_json().unwrap();
        assert_eq!(OverlayStore::from_json(&json).unwrap(), store.snapshot());
    }
}
