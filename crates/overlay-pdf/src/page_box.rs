//! Page geometry and resources shared by the renderer and the writer
//!
//! Both sides read page size through [`page_box`], so the size a page is
//! rendered at and the size export positions against cannot disagree.

use lopdf::{Dictionary, Document, Object, ObjectId};
use overlay_core::PageSize;

/// Inheritance hops followed before giving up on a malformed page tree
const MAX_DEPTH: usize = 10;

/// A page's MediaBox in user space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl PageBox {
    pub fn letter() -> Self {
        let size = PageSize::letter();
        Self {
            llx: 0.0,
            lly: 0.0,
            urx: size.width,
            ury: size.height,
        }
    }

    pub fn size(&self) -> PageSize {
        PageSize::new(self.urx - self.llx, self.ury - self.lly)
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn parse_rect(doc: &Document, obj: &Object) -> Result<PageBox, String> {
    let arr = resolve(doc, obj)
        .and_then(|o| o.as_array().ok())
        .ok_or_else(|| "MediaBox is not an array".to_string())?;

    if arr.len() != 4 {
        return Err(format!("MediaBox has {} elements, expected 4", arr.len()));
    }

    let mut values = [0.0f64; 4];
    for (i, item) in arr.iter().enumerate() {
        values[i] = resolve(doc, item)
            .and_then(number)
            .ok_or_else(|| format!("MediaBox element {} is not a number", i))?;
    }

    // Normalize so ll is the lower-left corner whichever order the file uses.
    Ok(PageBox {
        llx: values[0].min(values[2]),
        lly: values[1].min(values[3]),
        urx: values[0].max(values[2]),
        ury: values[1].max(values[3]),
    })
}

/// MediaBox of `page_id`, inherited through the page tree.
///
/// Pages without a MediaBox anywhere up the tree default to US Letter.
pub fn page_box(doc: &Document, page_id: ObjectId) -> Result<PageBox, String> {
    let mut current = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| format!("Failed to get page object: {}", e))?;

    for _ in 0..MAX_DEPTH {
        if let Ok(media_box) = current.get(b"MediaBox") {
            return parse_rect(doc, media_box);
        }
        let parent = current
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_object(id))
            .and_then(Object::as_dict);
        match parent {
            Ok(dict) => current = dict,
            Err(_) => break,
        }
    }

    Ok(PageBox::letter())
}

/// Copy of `obj` as a dictionary, following one reference
pub(crate) fn owned_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    resolve(doc, obj)?.as_dict().ok().cloned()
}

/// Resources in effect for `page_id`, including those inherited from the page tree
pub(crate) fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = doc.get_object(page_id).and_then(Object::as_dict).ok();

    for _ in 0..MAX_DEPTH {
        let Some(dict) = current else {
            break;
        };
        if let Some(resources) = dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| owned_dict(doc, obj))
        {
            return resources;
        }
        current = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_object(id))
            .and_then(Object::as_dict)
            .ok();
    }

    Dictionary::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn doc_with(pages_box: Option<Object>, page_box_obj: Option<Object>) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        };
        if let Some(b) = page_box_obj {
            page.set("MediaBox", b);
        }
        let page_id = doc.add_object(page);

        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        };
        if let Some(b) = pages_box {
            pages.set("MediaBox", b);
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        (doc, page_id)
    }

    fn rect(values: [i64; 4]) -> Object {
        Object::Array(values.iter().map(|v| Object::Integer(*v)).collect())
    }

    #[test]
    fn test_direct_media_box() {
        let (doc, page) = doc_with(None, Some(rect([0, 0, 595, 842])));
        assert_eq!(page_box(&doc, page).unwrap().size(), PageSize::new(595.0, 842.0));
    }

    #[test]
    fn test_inherited_media_box() {
        let (doc, page) = doc_with(Some(rect([0, 0, 800, 600])), None);
        assert_eq!(page_box(&doc, page).unwrap().size(), PageSize::new(800.0, 600.0));
    }

    #[test]
    fn test_missing_media_box_is_letter() {
        let (doc, page) = doc_with(None, None);
        assert_eq!(page_box(&doc, page).unwrap(), PageBox::letter());
    }

    #[test]
    fn test_offset_and_reversed_box() {
        let (doc, page) = doc_with(None, Some(rect([100, 900, 700, 100])));
        let b = page_box(&doc, page).unwrap();
        assert_eq!((b.llx, b.lly), (100.0, 100.0));
        assert_eq!(b.size(), PageSize::new(600.0, 800.0));
    }

    #[test]
    fn test_referenced_media_box() {
        let mut doc = Document::with_version("1.7");
        let box_id = doc.add_object(rect([0, 0, 300, 400]));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => Object::Reference(box_id),
        });
        assert_eq!(page_box(&doc, page_id).unwrap().size(), PageSize::new(300.0, 400.0));
    }

    #[test]
    fn test_malformed_media_box() {
        let (doc, page) = doc_with(None, Some(Object::Array(vec![Object::Integer(0)])));
        assert!(page_box(&doc, page).unwrap_err().contains("expected 4"));
    }

    #[test]
    fn test_inherited_resources() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "Resources" => dictionary! { "ProcSet" => vec![Object::Name(b"PDF".to_vec())] },
            }),
        );

        let resources = effective_resources(&doc, page_id);
        assert!(resources.has(b"ProcSet"));
    }
}
