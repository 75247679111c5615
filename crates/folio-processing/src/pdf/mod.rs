//! PDF transforms
//!
//! Documents are read and written with `lopdf`. Rasterizing pages to pixels
//! goes through the [`PageRasterizer`] seam, since that needs a real
//! rendering engine.

pub mod image_to_pdf;
pub mod merge;
pub mod rasterizer;
pub mod rotate;
pub mod split;
pub mod to_images;

pub use image_to_pdf::{ImageToPdfTransform, PdfImagePart};
pub use merge::PdfMergeTransform;
#[cfg(feature = "pdfium")]
pub use rasterizer::PdfiumRasterizer;
pub use rasterizer::{NoRasterizer, PageRasterizer};
pub use rotate::PdfRotateTransform;
pub use split::PdfSplitTransform;
pub use to_images::PdfToImagesTransform;

use bytes::Bytes;
use lopdf::{Document, Object, ObjectId};

use crate::traits::TransformError;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Page attributes a page may inherit from its ancestors in the page tree
pub(crate) const INHERITABLE_PAGE_KEYS: [&[u8]; 4] =
    [b"MediaBox", b"Resources", b"CropBox", b"Rotate"];

/// Parse a PDF, refusing encrypted documents.
pub(crate) fn load_document(data: &[u8], name: &str) -> Result<Document, TransformError> {
    let doc = Document::load_mem(data)
        .map_err(|e| TransformError::Decode(format!("{}: {}", name, e)))?;
    if doc.is_encrypted() {
        return Err(TransformError::UnsupportedFormat(format!(
            "{} is encrypted",
            name
        )));
    }
    Ok(doc)
}

pub(crate) fn save_document(doc: &mut Document) -> Result<Bytes, TransformError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| TransformError::Encode(format!("PDF: {}", e)))?;
    Ok(Bytes::from(buffer))
}

/// Resolve an attribute on a page, walking up the `/Parent` chain when the
/// page does not carry it itself.
pub(crate) fn inherited_attribute(
    doc: &Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<Object> {
    let mut current = page_id;
    // Bounded walk guards against cyclic page trees
    for _ in 0..64 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Value of a `/Type` entry, if the object is a dictionary carrying one.
pub(crate) fn type_name(object: &Object) -> Option<&[u8]> {
    object.as_dict().ok()?.get(b"Type").ok()?.as_name().ok()
}

#[cfg(test)]
#[path = "../../tests/helpers/mod.rs"]
pub(crate) mod test_support;

#[cfg(test)]
mod tests {
    use super::test_support::pdf_with_pages;
    use super::*;

    #[test]
    fn test_load_rejects_garbage() {
        let err = load_document(b"not a pdf", "junk.pdf").unwrap_err();
        assert!(matches!(err, TransformError::Decode(_)));
    }

    #[test]
    fn test_inherited_attribute_walks_parents() {
        let doc = Document::load_mem(&pdf_with_pages("a", 1)).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();

        let media_box = inherited_attribute(&doc, page_id, b"MediaBox").unwrap();
        assert_eq!(media_box.as_array().unwrap().len(), 4);
        assert!(inherited_attribute(&doc, page_id, b"Rotate").is_none());
    }

    #[test]
    fn test_type_name() {
        let doc = Document::load_mem(&pdf_with_pages("a", 1)).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let page = doc.get_object(page_id).unwrap();
        assert_eq!(type_name(page), Some(&b"Page"[..]));
    }
}
