use async_trait::async_trait;
use bytes::Bytes;
use folio_core::{Artifact, Settings};
use lopdf::{dictionary, Document, Object, ObjectId};

use super::{inherited_attribute, load_document, save_document, type_name};
use super::{INHERITABLE_PAGE_KEYS, PDF_MIME_TYPE};
use crate::traits::{CombineTransform, TransformError, TransformInput};

pub const MERGED_PDF_NAME: &str = "merged.pdf";

/// Concatenates every page of every source document, in source order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfMergeTransform;

impl PdfMergeTransform {
    pub fn new() -> Self {
        Self
    }

    /// Merge parsed documents into one. Pages keep their content; inherited
    /// attributes are copied onto each page because the source page trees
    /// are replaced by a single flat one.
    pub fn merge_documents(documents: Vec<Document>) -> Result<Document, TransformError> {
        let mut merged = Document::with_version("1.5");
        let mut next_id = 1;
        let mut pages: Vec<(ObjectId, Object)> = Vec::new();

        for mut doc in documents {
            doc.renumber_objects_with(next_id);
            next_id = doc.max_id + 1;

            for page_id in doc.get_pages().into_values() {
                let mut page = doc
                    .get_object(page_id)
                    .and_then(Object::as_dict)
                    .map_err(|e| TransformError::Decode(format!("page {:?}: {}", page_id, e)))?
                    .clone();
                for key in INHERITABLE_PAGE_KEYS {
                    if !page.has(key) {
                        if let Some(value) = inherited_attribute(&doc, page_id, key) {
                            page.set(key, value);
                        }
                    }
                }
                pages.push((page_id, Object::Dictionary(page)));
            }

            for (id, object) in doc.objects {
                match type_name(&object) {
                    Some(b"Catalog") | Some(b"Pages") | Some(b"Page") => {}
                    Some(b"Outlines") | Some(b"Outline") => {}
                    _ => {
                        merged.objects.insert(id, object);
                    }
                }
            }
        }

        if pages.is_empty() {
            return Err(TransformError::InvalidSettings(
                "No pages to merge".to_string(),
            ));
        }

        merged.max_id = next_id;
        let pages_id = merged.new_object_id();
        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for (page_id, mut page) in pages {
            if let Object::Dictionary(ref mut dict) = page {
                dict.set("Parent", pages_id);
            }
            merged.objects.insert(page_id, page);
            kids.push(page_id.into());
        }

        merged.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
            }),
        );
        let catalog_id = merged.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        merged.trailer.set("Root", catalog_id);

        Ok(merged)
    }
}

#[async_trait]
impl CombineTransform for PdfMergeTransform {
    /// Raw bytes of a source that parsed successfully
    type Part = Bytes;

    fn name(&self) -> &'static str {
        "merge-pdf"
    }

    async fn prepare(
        &self,
        input: &TransformInput,
        _settings: &Settings,
    ) -> Result<Bytes, TransformError> {
        let data = input.bytes.clone();
        let name = input.name.clone();
        tokio::task::spawn_blocking(move || {
            let doc = load_document(&data, &name)?;
            if doc.get_pages().is_empty() {
                return Err(TransformError::Decode(format!("{} has no pages", name)));
            }
            Ok(data)
        })
        .await?
    }

    async fn combine(
        &self,
        parts: Vec<Bytes>,
        _settings: &Settings,
    ) -> Result<Artifact, TransformError> {
        let source_count = parts.len();
        let bytes = tokio::task::spawn_blocking(move || {
            let documents = parts
                .iter()
                .enumerate()
                .map(|(i, data)| load_document(data, &format!("source {}", i + 1)))
                .collect::<Result<Vec<_>, _>>()?;
            let mut merged = Self::merge_documents(documents)?;
            save_document(&mut merged)
        })
        .await??;

        tracing::debug!(
            sources = source_count,
            size_bytes = bytes.len(),
            "Merged PDF documents"
        );
        Ok(Artifact::new(MERGED_PDF_NAME, PDF_MIME_TYPE, bytes))
    }
}
