use async_trait::async_trait;
use folio_core::{Artifact, RecordResult, Settings};
use lopdf::Document;

use super::{load_document, save_document, PDF_MIME_TYPE};
use crate::traits::{RecordTransform, TransformError, TransformInput};

/// Splits a document into single-page documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfSplitTransform;

impl PdfSplitTransform {
    pub fn new() -> Self {
        Self
    }

    /// One document per page, in page order.
    pub fn split_document(doc: &Document) -> Result<Vec<Document>, TransformError> {
        let page_numbers: Vec<u32> = doc.get_pages().into_keys().collect();

        let mut documents = Vec::with_capacity(page_numbers.len());
        for &keep in &page_numbers {
            let mut single = doc.clone();
            let others: Vec<u32> = page_numbers.iter().copied().filter(|&n| n != keep).collect();
            single.delete_pages(&others);
            single.prune_objects();
            documents.push(single);
        }
        Ok(documents)
    }
}

#[async_trait]
impl RecordTransform for PdfSplitTransform {
    fn name(&self) -> &'static str {
        "split-pdf"
    }

    async fn transform(
        &self,
        input: &TransformInput,
        _settings: &Settings,
    ) -> Result<RecordResult, TransformError> {
        let data = input.bytes.clone();
        let name = input.name.clone();
        let base = input.pdf_base_name().to_string();

        let artifacts = tokio::task::spawn_blocking(move || {
            let doc = load_document(&data, &name)?;
            let mut artifacts = Vec::new();
            for (i, mut page_doc) in Self::split_document(&doc)?.into_iter().enumerate() {
                let bytes = save_document(&mut page_doc)?;
                artifacts.push(Artifact::new(
                    format!("{}_page_{}.pdf", base, i + 1),
                    PDF_MIME_TYPE,
                    bytes,
                ));
            }
            Ok::<_, TransformError>(artifacts)
        })
        .await??;

        tracing::debug!(record_id = %input.id, pages = artifacts.len(), "Split PDF");
        Ok(RecordResult::Multiple(artifacts))
    }
}
