use std::sync::Arc;

use async_trait::async_trait;
use folio_core::{Artifact, RecordResult, Settings};

use super::rasterizer::PageRasterizer;
use crate::compression::{EncodeFormat, ImageCompressor};
use crate::traits::{RecordTransform, TransformError, TransformInput};

/// Renders every page of a PDF to a PNG named `<base>_page_<n>.png`.
#[derive(Clone)]
pub struct PdfToImagesTransform {
    rasterizer: Arc<dyn PageRasterizer>,
    scale: f32,
}

impl PdfToImagesTransform {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, scale: f32) -> Self {
        Self { rasterizer, scale }
    }

    pub fn page_name(base: &str, page: usize) -> String {
        format!("{}_page_{}.png", base, page)
    }
}

impl std::fmt::Debug for PdfToImagesTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfToImagesTransform")
            .field("rasterizer", &self.rasterizer.name())
            .field("scale", &self.scale)
            .finish()
    }
}

#[async_trait]
impl RecordTransform for PdfToImagesTransform {
    fn name(&self) -> &'static str {
        "pdf-to-image"
    }

    async fn transform(
        &self,
        input: &TransformInput,
        _settings: &Settings,
    ) -> Result<RecordResult, TransformError> {
        let pages = self
            .rasterizer
            .rasterize(input.bytes.clone(), self.scale)
            .await?;
        tracing::debug!(
            record_id = %input.id,
            pages = pages.len(),
            rasterizer = self.rasterizer.name(),
            "Rasterized PDF"
        );

        let base = input.pdf_base_name().to_string();
        let artifacts = tokio::task::spawn_blocking(move || {
            pages
                .iter()
                .enumerate()
                .map(|(i, page)| {
                    let png = ImageCompressor::compress(page, EncodeFormat::Png, 100)?;
                    Ok(Artifact::new(
                        Self::page_name(&base, i + 1),
                        EncodeFormat::Png.to_mime_type(),
                        png,
                    ))
                })
                .collect::<Result<Vec<_>, TransformError>>()
        })
        .await??;

        Ok(RecordResult::Multiple(artifacts))
    }
}
