use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;

use crate::traits::TransformError;

/// Renders the pages of a PDF to pixel surfaces.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Render every page in page order, each scaled by `scale` relative to
    /// its size in points.
    async fn rasterize(
        &self,
        pdf: Bytes,
        scale: f32,
    ) -> Result<Vec<DynamicImage>, TransformError>;
}

/// Stand-in used when no rendering engine is available; fails every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRasterizer;

#[async_trait]
impl PageRasterizer for NoRasterizer {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn rasterize(
        &self,
        _pdf: Bytes,
        _scale: f32,
    ) -> Result<Vec<DynamicImage>, TransformError> {
        Err(TransformError::Backend(
            "No PDF rasterizer available (build with the `pdfium` feature)".to_string(),
        ))
    }
}

#[cfg(feature = "pdfium")]
pub use self::pdfium::PdfiumRasterizer;

#[cfg(feature = "pdfium")]
mod pdfium {
    use std::path::PathBuf;

    use async_trait::async_trait;
    use bytes::Bytes;
    use image::DynamicImage;
    use pdfium_render::prelude::*;

    use super::PageRasterizer;
    use crate::traits::TransformError;

    /// Rasterizer backed by the pdfium library, bound at runtime.
    #[derive(Debug, Clone, Default)]
    pub struct PdfiumRasterizer {
        /// Directory holding the pdfium shared library; system lookup if unset
        library_dir: Option<PathBuf>,
    }

    impl PdfiumRasterizer {
        pub fn new(library_dir: Option<PathBuf>) -> Self {
            Self { library_dir }
        }

        fn bind(&self) -> Result<Pdfium, TransformError> {
            let bindings = match &self.library_dir {
                Some(dir) => Pdfium::bind_to_library(
                    Pdfium::pdfium_platform_library_name_at_path(dir),
                ),
                None => Pdfium::bind_to_system_library(),
            }
            .map_err(|e| TransformError::Backend(format!("Could not load pdfium: {}", e)))?;
            Ok(Pdfium::new(bindings))
        }

        fn render(&self, pdf: &[u8], scale: f32) -> Result<Vec<DynamicImage>, TransformError> {
            let pdfium = self.bind()?;
            let document = pdfium
                .load_pdf_from_byte_slice(pdf, None)
                .map_err(|e| TransformError::Decode(format!("PDF: {}", e)))?;

            let config = PdfRenderConfig::new().scale_page_by_factor(scale);
            let mut images = Vec::new();
            for page in document.pages().iter() {
                let bitmap = page
                    .render_with_config(&config)
                    .map_err(|e| TransformError::Backend(format!("Render failed: {}", e)))?;
                images.push(bitmap.as_image());
            }
            Ok(images)
        }
    }

    #[async_trait]
    impl PageRasterizer for PdfiumRasterizer {
        fn name(&self) -> &'static str {
            "pdfium"
        }

        async fn rasterize(
            &self,
            pdf: Bytes,
            scale: f32,
        ) -> Result<Vec<DynamicImage>, TransformError> {
            let this = self.clone();
            tokio::task::spawn_blocking(move || this.render(&pdf, scale)).await?
        }
    }
}
