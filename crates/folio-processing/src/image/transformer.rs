//! Image transformer - orchestrates the compress tool
//!
//! Chains the individual operations over one decoded image in a fixed order:
//! 1. EXIF auto-orientation (if enabled)
//! 2. Resize to bounds (shrink only)
//! 3. Rotation about the centre
//! 4. Horizontal / vertical flip
//! 5. Colour adjustments, grayscale, sepia, blur
//! 6. Encoding at the requested format and quality
//! 7. EXIF carry-over when metadata is kept

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use folio_core::{Artifact, RecordResult, Settings};
use image::{DynamicImage, GenericImageView};

use crate::compression::{EncodeFormat, ImageCompressor};
use crate::image::filters::{FilterConfig, ImageFilters};
use crate::image::metadata::ImageMetadata;
use crate::image::orientation::ImageOrientation;
use crate::image::resize::ImageResize;
use crate::traits::{RecordTransform, TransformError, TransformInput};

/// Encoded output of a single image transform
#[derive(Debug, Clone)]
pub struct TransformedImage {
    pub bytes: Bytes,
    pub format: EncodeFormat,
    pub width: u32,
    pub height: u32,
    /// Quality actually used, lower than requested when a target size applied
    pub quality: u8,
}

/// Per-record transform of the compress tool
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageTransformer;

impl ImageTransformer {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(data: &[u8]) -> Result<DynamicImage, TransformError> {
        image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode(format!("image: {}", e)))?
            .decode()
            .map_err(|e| TransformError::Decode(format!("image: {}", e)))
    }

    /// Run the full chain synchronously. CPU bound; async callers go through
    /// [`RecordTransform::transform`], which moves it to a blocking thread.
    pub fn transform_with_settings(
        data: &[u8],
        source_mime: &str,
        settings: &Settings,
    ) -> Result<TransformedImage, TransformError> {
        let mut img = Self::decode(data)?;

        // Step 1: EXIF auto-orientation
        let mut oriented = false;
        if settings.auto_orient {
            let (corrected, applied) = ImageOrientation::apply_exif_orientation(img, data);
            img = corrected;
            oriented = applied;
        }

        // Step 2: resize to bounds
        img = ImageResize::apply_bounds(img, &settings.resize);

        // Step 3: rotation
        let rotation = settings.normalized_rotation();
        if rotation != 0.0 {
            tracing::debug!(degrees = rotation, "Applying rotation");
            img = ImageOrientation::rotate_about_center(img, rotation);
        }

        // Step 4: flips
        if settings.flip_horizontal {
            img = ImageOrientation::apply_flip_horizontal(img);
        }
        if settings.flip_vertical {
            img = ImageOrientation::apply_flip_vertical(img);
        }

        // Step 5: filters
        let filters = FilterConfig::from_settings(settings);
        if !filters.is_empty() {
            tracing::debug!(filters = ?filters, "Applying image filters");
            img = ImageFilters::apply(img, &filters);
        }

        // Step 6: encoding
        let format = EncodeFormat::resolve(settings.format, source_mime);
        let (mut bytes, quality) = ImageCompressor::compress_to_target(
            &img,
            format,
            settings.quality,
            settings.target_kb,
        )?;

        // Step 7: metadata. Re-encoding always drops EXIF; copy it back only
        // when asked, and never the orientation of already-rotated pixels.
        if !settings.remove_exif && !oriented {
            if let Some(exif) = ImageMetadata::extract_exif(data) {
                bytes = ImageMetadata::embed_exif(bytes, format, exif);
            }
        }

        let (width, height) = img.dimensions();
        Ok(TransformedImage {
            bytes,
            format,
            width,
            height,
            quality,
        })
    }

    /// Output name for a processed image: `processed_<stem>.<ext>`
    pub fn output_name(stem: &str, format: EncodeFormat) -> String {
        format!("processed_{}.{}", stem, format.extension())
    }
}

#[async_trait]
impl RecordTransform for ImageTransformer {
    fn name(&self) -> &'static str {
        "compress"
    }

    async fn transform(
        &self,
        input: &TransformInput,
        settings: &Settings,
    ) -> Result<RecordResult, TransformError> {
        let data = input.bytes.clone();
        let mime = input.mime_type.clone();
        let task_settings = settings.clone();
        let output = tokio::task::spawn_blocking(move || {
            Self::transform_with_settings(&data, &mime, &task_settings)
        })
        .await??;

        tracing::debug!(
            record_id = %input.id,
            width = output.width,
            height = output.height,
            quality = output.quality,
            size_bytes = output.bytes.len(),
            "Image transformed"
        );

        let name = Self::output_name(input.stem(), output.format);
        Ok(RecordResult::Single(Artifact::new(
            name,
            output.format.to_mime_type(),
            output.bytes,
        )))
    }
}
