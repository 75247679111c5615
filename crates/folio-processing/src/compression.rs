//! Image encoding
//!
//! Re-encodes a processed pixel surface to JPEG, PNG or WebP at a quality,
//! optionally stepping the quality down until a target size is met.

use bytes::Bytes;
use folio_core::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::DynamicImage;

use crate::traits::TransformError;

/// Lowest quality the target-size search will go to
const MIN_TARGET_QUALITY: u8 = 10;
const TARGET_QUALITY_STEP: u8 = 10;

/// Concrete encoder selected for an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFormat {
    Jpeg,
    Png,
    WebP,
}

impl EncodeFormat {
    /// Pick the encoder for a requested format. `Original` keeps JPEG, PNG and
    /// WebP sources in their format; anything else is written as PNG.
    pub fn resolve(requested: OutputFormat, source_mime: &str) -> Self {
        match requested {
            OutputFormat::Jpeg => EncodeFormat::Jpeg,
            OutputFormat::Png => EncodeFormat::Png,
            OutputFormat::Webp => EncodeFormat::WebP,
            OutputFormat::Original => match source_mime.to_lowercase().as_str() {
                "image/jpeg" | "image/jpg" => EncodeFormat::Jpeg,
                "image/webp" => EncodeFormat::WebP,
                _ => EncodeFormat::Png,
            },
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            EncodeFormat::Jpeg => "image/jpeg",
            EncodeFormat::Png => "image/png",
            EncodeFormat::WebP => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            EncodeFormat::Jpeg => "jpg",
            EncodeFormat::Png => "png",
            EncodeFormat::WebP => "webp",
        }
    }

    /// Whether quality affects the output.
    pub fn is_lossy(self) -> bool {
        match self {
            EncodeFormat::Jpeg => true,
            EncodeFormat::Png => false,
            EncodeFormat::WebP => cfg!(feature = "webp"),
        }
    }
}

/// Main compression service
pub struct ImageCompressor;

impl ImageCompressor {
    /// Compress image with specified format and quality (0-100)
    pub fn compress(
        img: &DynamicImage,
        format: EncodeFormat,
        quality: u8,
    ) -> Result<Bytes, TransformError> {
        match format {
            EncodeFormat::Jpeg => Self::compress_jpeg(img, quality),
            EncodeFormat::Png => Self::compress_png(img),
            EncodeFormat::WebP => Self::compress_webp(img, quality),
        }
    }

    /// Compress, lowering the quality in steps until the output fits in
    /// `target_kb` or the quality floor is reached. Returns the encoded bytes
    /// and the quality used.
    pub fn compress_to_target(
        img: &DynamicImage,
        format: EncodeFormat,
        quality: u8,
        target_kb: Option<u32>,
    ) -> Result<(Bytes, u8), TransformError> {
        let mut current = quality.min(100);
        let mut encoded = Self::compress(img, format, current)?;

        let Some(target_kb) = target_kb.filter(|_| format.is_lossy()) else {
            return Ok((encoded, current));
        };
        let target_bytes = target_kb as usize * 1024;

        while encoded.len() > target_bytes && current > MIN_TARGET_QUALITY {
            current = current
                .saturating_sub(TARGET_QUALITY_STEP)
                .max(MIN_TARGET_QUALITY);
            encoded = Self::compress(img, format, current)?;
            tracing::debug!(
                quality = current,
                size_bytes = encoded.len(),
                target_bytes = target_bytes,
                "Lowered quality to approach target size"
            );
        }

        Ok((encoded, current))
    }

    fn compress_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes, TransformError> {
        let rgb_img = img.to_rgb8();
        let mut buffer = Vec::new();
        // The encoder rejects quality 0
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        rgb_img
            .write_with_encoder(encoder)
            .map_err(|e| TransformError::Encode(format!("JPEG: {}", e)))?;
        Ok(Bytes::from(buffer))
    }

    fn compress_png(img: &DynamicImage) -> Result<Bytes, TransformError> {
        let mut buffer = Vec::new();
        let encoder = PngEncoder::new(&mut buffer);
        img.write_with_encoder(encoder)
            .map_err(|e| TransformError::Encode(format!("PNG: {}", e)))?;
        Ok(Bytes::from(buffer))
    }

    #[cfg(feature = "webp")]
    fn compress_webp(img: &DynamicImage, quality: u8) -> Result<Bytes, TransformError> {
        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(quality.min(100) as f32);

        Ok(Bytes::copy_from_slice(&webp_data))
    }

    #[cfg(not(feature = "webp"))]
    fn compress_webp(img: &DynamicImage, _quality: u8) -> Result<Bytes, TransformError> {
        use image::codecs::webp::WebPEncoder;

        let rgba_img = img.to_rgba8();
        let mut buffer = Vec::new();
        let encoder = WebPEncoder::new_lossless(&mut buffer);
        rgba_img
            .write_with_encoder(encoder)
            .map_err(|e| TransformError::Encode(format!("WebP: {}", e)))?;
        Ok(Bytes::from(buffer))
    }
}
