use bytes::Bytes;
use img_parts::{jpeg::Jpeg, png::Png, webp::WebP, ImageEXIF};

use crate::compression::EncodeFormat;

/// EXIF block handling for re-encoded images
pub struct ImageMetadata;

impl ImageMetadata {
    /// Extract the raw EXIF block from a JPEG, PNG or WebP container.
    pub fn extract_exif(data: &[u8]) -> Option<Bytes> {
        let data = Bytes::copy_from_slice(data);

        if let Ok(jpeg) = Jpeg::from_bytes(data.clone()) {
            return jpeg.exif();
        }
        if let Ok(png) = Png::from_bytes(data.clone()) {
            return png.exif();
        }
        if let Ok(webp) = WebP::from_bytes(data) {
            return webp.exif();
        }
        None
    }

    /// Write an EXIF block into freshly encoded output. Output that cannot
    /// be parsed as the expected container is returned unchanged.
    pub fn embed_exif(encoded: Bytes, format: EncodeFormat, exif: Bytes) -> Bytes {
        match format {
            EncodeFormat::Jpeg => match Jpeg::from_bytes(encoded.clone()) {
                Ok(mut jpeg) => {
                    jpeg.set_exif(Some(exif));
                    jpeg.encoder().bytes()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Could not carry EXIF into JPEG output");
                    encoded
                }
            },
            EncodeFormat::Png => match Png::from_bytes(encoded.clone()) {
                Ok(mut png) => {
                    png.set_exif(Some(exif));
                    png.encoder().bytes()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Could not carry EXIF into PNG output");
                    encoded
                }
            },
            EncodeFormat::WebP => match WebP::from_bytes(encoded.clone()) {
                Ok(mut webp) => {
                    webp.set_exif(Some(exif));
                    webp.encoder().bytes()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Could not carry EXIF into WebP output");
                    encoded
                }
            },
        }
    }
}
