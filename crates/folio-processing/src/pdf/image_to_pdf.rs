use async_trait::async_trait;
use bytes::Bytes;
use folio_core::{Artifact, Config, Settings};
use image::GenericImageView;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

use super::{save_document, PDF_MIME_TYPE};
use crate::compression::{EncodeFormat, ImageCompressor};
use crate::image::{ImageOrientation, ImageTransformer};
use crate::traits::{CombineTransform, TransformError, TransformInput};

pub const CONVERTED_PDF_NAME: &str = "converted.pdf";

/// One image, JPEG encoded and ready to be placed on a page
#[derive(Debug, Clone)]
pub struct PdfImagePart {
    pub width: u32,
    pub height: u32,
    pub jpeg: Bytes,
}

/// Builds one PDF with a page per image, each image scaled to fit the page
/// and centred on it.
#[derive(Debug, Clone)]
pub struct ImageToPdfTransform {
    page_width: f32,
    page_height: f32,
    jpeg_quality: u8,
}

impl ImageToPdfTransform {
    pub fn new(page_width: f32, page_height: f32, jpeg_quality: u8) -> Self {
        Self {
            page_width,
            page_height,
            jpeg_quality,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let (width, height) = config.page_size_pt();
        Self::new(width, height, config.pdf_image_quality())
    }

    /// Placement of an image on the page: (x, y, width, height) in points.
    pub fn placement(&self, width: u32, height: u32) -> (f32, f32, f32, f32) {
        let ratio = (self.page_width / width as f32).min(self.page_height / height as f32);
        let draw_width = width as f32 * ratio;
        let draw_height = height as f32 * ratio;
        (
            (self.page_width - draw_width) / 2.0,
            (self.page_height - draw_height) / 2.0,
            draw_width,
            draw_height,
        )
    }

    fn build_document(&self, parts: &[PdfImagePart]) -> Result<Bytes, TransformError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::with_capacity(parts.len());

        for part in parts {
            let mut image = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => part.width as i64,
                    "Height" => part.height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                part.jpeg.to_vec(),
            );
            // Already DCT encoded
            image.allows_compression = false;
            let image_id = doc.add_object(image);

            let (x, y, width, height) = self.placement(part.width, part.height);
            let content = Content {
                operations: vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![
                            width.into(),
                            0.into(),
                            0.into(),
                            height.into(),
                            x.into(),
                            y.into(),
                        ],
                    ),
                    Operation::new("Do", vec!["Im1".into()]),
                    Operation::new("Q", vec![]),
                ],
            };
            let encoded = content
                .encode()
                .map_err(|e| TransformError::Encode(format!("PDF content: {}", e)))?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    0.into(),
                    0.into(),
                    self.page_width.into(),
                    self.page_height.into(),
                ],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Im1" => image_id },
                },
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        save_document(&mut doc)
    }
}

#[async_trait]
impl CombineTransform for ImageToPdfTransform {
    type Part = PdfImagePart;

    fn name(&self) -> &'static str {
        "image-to-pdf"
    }

    async fn prepare(
        &self,
        input: &TransformInput,
        settings: &Settings,
    ) -> Result<PdfImagePart, TransformError> {
        let data = input.bytes.clone();
        let auto_orient = settings.auto_orient;
        let quality = self.jpeg_quality;

        tokio::task::spawn_blocking(move || {
            let mut img = ImageTransformer::decode(&data)?;
            if auto_orient {
                img = ImageOrientation::apply_exif_orientation(img, &data).0;
            }
            let (width, height) = img.dimensions();
            let jpeg = ImageCompressor::compress(&img, EncodeFormat::Jpeg, quality)?;
            Ok::<_, TransformError>(PdfImagePart {
                width,
                height,
                jpeg,
            })
        })
        .await?
    }

    async fn combine(
        &self,
        parts: Vec<PdfImagePart>,
        _settings: &Settings,
    ) -> Result<Artifact, TransformError> {
        if parts.is_empty() {
            return Err(TransformError::InvalidSettings(
                "No images to convert".to_string(),
            ));
        }

        let page_count = parts.len();
        let this = self.clone();
        let bytes = tokio::task::spawn_blocking(move || this.build_document(&parts)).await??;

        tracing::debug!(pages = page_count, size_bytes = bytes.len(), "Built PDF from images");
        Ok(Artifact::new(CONVERTED_PDF_NAME, PDF_MIME_TYPE, bytes))
    }
}
