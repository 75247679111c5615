use async_trait::async_trait;
use folio_core::{Artifact, RecordResult, Settings};
use lopdf::{Document, Object};

use super::{inherited_attribute, load_document, save_document, PDF_MIME_TYPE};
use crate::traits::{RecordTransform, TransformError, TransformInput};

/// Rotates every page of a document by a multiple of 90 degrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRotateTransform;

impl PdfRotateTransform {
    pub fn new() -> Self {
        Self
    }

    /// Validate the requested rotation, returning it in [0, 360).
    pub fn quarter_turns(settings: &Settings) -> Result<i64, TransformError> {
        let degrees = settings.normalized_rotation();
        if degrees % 90.0 != 0.0 {
            return Err(TransformError::InvalidSettings(format!(
                "PDF pages rotate in steps of 90 degrees, got {}",
                settings.rotation
            )));
        }
        Ok(degrees as i64)
    }

    /// Advance each page's `/Rotate`, resolving inherited values first.
    pub fn rotate_pages(doc: &mut Document, degrees: i64) -> Result<(), TransformError> {
        for page_id in doc.get_pages().into_values() {
            let current = inherited_attribute(doc, page_id, b"Rotate")
                .and_then(|value| value.as_i64().ok())
                .unwrap_or(0);
            let page = doc
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| TransformError::Decode(format!("page {:?}: {}", page_id, e)))?;
            page.set("Rotate", (current + degrees).rem_euclid(360));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordTransform for PdfRotateTransform {
    fn name(&self) -> &'static str {
        "rotate-pdf"
    }

    async fn transform(
        &self,
        input: &TransformInput,
        settings: &Settings,
    ) -> Result<RecordResult, TransformError> {
        let degrees = Self::quarter_turns(settings)?;
        let data = input.bytes.clone();
        let name = input.name.clone();

        let bytes = tokio::task::spawn_blocking(move || {
            let mut doc = load_document(&data, &name)?;
            Self::rotate_pages(&mut doc, degrees)?;
            save_document(&mut doc)
        })
        .await??;

        Ok(RecordResult::Single(Artifact::new(
            format!("rotated_{}", input.name),
            PDF_MIME_TYPE,
            bytes,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::pdf_with_pages;
    use bytes::Bytes;
    use folio_core::RecordId;

    fn input() -> TransformInput {
        TransformInput {
            id: RecordId::new(),
            name: "scan.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: Bytes::from(pdf_with_pages("s", 2)),
        }
    }

    fn rotations(data: &[u8]) -> Vec<i64> {
        let doc = Document::load_mem(data).unwrap();
        doc.get_pages()
            .into_values()
            .map(|id| {
                inherited_attribute(&doc, id, b"Rotate")
                    .and_then(|v| v.as_i64().ok())
                    .unwrap_or(0)
            })
            .collect()
    }

    #[test]
    fn test_quarter_turns() {
        let settings = |rotation| Settings {
            rotation,
            ..Settings::default()
        };
        assert_eq!(PdfRotateTransform::quarter_turns(&settings(270.0)).unwrap(), 270);
        assert_eq!(PdfRotateTransform::quarter_turns(&settings(0.0)).unwrap(), 0);
        assert!(PdfRotateTransform::quarter_turns(&settings(45.0)).is_err());
    }

    #[tokio::test]
    async fn test_rotate_every_page() {
        let settings = Settings {
            rotation: 90.0,
            ..Settings::default()
        };
        let result = PdfRotateTransform::new()
            .transform(&input(), &settings)
            .await
            .unwrap();

        let artifact = &result.artifacts()[0];
        assert_eq!(artifact.name, "rotated_scan.pdf");
        assert_eq!(rotations(&artifact.bytes), vec![90, 90]);

        // Rotations accumulate and wrap
        let mut doc = Document::load_mem(&artifact.bytes).unwrap();
        PdfRotateTransform::rotate_pages(&mut doc, 270).unwrap();
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        assert_eq!(rotations(&buffer), vec![0, 0]);
    }

    #[tokio::test]
    async fn test_rotate_rejects_odd_angle() {
        let settings = Settings {
            rotation: 30.0,
            ..Settings::default()
        };
        let err = PdfRotateTransform::new()
            .transform(&input(), &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidSettings(_)));
    }
}
