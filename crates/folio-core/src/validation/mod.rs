//! Ingestion validation
//!
//! Decides whether a file handed over by the host may become a record in the
//! active tool mode. Rejections are expected and are filtered out by the
//! ingestion pipeline rather than surfaced as record errors.

use std::path::Path;

use crate::models::{SourceFile, ToolMode};

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Content type {content_type} is not accepted by the {mode} tool")]
    NotAccepted { content_type: String, mode: ToolMode },

    #[error("Could not determine the type of {0}")]
    UnknownType(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Content types that carry no information about the file.
const GENERIC_CONTENT_TYPES: [&str; 2] = ["application/octet-stream", "binary/octet-stream"];

/// Validates incoming files against the size limit and the active mode.
pub struct IngestValidator {
    max_file_size: usize,
}

impl IngestValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Work out the MIME type: the declared one when it is specific, else the
    /// sniffed magic bytes, else the extension.
    pub fn resolve_content_type(&self, file: &SourceFile) -> Result<String, ValidationError> {
        if let Some(declared) = file
            .declared_type
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty() && !GENERIC_CONTENT_TYPES.contains(&t.as_str()))
        {
            return Ok(declared);
        }

        if let Some(kind) = infer::get(&file.bytes) {
            return Ok(kind.mime_type().to_string());
        }

        content_type_from_extension(&file.name)
            .map(str::to_string)
            .ok_or_else(|| ValidationError::UnknownType(file.name.clone()))
    }

    pub fn validate_mode(&self, content_type: &str, mode: ToolMode) -> Result<(), ValidationError> {
        if !mode.accepts(content_type) {
            return Err(ValidationError::NotAccepted {
                content_type: content_type.to_string(),
                mode,
            });
        }
        Ok(())
    }

    /// Validate all aspects of a file and return its resolved content type.
    pub fn validate_all(
        &self,
        file: &SourceFile,
        mode: ToolMode,
    ) -> Result<String, ValidationError> {
        if file.name.trim().is_empty() {
            return Err(ValidationError::InvalidFilename(file.name.clone()));
        }
        self.validate_file_size(file.bytes.len())?;
        let content_type = self.resolve_content_type(file)?;
        self.validate_mode(&content_type, mode)?;
        Ok(content_type)
    }
}

fn content_type_from_extension(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())?;

    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}
