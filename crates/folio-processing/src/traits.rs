//! Core traits for record transforms
//!
//! Every tool mode is one transform. Per-record transforms turn one record
//! into its own result; combining transforms prepare each record separately
//! and then merge the prepared parts into a single shared artifact.

use async_trait::async_trait;
use bytes::Bytes;
use folio_core::{AppError, Artifact, FileRecord, RecordId, RecordResult, Settings};

/// Failure of a transform. The pipeline records every variant as status
/// `error` on the record and keeps the message for display.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Could not decode {0}")]
    Decode(String),

    #[error("Could not encode output: {0}")]
    Encode(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Transform task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl From<TransformError> for AppError {
    fn from(err: TransformError) -> Self {
        AppError::Transform(err.to_string())
    }
}

/// Immutable view of a record handed to a transform.
#[derive(Debug, Clone)]
pub struct TransformInput {
    pub id: RecordId,
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl TransformInput {
    /// Name without a trailing `.pdf`, matched case-insensitively.
    pub fn pdf_base_name(&self) -> &str {
        let len = self.name.len();
        let has_suffix = len > 4
            && self.name.is_char_boundary(len - 4)
            && self.name[len - 4..].eq_ignore_ascii_case(".pdf");
        if has_suffix {
            &self.name[..len - 4]
        } else {
            &self.name
        }
    }

    /// Name without its final extension.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }
}

impl From<&FileRecord> for TransformInput {
    fn from(record: &FileRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            mime_type: record.mime_type.clone(),
            bytes: record.original.clone(),
        }
    }
}

/// Transform producing an independent result for each record.
#[async_trait]
pub trait RecordTransform: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn transform(
        &self,
        input: &TransformInput,
        settings: &Settings,
    ) -> Result<RecordResult, TransformError>;
}

/// Transform merging every record of a batch into one artifact.
///
/// `prepare` runs once per record so a bad input fails only its own record;
/// `combine` receives the prepared parts in store order.
#[async_trait]
pub trait CombineTransform: Send + Sync {
    type Part: Send + 'static;

    fn name(&self) -> &'static str;

    async fn prepare(
        &self,
        input: &TransformInput,
        settings: &Settings,
    ) -> Result<Self::Part, TransformError>;

    async fn combine(
        &self,
        parts: Vec<Self::Part>,
        settings: &Settings,
    ) -> Result<Artifact, TransformError>;
}
