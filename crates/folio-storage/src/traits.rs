//! Save target abstraction
//!
//! This module defines the SaveTarget trait every host save mechanism
//! implements, and the filename rules they share.

use async_trait::async_trait;
use bytes::Bytes;
use folio_core::AppError;
use serde::Serialize;
use thiserror::Error;

/// Export operation errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Could not write {name}: {message}")]
    Write { name: String, message: String },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Nothing to export")]
    NothingToExport,
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::InvalidFilename(name) => {
                AppError::InvalidInput(format!("Invalid filename: {}", name))
            }
            other => AppError::Export(other.to_string()),
        }
    }
}

/// A file written by a save target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedFile {
    /// Name actually used, which may carry a ` (n)` suffix
    pub name: String,
    /// Where the target put it (a path for the local target)
    pub location: String,
    pub size_bytes: u64,
}

/// Host save mechanism
#[async_trait]
pub trait SaveTarget: Send + Sync {
    /// Save `data` under `filename`, never overwriting an existing file.
    async fn save(&self, filename: &str, mime_type: &str, data: Bytes) -> ExportResult<SavedFile>;

    /// Human readable description for logs
    fn describe(&self) -> String;
}

/// Reject names that are empty or could escape the target. Dots inside a
/// name are fine; only the `.` and `..` entries themselves are refused.
pub fn validate_filename(filename: &str) -> ExportResult<()> {
    let invalid = filename.trim().is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains('\0');
    if invalid {
        return Err(ExportError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

/// Candidate name for the n-th clash: `report.pdf` -> `report (2).pdf`.
pub fn numbered_name(filename: &str, n: u32) -> String {
    if n == 0 {
        return filename.to_string();
    }
    match filename.rfind('.') {
        Some(idx) if idx > 0 => format!("{} ({}){}", &filename[..idx], n, &filename[idx..]),
        _ => format!("{} ({})", filename, n),
    }
}
