//! Error types module
//!
//! This module provides the application-level error type used throughout Folio.
//! Layer-specific errors (ingestion validation, store bookkeeping, transforms,
//! exports) live next to the code that raises them and convert into `AppError`
//! at the session boundary.

use std::io;

use crate::store::StoreError;
use crate::validation::ValidationError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like rejected input files
    Debug,
    /// Warning level - for recoverable issues like a failed save
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error reporting - defines how an error should be presented
/// to the user of the host (CLI output, exit status).
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "TRANSFORM_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether repeating the operation can succeed without changing the input
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from the internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;

    /// Process exit status to use when this error ends a CLI run
    fn exit_code(&self) -> i32;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Invalid settings: {}", err))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppError::NotFound(format!("record {}", id)),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Static metadata per variant:
/// (error_code, recoverable, suggested_action, log_level, exit_code).
fn app_error_static_metadata(
    err: &AppError,
) -> (&'static str, bool, Option<&'static str>, LogLevel, i32) {
    match err {
        AppError::InvalidInput(_) => (
            "INVALID_INPUT",
            false,
            Some("Check the settings and try again"),
            LogLevel::Debug,
            2,
        ),
        AppError::Validation(_) => (
            "VALIDATION_ERROR",
            false,
            Some("Choose a file type accepted by the current tool"),
            LogLevel::Debug,
            2,
        ),
        AppError::NotFound(_) => (
            "NOT_FOUND",
            false,
            Some("Verify the record still exists"),
            LogLevel::Debug,
            2,
        ),
        AppError::Transform(_) => (
            "TRANSFORM_ERROR",
            false,
            Some("Remove the file and add it again, or try a different file"),
            LogLevel::Warn,
            1,
        ),
        AppError::Export(_) => (
            "EXPORT_ERROR",
            true,
            Some("Check the output directory is writable and retry"),
            LogLevel::Warn,
            1,
        ),
        AppError::Busy(_) => (
            "BUSY",
            true,
            Some("Wait for the running batch to finish"),
            LogLevel::Debug,
            1,
        ),
        AppError::Configuration(_) => (
            "CONFIGURATION_ERROR",
            false,
            Some("Check FOLIO_* environment variables"),
            LogLevel::Error,
            78,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            "INTERNAL_ERROR",
            true,
            Some("Retry the operation"),
            LogLevel::Error,
            70,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error output
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Validation(_) => "Validation",
            AppError::NotFound(_) => "NotFound",
            AppError::Transform(_) => "Transform",
            AppError::Export(_) => "Export",
            AppError::Busy(_) => "Busy",
            AppError::Configuration(_) => "Configuration",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn exit_code(&self) -> i32 {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Validation(ref err) => err.to_string(),
            AppError::NotFound(ref msg) => format!("Not found: {}", msg),
            AppError::Transform(ref msg) => msg.clone(),
            AppError::Export(ref msg) => format!("Could not save file: {}", msg),
            AppError::Busy(ref msg) => msg.clone(),
            AppError::Configuration(ref msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_transform() {
        let err = AppError::Transform("corrupt JPEG".to_string());
        assert_eq!(err.error_code(), "TRANSFORM_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "corrupt JPEG");
        assert_eq!(err.log_level(), LogLevel::Warn);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_error_metadata_export_is_recoverable() {
        let err = AppError::Export("permission denied".to_string());
        assert!(err.is_recoverable());
        assert!(err.client_message().contains("permission denied"));
    }

    #[test]
    fn test_from_anyhow_keeps_chain() {
        let source = anyhow::anyhow!("disk full").context("writing artifact");
        let err = AppError::from(source);
        assert_eq!(err.error_type(), "Internal");
        assert!(err.detailed_message().contains("Caused by"));
    }

    #[test]
    fn test_from_store_not_found() {
        let id = crate::models::RecordId::new();
        let err = AppError::from(StoreError::NotFound(id));
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_suggested_actions() {
        let busy = AppError::Busy("batch running".to_string());
        assert_eq!(
            busy.suggested_action(),
            Some("Wait for the running batch to finish")
        );
        let config = AppError::Configuration("bad".to_string());
        assert_eq!(config.exit_code(), 78);
    }
}
