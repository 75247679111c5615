//! Folio Core Library
//!
//! This crate provides the domain models, error types, configuration, validation
//! and the in-memory file record store shared across all Folio components.

pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use display::{DisplayRef, DisplayRegistry, InMemoryDisplayRegistry};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    format_file_size, AggregateStats, Artifact, ArtifactId, FileRecord, OutputFormat,
    ProcessingStatus, RecordId, RecordResult, ResizeBounds, Settings, SourceFile, ToolMode,
};
pub use store::{FileStore, StoreError};
pub use validation::{IngestValidator, ValidationError};
