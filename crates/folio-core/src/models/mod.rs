//! Data models for Folio
//!
//! Records tracked through the processing pipeline, the artifacts they
//! produce, the per-batch settings and tool modes, and the statistics derived
//! from a store snapshot.

mod artifact;
mod record;
mod settings;
mod stats;
mod tool;

pub use artifact::{Artifact, ArtifactId};
pub use record::{FileRecord, ProcessingStatus, RecordId, RecordResult, SourceFile};
pub use settings::{OutputFormat, ResizeBounds, Settings};
pub use stats::{format_file_size, AggregateStats};
pub use tool::ToolMode;
