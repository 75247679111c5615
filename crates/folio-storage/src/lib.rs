//! Folio Storage Library
//!
//! Save targets for processed artifacts and the export component that
//! drives them. A save target is the host side of "save as": the local
//! target writes into a directory, the memory target keeps files in memory
//! for tests and embedding hosts.
//!
//! # Filenames
//!
//! Targets accept plain file names only: no path separators, no `..`, no
//! NUL bytes. An existing file is never overwritten; a clash gets a ` (n)`
//! suffix before the extension.

pub mod export;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use export::{ExportFailure, ExportReport, Exporter};
#[cfg(feature = "storage-local")]
pub use local::LocalSaveTarget;
pub use memory::MemorySaveTarget;
pub use traits::{ExportError, ExportResult, SaveTarget, SavedFile};
