//! Ingestion of host files into the store
//!
//! Files the active mode does not accept are filtered out and reported, not
//! turned into error records.

use folio_core::{
    AppError, FileRecord, FileStore, IngestValidator, RecordId, SourceFile, ToolMode,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RejectedFile {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Ids of the new records, in input order
    pub added: Vec<RecordId>,
    pub rejected: Vec<RejectedFile>,
}

/// Validate each file against the mode and append the accepted ones to the
/// store in input order.
pub fn ingest_files(
    store: &FileStore,
    files: Vec<SourceFile>,
    mode: ToolMode,
    validator: &IngestValidator,
) -> Result<IngestReport, AppError> {
    let mut records = Vec::with_capacity(files.len());
    let mut rejected = Vec::new();

    for file in files {
        match validator.validate_all(&file, mode) {
            Ok(content_type) => {
                records.push(FileRecord::new(file.name, content_type, file.bytes));
            }
            Err(e) => {
                tracing::debug!(
                    name = %file.name,
                    mode = %mode,
                    reason = %e,
                    "File skipped at ingestion"
                );
                rejected.push(RejectedFile {
                    name: file.name,
                    reason: e.to_string(),
                });
            }
        }
    }

    let added = store.add(records)?;
    Ok(IngestReport { added, rejected })
}
