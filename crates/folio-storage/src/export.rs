//! Export of processed artifacts through a save target.
//!
//! Saves are spaced by a fixed delay so a host that throttles bursts of
//! downloads sees them one at a time.

use crate::traits::{ExportError, ExportResult, SaveTarget, SavedFile};
use folio_core::{Artifact, ArtifactId, Config, FileRecord, RecordId};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A record whose export failed
#[derive(Debug, Clone, Serialize)]
pub struct ExportFailure {
    pub record_id: RecordId,
    pub name: String,
    pub error: String,
}

/// Outcome of `export_all`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub saved: Vec<SavedFile>,
    pub failures: Vec<ExportFailure>,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone)]
pub struct Exporter {
    target: Arc<dyn SaveTarget>,
    stagger: Duration,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("target", &self.target.describe())
            .field("stagger", &self.stagger)
            .finish()
    }
}

impl Exporter {
    pub fn new(target: Arc<dyn SaveTarget>, stagger: Duration) -> Self {
        Self { target, stagger }
    }

    pub fn from_config(target: Arc<dyn SaveTarget>, config: &Config) -> Self {
        Self::new(target, Duration::from_millis(config.export_stagger_ms()))
    }

    /// Save every artifact of one record. Sub-artifacts of a one-to-many
    /// result are spaced by the stagger delay.
    pub async fn export_one(&self, record: &FileRecord) -> ExportResult<Vec<SavedFile>> {
        let artifacts = record.artifacts();
        if artifacts.is_empty() {
            return Err(ExportError::NothingToExport);
        }

        let mut saved = Vec::with_capacity(artifacts.len());
        for (index, artifact) in artifacts.iter().enumerate() {
            if index > 0 {
                self.pause().await;
            }
            saved.push(self.save_artifact(record, artifact).await?);
        }

        tracing::info!(
            record_id = %record.id,
            name = %record.name,
            files = saved.len(),
            "Record exported"
        );
        Ok(saved)
    }

    /// Save the results of every record that has one. An artifact shared by
    /// several records is saved once. A failing record is reported and the
    /// remaining records are still exported.
    pub async fn export_all(&self, records: &[FileRecord]) -> ExportResult<ExportReport> {
        if records.iter().all(|r| r.artifacts().is_empty()) {
            return Err(ExportError::NothingToExport);
        }

        let start = Instant::now();
        let mut report = ExportReport::default();
        let mut seen: HashSet<ArtifactId> = HashSet::new();

        for record in records {
            for artifact in record.artifacts() {
                if !seen.insert(artifact.id) {
                    continue;
                }
                if !report.saved.is_empty() || !report.failures.is_empty() {
                    self.pause().await;
                }

                match self.save_artifact(record, artifact).await {
                    Ok(saved) => report.saved.push(saved),
                    Err(e) => {
                        tracing::warn!(
                            record_id = %record.id,
                            name = %artifact.name,
                            error = %e,
                            "Export failed"
                        );
                        report.failures.push(ExportFailure {
                            record_id: record.id,
                            name: artifact.name.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        tracing::info!(
            destination = %self.target.describe(),
            saved = report.saved.len(),
            failed = report.failures.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Export finished"
        );
        Ok(report)
    }

    async fn save_artifact(
        &self,
        record: &FileRecord,
        artifact: &Artifact,
    ) -> ExportResult<SavedFile> {
        tracing::debug!(
            record_id = %record.id,
            name = %artifact.name,
            size_bytes = artifact.size_bytes(),
            "Saving artifact"
        );
        self.target
            .save(&artifact.name, &artifact.mime_type, artifact.bytes.clone())
            .await
    }

    async fn pause(&self) {
        if !self.stagger.is_zero() {
            tokio::time::sleep(self.stagger).await;
        }
    }
}
