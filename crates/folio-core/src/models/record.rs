use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::artifact::Artifact;
use crate::display::DisplayRef;

/// Record identifier: UUID v7, i.e. a millisecond timestamp followed by random
/// bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ProcessingStatus {
    /// pending -> processing -> completed | error. A failed record may be
    /// picked up again; a completed one never leaves `completed`.
    pub fn can_transition_to(self, next: ProcessingStatus) -> bool {
        use ProcessingStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Error, Processing)
                | (Processing, Completed)
                | (Processing, Error)
        )
    }

    /// Whether a batch should run the transform for a record in this status
    pub fn is_eligible(self) -> bool {
        matches!(self, ProcessingStatus::Pending | ProcessingStatus::Error)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Error)
    }
}

impl Display for ProcessingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProcessingStatus::Pending => write!(f, "pending"),
            ProcessingStatus::Processing => write!(f, "processing"),
            ProcessingStatus::Completed => write!(f, "completed"),
            ProcessingStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcessingStatus::Pending),
            "processing" => Ok(ProcessingStatus::Processing),
            "completed" => Ok(ProcessingStatus::Completed),
            "error" => Ok(ProcessingStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid processing status: {}", s)),
        }
    }
}

/// A file handed to ingestion by the host, before it becomes a record.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    /// MIME type declared by the host, if any
    pub declared_type: Option<String>,
    pub bytes: Bytes,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, declared_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            declared_type,
            bytes,
        }
    }
}

/// Output of a completed transform.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "artifacts", rename_all = "lowercase")]
pub enum RecordResult {
    Single(Artifact),
    /// One-to-many transforms (PDF pages, split). May be empty.
    Multiple(Vec<Artifact>),
}

impl RecordResult {
    pub fn artifacts(&self) -> &[Artifact] {
        match self {
            RecordResult::Single(artifact) => std::slice::from_ref(artifact),
            RecordResult::Multiple(artifacts) => artifacts,
        }
    }

    pub(crate) fn artifacts_mut(&mut self) -> &mut [Artifact] {
        match self {
            RecordResult::Single(artifact) => std::slice::from_mut(artifact),
            RecordResult::Multiple(artifacts) => artifacts,
        }
    }

    pub fn total_size(&self) -> u64 {
        self.artifacts().iter().map(Artifact::size_bytes).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub id: RecordId,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    #[serde(skip)]
    pub original: Bytes,
    pub original_display: Option<DisplayRef>,
    pub status: ProcessingStatus,
    /// Coarse progress: 0 until completed, then 100.
    pub progress: u8,
    pub result: Option<RecordResult>,
    /// Message of the last failed transform
    pub error: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, original: Bytes) -> Self {
        Self {
            id: RecordId::new(),
            name: name.into(),
            size_bytes: original.len() as u64,
            mime_type: mime_type.into(),
            original,
            original_display: None,
            status: ProcessingStatus::Pending,
            progress: 0,
            result: None,
            error: None,
            added_at: Utc::now(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == "application/pdf"
    }

    /// Name without its final extension.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }

    pub fn artifacts(&self) -> &[Artifact] {
        self.result.as_ref().map(RecordResult::artifacts).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use ProcessingStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Error));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Processing));
        assert!(Error.can_transition_to(Processing));
        assert!(!Error.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(Error.is_eligible());
        assert!(!Completed.is_eligible());
        assert!(!Processing.is_eligible());
    }

    #[test]
    fn test_status_display_and_parse() {
        for status in [
            ProcessingStatus::Pending,
            ProcessingStatus::Processing,
            ProcessingStatus::Completed,
            ProcessingStatus::Error,
        ] {
            assert_eq!(status.to_string().parse::<ProcessingStatus>().unwrap(), status);
        }
        assert!("failed".parse::<ProcessingStatus>().is_err());
    }

    #[test]
    fn test_record_ids_are_unique_and_ordered() {
        let a = RecordId::new();
        let b = RecordId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = FileRecord::new("photo.jpg", "image/jpeg", Bytes::from_static(b"abc"));
        assert_eq!(record.status, ProcessingStatus::Pending);
        assert_eq!(record.progress, 0);
        assert_eq!(record.size_bytes, 3);
        assert!(record.is_image());
        assert!(record.artifacts().is_empty());
    }

    #[test]
    fn test_stem() {
        let record = FileRecord::new("scan.final.pdf", "application/pdf", Bytes::new());
        assert_eq!(record.stem(), "scan.final");
        let record = FileRecord::new(".hidden", "image/png", Bytes::new());
        assert_eq!(record.stem(), ".hidden");
    }
}
