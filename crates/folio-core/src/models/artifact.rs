use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

use crate::display::DisplayRef;

/// Identity of a produced artifact. Combining transforms attach the same
/// artifact to several records; they share this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ArtifactId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// A processed output attached to a record.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub id: ArtifactId,
    /// File name used when the artifact is exported
    pub name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub bytes: Bytes,
    /// Issued by the store when the artifact is attached to a record
    pub display: Option<DisplayRef>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            id: ArtifactId::new(),
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
            display: None,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}
