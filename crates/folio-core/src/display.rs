//! Display references
//!
//! A display reference is a host handle that lets binary content be previewed
//! or saved without re-reading it. Each handle belongs to exactly one record
//! and must be revoked when that record leaves the store.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayRef {
    id: Uuid,
    pub mime_type: String,
}

impl DisplayRef {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            mime_type: mime_type.into(),
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }
}

impl Display for DisplayRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "folio-display:{}", self.id)
    }
}

/// Issues and revokes display references on behalf of the store.
pub trait DisplayRegistry: Send + Sync {
    fn issue(&self, bytes: &Bytes, mime_type: &str) -> DisplayRef;

    /// Revoking an unknown or already revoked reference is a no-op.
    fn revoke(&self, reference: &DisplayRef);

    /// Number of references issued and not yet revoked
    fn live_count(&self) -> usize;
}

/// Registry keeping the referenced content in memory.
#[derive(Debug, Default)]
pub struct InMemoryDisplayRegistry {
    entries: Mutex<HashMap<Uuid, Bytes>>,
}

impl InMemoryDisplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content behind a live reference.
    pub fn resolve(&self, reference: &DisplayRef) -> Option<Bytes> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(reference.id()).cloned())
    }
}

impl DisplayRegistry for InMemoryDisplayRegistry {
    fn issue(&self, bytes: &Bytes, mime_type: &str) -> DisplayRef {
        let reference = DisplayRef::new(mime_type);
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(*reference.id(), bytes.clone());
        }
        reference
    }

    fn revoke(&self, reference: &DisplayRef) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(reference.id());
        }
    }

    fn live_count(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}
