//! FileRecord store
//!
//! Ordered, in-memory collection of records and the single source of truth
//! for everything the host renders. Every mutation takes the lock once and
//! completes before returning; the lock is never held across an await.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::display::{DisplayRef, DisplayRegistry};
use crate::models::{
    AggregateStats, FileRecord, ProcessingStatus, RecordId, RecordResult,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Record {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: RecordId,
        from: ProcessingStatus,
        to: ProcessingStatus,
    },

    #[error("Duplicate record id: {0}")]
    DuplicateId(RecordId),
}

pub struct FileStore {
    records: Mutex<Vec<FileRecord>>,
    display: Arc<dyn DisplayRegistry>,
}

impl FileStore {
    pub fn new(display: Arc<dyn DisplayRegistry>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            display,
        }
    }

    pub fn display_registry(&self) -> &Arc<dyn DisplayRegistry> {
        &self.display
    }

    fn lock(&self) -> MutexGuard<'_, Vec<FileRecord>> {
        // Mutations are plain assignments under the guard, so a poisoned
        // lock still holds consistent records.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self, record: &FileRecord) {
        if let Some(reference) = &record.original_display {
            self.display.revoke(reference);
        }
        for reference in record.artifacts().iter().filter_map(|a| a.display.as_ref()) {
            self.display.revoke(reference);
        }
    }

    /// Append records in order. Image originals get a display reference.
    pub fn add(&self, records: Vec<FileRecord>) -> Result<Vec<RecordId>, StoreError> {
        let mut guard = self.lock();
        for (i, record) in records.iter().enumerate() {
            let clashes_existing = guard.iter().any(|r| r.id == record.id);
            let clashes_batch = records[..i].iter().any(|r| r.id == record.id);
            if clashes_existing || clashes_batch {
                return Err(StoreError::DuplicateId(record.id));
            }
        }

        let mut ids = Vec::with_capacity(records.len());
        for mut record in records {
            if record.is_image() && record.original_display.is_none() {
                record.original_display =
                    Some(self.display.issue(&record.original, &record.mime_type));
            }
            ids.push(record.id);
            guard.push(record);
        }
        Ok(ids)
    }

    /// Remove exactly one record and revoke its display references.
    pub fn remove(&self, id: RecordId) -> Result<FileRecord, StoreError> {
        let record = {
            let mut guard = self.lock();
            let index = guard
                .iter()
                .position(|r| r.id == id)
                .ok_or(StoreError::NotFound(id))?;
            guard.remove(index)
        };
        self.release(&record);
        tracing::debug!(record_id = %id, name = %record.name, "Record removed");
        Ok(record)
    }

    /// Empty the store, revoking every display reference. Returns the number
    /// of records removed.
    pub fn clear(&self) -> usize {
        let drained: Vec<FileRecord> = std::mem::take(&mut *self.lock());
        for record in &drained {
            self.release(record);
        }
        drained.len()
    }

    pub fn update_status(
        &self,
        id: RecordId,
        status: ProcessingStatus,
        progress: u8,
    ) -> Result<(), StoreError> {
        let mut guard = self.lock();
        let record = guard
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if !record.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                id,
                from: record.status,
                to: status,
            });
        }
        if status == ProcessingStatus::Processing {
            record.error = None;
        }
        record.status = status;
        record.progress = progress.min(100);
        Ok(())
    }

    /// Attach a transform result, issuing a display reference for each
    /// artifact. Replaces (and releases) any previous result.
    pub fn attach_result(&self, id: RecordId, result: RecordResult) -> Result<(), StoreError> {
        let mut guard = self.lock();
        let record = guard
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        self.attach_locked(record, result);
        Ok(())
    }

    fn attach_locked(&self, record: &mut FileRecord, mut result: RecordResult) {
        for artifact in result.artifacts_mut() {
            artifact.display = Some(self.display.issue(&artifact.bytes, &artifact.mime_type));
        }
        if let Some(previous) = record.result.replace(result) {
            for reference in previous.artifacts().iter().filter_map(|a| a.display.as_ref()) {
                self.display.revoke(reference);
            }
        }
    }

    /// Attach the result and mark the record completed in one step.
    pub fn complete(&self, id: RecordId, result: RecordResult) -> Result<(), StoreError> {
        let mut guard = self.lock();
        let record = guard
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if !record.status.can_transition_to(ProcessingStatus::Completed) {
            return Err(StoreError::InvalidTransition {
                id,
                from: record.status,
                to: ProcessingStatus::Completed,
            });
        }
        self.attach_locked(record, result);
        record.status = ProcessingStatus::Completed;
        record.progress = 100;
        record.error = None;
        Ok(())
    }

    /// Mark the record failed, keeping the message for display.
    pub fn fail(&self, id: RecordId, message: impl Into<String>) -> Result<(), StoreError> {
        let mut guard = self.lock();
        let record = guard
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if !record.status.can_transition_to(ProcessingStatus::Error) {
            return Err(StoreError::InvalidTransition {
                id,
                from: record.status,
                to: ProcessingStatus::Error,
            });
        }
        record.status = ProcessingStatus::Error;
        record.progress = 0;
        record.error = Some(message.into());
        Ok(())
    }

    pub fn get(&self, id: RecordId) -> Option<FileRecord> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.lock().iter().any(|r| r.id == id)
    }

    /// Copy of every record in store order.
    pub fn snapshot(&self) -> Vec<FileRecord> {
        self.lock().clone()
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.lock().iter().map(|r| r.id).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether any record is currently being transformed.
    pub fn has_in_flight(&self) -> bool {
        self.lock()
            .iter()
            .any(|r| r.status == ProcessingStatus::Processing)
    }

    pub fn stats(&self) -> AggregateStats {
        AggregateStats::from_records(&self.lock())
    }

    /// Display references held by a record, for hosts that render previews.
    pub fn display_refs(&self, id: RecordId) -> Vec<DisplayRef> {
        self.lock()
            .iter()
            .find(|r| r.id == id)
            .map(|r| {
                r.original_display
                    .iter()
                    .chain(r.artifacts().iter().filter_map(|a| a.display.as_ref()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
