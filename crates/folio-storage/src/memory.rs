use crate::traits::{numbered_name, validate_filename, ExportResult, SaveTarget, SavedFile};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;

/// Save target keeping files in memory, in save order
#[derive(Debug, Default)]
pub struct MemorySaveTarget {
    files: Mutex<Vec<(String, Bytes)>>,
}

impl MemorySaveTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of saved files, in save order
    pub fn names(&self) -> Vec<String> {
        self.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.lock()
            .iter()
            .find(|(saved, _)| saved == name)
            .map(|(_, data)| data.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Bytes)>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SaveTarget for MemorySaveTarget {
    async fn save(&self, filename: &str, _mime_type: &str, data: Bytes) -> ExportResult<SavedFile> {
        validate_filename(filename)?;

        let mut files = self.lock();
        let name = (0..)
            .map(|n| numbered_name(filename, n))
            .find(|candidate| !files.iter().any(|(saved, _)| saved == candidate))
            .unwrap_or_else(|| filename.to_string());
        let size_bytes = data.len() as u64;
        files.push((name.clone(), data));

        Ok(SavedFile {
            location: format!("memory:{}", name),
            name,
            size_bytes,
        })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
